use std::fmt;

/// Which signal edges raise an interrupt on an input pin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Edge {
    /// High-to-low transitions (button press with pull-up wiring).
    Falling,
    /// Low-to-high transitions.
    Rising,
    #[default]
    Both,
}

impl Edge {
    /// Maps the numeric edge code used in control specifications.
    ///
    /// `1` is falling, `2` is rising; `0`, `3` and any other value mean both.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Edge::Falling,
            2 => Edge::Rising,
            _ => Edge::Both,
        }
    }

    /// Returns `true` if a transition from `previous` to `current` should
    /// raise an interrupt under this policy.
    pub fn matches(&self, previous: bool, current: bool) -> bool {
        match self {
            Edge::Falling => previous && !current,
            Edge::Rising => !previous && current,
            Edge::Both => previous != current,
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Edge::Falling => "falling",
            Edge::Rising => "rising",
            Edge::Both => "both",
        };
        f.write_str(name)
    }
}
