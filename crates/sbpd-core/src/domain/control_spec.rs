//! Control specifications: the comma-separated strings that declare which
//! buttons and encoders are wired to which pins.
//!
//! ```text
//! b,<pin>,<CMD>[,<edge>]            button on <pin> sending <CMD>
//! e,<pin_a>,<pin_b>,<CMD>[,<edge>]  rotary encoder on <pin_a>/<pin_b> (volume)
//! ```
//!
//! Pins use BCM numbering.  `<edge>` is `1` (falling), `2` (rising) or
//! `0`/`3` (both, the default).  The command token is kept as written; it is
//! validated when the control is configured.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::edge::Edge;

/// Error returned for a malformed control specification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ControlSpecError {
    #[error("empty control specification")]
    Empty,
    #[error("unknown control kind {0:?}: expected \"b\" or \"e\"")]
    UnknownKind(String),
    #[error("control specification {spec:?} is missing the {field} field")]
    MissingField { spec: String, field: &'static str },
    #[error("invalid GPIO pin {0:?}")]
    InvalidPin(String),
    #[error("invalid edge code {0:?}")]
    InvalidEdge(String),
    #[error("control specification {0:?} has trailing fields")]
    TrailingFields(String),
}

/// A parsed control specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlSpec {
    Button {
        pin: u8,
        command: String,
        edge: Edge,
    },
    Encoder {
        pin_a: u8,
        pin_b: u8,
        /// Accepted for compatibility; encoders always control the volume.
        command: Option<String>,
        edge: Edge,
    },
}

impl FromStr for ControlSpec {
    type Err = ControlSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spec = s.trim();
        if spec.is_empty() {
            return Err(ControlSpecError::Empty);
        }
        let mut fields = spec.split(',').map(str::trim);
        let kind = fields.next().unwrap_or_default();

        let missing = |field| ControlSpecError::MissingField {
            spec: spec.to_string(),
            field,
        };

        let parsed = match kind {
            "b" => {
                let pin = parse_pin(fields.next().ok_or_else(|| missing("pin"))?)?;
                let command = fields.next().ok_or_else(|| missing("command"))?.to_string();
                let edge = parse_edge(fields.next())?;
                ControlSpec::Button { pin, command, edge }
            }
            "e" => {
                let pin_a = parse_pin(fields.next().ok_or_else(|| missing("pin_a"))?)?;
                let pin_b = parse_pin(fields.next().ok_or_else(|| missing("pin_b"))?)?;
                let command = fields
                    .next()
                    .filter(|c| !c.is_empty())
                    .map(str::to_string);
                let edge = parse_edge(fields.next())?;
                ControlSpec::Encoder {
                    pin_a,
                    pin_b,
                    command,
                    edge,
                }
            }
            other => return Err(ControlSpecError::UnknownKind(other.to_string())),
        };

        if fields.next().is_some() {
            return Err(ControlSpecError::TrailingFields(spec.to_string()));
        }
        Ok(parsed)
    }
}

/// Formats the specification back into its `b,...` / `e,...` form, always
/// with an explicit edge code.
impl fmt::Display for ControlSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlSpec::Button { pin, command, edge } => {
                write!(f, "b,{pin},{command},{}", edge_code(*edge))
            }
            ControlSpec::Encoder {
                pin_a,
                pin_b,
                command,
                edge,
            } => write!(
                f,
                "e,{pin_a},{pin_b},{},{}",
                command.as_deref().unwrap_or_default(),
                edge_code(*edge)
            ),
        }
    }
}

fn edge_code(edge: Edge) -> u8 {
    match edge {
        Edge::Falling => 1,
        Edge::Rising => 2,
        Edge::Both => 3,
    }
}

fn parse_pin(field: &str) -> Result<u8, ControlSpecError> {
    field
        .parse::<u8>()
        .map_err(|_| ControlSpecError::InvalidPin(field.to_string()))
}

fn parse_edge(field: Option<&str>) -> Result<Edge, ControlSpecError> {
    match field {
        None | Some("") => Ok(Edge::Both),
        Some(code) => code
            .parse::<i64>()
            .map(Edge::from_code)
            .map_err(|_| ControlSpecError::InvalidEdge(code.to_string())),
    }
}
