//! Button command codes and the command fragments sent to the server.
//!
//! A *fragment* is the JSON array that the server's `slim.request` method
//! expects as the command part of its parameters, e.g. `["button","fwd"]`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Error returned for a command token that is not one of the known codes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("invalid command code {0:?}: expected one of PLAY, VOL+, VOL-, PREV, NEXT, POWR")]
    InvalidCommand(String),
}

/// Every command a button can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonCommand {
    /// `PLAY` – toggle play/pause.
    PlayPause,
    /// `VOL+`
    VolumeUp,
    /// `VOL-`
    VolumeDown,
    /// `PREV` – previous track.
    Previous,
    /// `NEXT` – next track.
    Next,
    /// `POWR` – toggle player power.
    Power,
}

impl ButtonCommand {
    /// Length of every command code.
    pub const CODE_LEN: usize = 4;

    pub const ALL: [ButtonCommand; 6] = [
        ButtonCommand::PlayPause,
        ButtonCommand::VolumeUp,
        ButtonCommand::VolumeDown,
        ButtonCommand::Previous,
        ButtonCommand::Next,
        ButtonCommand::Power,
    ];

    /// Parses a 4-character command code.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidCommand`] if `code` is not exactly four
    /// characters long or is not one of the known codes.
    pub fn from_code(code: &str) -> Result<Self, CommandError> {
        if code.len() != Self::CODE_LEN {
            return Err(CommandError::InvalidCommand(code.to_string()));
        }
        match code {
            "PLAY" => Ok(ButtonCommand::PlayPause),
            "VOL+" => Ok(ButtonCommand::VolumeUp),
            "VOL-" => Ok(ButtonCommand::VolumeDown),
            "PREV" => Ok(ButtonCommand::Previous),
            "NEXT" => Ok(ButtonCommand::Next),
            "POWR" => Ok(ButtonCommand::Power),
            _ => Err(CommandError::InvalidCommand(code.to_string())),
        }
    }

    /// The configuration code for this command.
    pub fn code(&self) -> &'static str {
        match self {
            ButtonCommand::PlayPause => "PLAY",
            ButtonCommand::VolumeUp => "VOL+",
            ButtonCommand::VolumeDown => "VOL-",
            ButtonCommand::Previous => "PREV",
            ButtonCommand::Next => "NEXT",
            ButtonCommand::Power => "POWR",
        }
    }

    /// The fragment dispatched when the button fires.
    pub fn fragment(&self) -> &'static str {
        match self {
            ButtonCommand::PlayPause => r#"["pause"]"#,
            ButtonCommand::VolumeUp => r#"["button","volume_up"]"#,
            ButtonCommand::VolumeDown => r#"["button","voldown"]"#,
            ButtonCommand::Previous => r#"["button","rew"]"#,
            ButtonCommand::Next => r#"["button","fwd"]"#,
            ButtonCommand::Power => r#"["button","power"]"#,
        }
    }
}

impl FromStr for ButtonCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

impl fmt::Display for ButtonCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Builds the relative volume fragment for an encoder delta, e.g.
/// `["mixer","volume","+3"]` or `["mixer","volume","-2"]`.
pub fn volume_fragment(delta: i64) -> String {
    let sign = if delta > 0 { '+' } else { '-' };
    format!(r#"["mixer","volume","{sign}{}"]"#, delta.unsigned_abs())
}
