//! Domain types for the SqueezeButtonPi daemon.
//!
//! Plain data and pure functions only: no I/O, no hardware access.  Code in the
//! daemon's application and infrastructure layers depends on these types; they
//! never depend on anything outside this module.

/// Button command codes and the JSON-array fragments they map to.
pub mod command;
/// `b,<pin>,<CMD>[,<edge>]` / `e,<pin_a>,<pin_b>,<CMD>[,<edge>]` parsing.
pub mod control_spec;
/// Interrupt edge policy.
pub mod edge;
/// Server endpoint and configured/discovered parameter flags.
pub mod server;
