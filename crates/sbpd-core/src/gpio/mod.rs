//! Hardware input: buttons and quadrature rotary encoders on GPIO pins.
//!
//! # Interrupt-to-poll data flow
//!
//! ```text
//! GPIO edge ──► PinBackend interrupt thread ──► registry update routine
//!                                                 │  writes AtomicBool / AtomicI64
//!                                                 └─► user callback
//! poll loop ──► InputRegistry::button_level / encoder_value (reads only)
//! ```
//!
//! Each atomic has exactly one writer (the interrupt path of its device) and
//! one reader (the poll loop), so no locks are taken on either side.
//!
//! # Testability
//!
//! The [`PinBackend`] trait hides the GPIO driver.  The daemon plugs in an
//! `rppal` implementation on the Pi; tests use [`mock::MockPinBackend`] and
//! drive pin levels by hand.

use thiserror::Error;

use crate::domain::edge::Edge;

pub mod mock;
pub mod quadrature;
pub mod registry;

/// Called with the current level of every pin of a watched group, in the
/// order the pins were passed to [`PinBackend::watch`].  `true` is high.
pub type PinHandler = Box<dyn FnMut(&[bool]) + Send + 'static>;

/// Error reported by a GPIO backend while configuring a pin.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("GPIO pin {pin}: {message}")]
pub struct BackendError {
    pub pin: u8,
    pub message: String,
}

/// Trait abstracting the GPIO driver.
pub trait PinBackend: Send {
    /// Configures every pin in `pins` as an input with pull-up and installs an
    /// interrupt on each of them.
    ///
    /// Whenever an edge matching `edge` occurs on any pin of the group, the
    /// backend samples all pins of the group and calls `handler` with the
    /// levels.  Calls for one group never overlap.
    fn watch(&mut self, pins: &[u8], edge: Edge, handler: PinHandler) -> Result<(), BackendError>;
}
