//! Fixed-capacity registry of buttons and rotary encoders.
//!
//! The registry owns the [`PinBackend`] and one shared state cell per device.
//! Registration installs an interrupt handler that updates the cell and calls
//! the user callback; the poll loop reads the same cells through
//! [`InputRegistry::button_level`] and [`InputRegistry::encoder_value`].
//!
//! Pool sizes follow from the 17 usable GPIO pins of the Pi header: one pin
//! per button, two pins per encoder.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU8, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::{quadrature, BackendError, PinBackend};
use crate::domain::edge::Edge;

/// Maximum number of buttons (one pin each).
pub const MAX_BUTTONS: usize = 17;
/// Maximum number of rotary encoders (two pins each).
pub const MAX_ENCODERS: usize = 8;

/// Called from the interrupt path with the button and its level change:
/// `+1` (went high), `-1` (went low) or `0` (contact chatter, no change).
pub type ButtonCallback = Arc<dyn Fn(ButtonHandle, i32) + Send + Sync>;

/// Called from the interrupt path with the encoder, its new accumulated value
/// and the increment that produced it.
pub type EncoderCallback = Arc<dyn Fn(EncoderHandle, i64, i64) + Send + Sync>;

/// Error type for device registration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InputError {
    /// The fixed pool for this kind of device is full.
    #[error("cannot register more than {capacity} {kind}s")]
    CapacityExceeded { kind: &'static str, capacity: usize },
    /// The GPIO driver refused to configure a pin.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Stable index of a registered button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ButtonHandle(usize);

impl ButtonHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Stable index of a registered encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncoderHandle(usize);

impl EncoderHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct ButtonState {
    pin: u8,
    edge: Edge,
    level: AtomicBool,
}

impl ButtonState {
    /// Stores `level` and returns the change relative to the stored level.
    fn update(&self, level: bool) -> i32 {
        let previous = self.level.swap(level, Ordering::AcqRel);
        match (previous, level) {
            (false, true) => 1,
            (true, false) => -1,
            _ => 0,
        }
    }
}

#[derive(Debug)]
struct EncoderState {
    pin_a: u8,
    pin_b: u8,
    edge: Edge,
    value: AtomicI64,
    last_encoded: AtomicU8,
}

impl EncoderState {
    /// Decodes one sample of both channels; returns `(value, increment)`.
    fn update(&self, a: bool, b: bool) -> (i64, i64) {
        let encoded = quadrature::encode(a, b);
        let previous = self.last_encoded.swap(encoded, Ordering::AcqRel);
        let increment = quadrature::step(previous, encoded);
        let value = self.value.fetch_add(increment, Ordering::AcqRel) + increment;
        (value, increment)
    }
}

/// Owner of all button and encoder state.
pub struct InputRegistry<B: PinBackend> {
    backend: B,
    buttons: Vec<Arc<ButtonState>>,
    encoders: Vec<Arc<EncoderState>>,
}

impl<B: PinBackend> InputRegistry<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            buttons: Vec::with_capacity(MAX_BUTTONS),
            encoders: Vec::with_capacity(MAX_ENCODERS),
        }
    }

    /// Registers a button on `pin` and installs its interrupt handler.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::CapacityExceeded`] once [`MAX_BUTTONS`] buttons
    /// exist, or [`InputError::Backend`] if the pin cannot be configured.
    pub fn register_button(
        &mut self,
        pin: u8,
        callback: ButtonCallback,
        edge: Edge,
    ) -> Result<ButtonHandle, InputError> {
        if self.buttons.len() >= MAX_BUTTONS {
            return Err(InputError::CapacityExceeded {
                kind: "button",
                capacity: MAX_BUTTONS,
            });
        }

        let handle = ButtonHandle(self.buttons.len());
        let state = Arc::new(ButtonState {
            pin,
            edge,
            level: AtomicBool::new(false),
        });

        let isr_state = Arc::clone(&state);
        self.backend.watch(
            &[pin],
            edge,
            Box::new(move |levels: &[bool]| {
                if let Some(&level) = levels.first() {
                    let change = isr_state.update(level);
                    callback(handle, change);
                }
            }),
        )?;

        self.buttons.push(state);
        debug!(pin, %edge, "button registered");
        Ok(handle)
    }

    /// Registers a rotary encoder on `pin_a`/`pin_b` and installs the
    /// interrupt handler on both pins.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::CapacityExceeded`] once [`MAX_ENCODERS`] encoders
    /// exist, or [`InputError::Backend`] if a pin cannot be configured.
    pub fn register_encoder(
        &mut self,
        pin_a: u8,
        pin_b: u8,
        callback: EncoderCallback,
        edge: Edge,
    ) -> Result<EncoderHandle, InputError> {
        if self.encoders.len() >= MAX_ENCODERS {
            return Err(InputError::CapacityExceeded {
                kind: "encoder",
                capacity: MAX_ENCODERS,
            });
        }

        let handle = EncoderHandle(self.encoders.len());
        let state = Arc::new(EncoderState {
            pin_a,
            pin_b,
            edge,
            value: AtomicI64::new(0),
            last_encoded: AtomicU8::new(0),
        });

        let isr_state = Arc::clone(&state);
        self.backend.watch(
            &[pin_a, pin_b],
            edge,
            Box::new(move |levels: &[bool]| {
                if let &[a, b] = levels {
                    let (value, increment) = isr_state.update(a, b);
                    callback(handle, value, increment);
                }
            }),
        )?;

        self.encoders.push(state);
        debug!(pin_a, pin_b, %edge, "encoder registered");
        Ok(handle)
    }

    /// Most recently sampled level of a button.
    pub fn button_level(&self, handle: ButtonHandle) -> bool {
        self.buttons[handle.0].level.load(Ordering::Acquire)
    }

    /// Accumulated value of an encoder.  Never reset.
    pub fn encoder_value(&self, handle: EncoderHandle) -> i64 {
        self.encoders[handle.0].value.load(Ordering::Acquire)
    }

    pub fn button_pin(&self, handle: ButtonHandle) -> u8 {
        self.buttons[handle.0].pin
    }

    pub fn button_edge(&self, handle: ButtonHandle) -> Edge {
        self.buttons[handle.0].edge
    }

    pub fn encoder_pins(&self, handle: EncoderHandle) -> (u8, u8) {
        let state = &self.encoders[handle.0];
        (state.pin_a, state.pin_b)
    }

    pub fn encoder_edge(&self, handle: EncoderHandle) -> Edge {
        self.encoders[handle.0].edge
    }

    pub fn button_count(&self) -> usize {
        self.buttons.len()
    }

    pub fn encoder_count(&self) -> usize {
        self.encoders.len()
    }
}
