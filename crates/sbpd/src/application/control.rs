//! ControlMapper: turns button presses and encoder rotation into server
//! commands.
//!
//! Buttons and encoders are registered with the [`InputRegistry`], which
//! updates per-device atomics from the GPIO interrupt threads.  The main loop
//! calls [`ControlMapper::poll_buttons`] and [`ControlMapper::poll_encoders`]
//! once per iteration; those read the atomics and dispatch command fragments
//! through the [`CommandSender`].
//!
//! Button semantics:
//!
//! - every interrupt on a button pin marks the control pending, whatever the
//!   level change was;
//! - a pending button is dispatched on every poll.  The flag is only cleared
//!   after a successful dispatch when `clear_button_after_dispatch` is set.
//!
//! Encoder semantics: the difference between the encoder counter and the last
//! acknowledged value is sent as a relative volume change.  A failed send is
//! retried with the accumulated delta on the next poll.  Movement made while
//! the server is not resolved yet is dropped, not accumulated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sbpd_core::{
    volume_fragment, ButtonCommand, ButtonHandle, CommandError, ControlSpec, Edge,
    EncoderHandle, InputError, InputRegistry, PinBackend, ServerEndpoint,
};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Encoder deltas larger than this (in either direction) are treated as
/// counter glitches and not sent.
pub const MAX_VOLUME_STEP: i64 = 100;

/// Error type for control registration.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    InvalidCommand(#[from] CommandError),
    #[error(transparent)]
    Input(#[from] InputError),
}

/// Error type for a single command dispatch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// Host or port is not known yet; the command is dropped.
    #[error("server endpoint not resolved yet")]
    TransportUnavailable,
    /// The request was attempted and failed.
    #[error("dispatch failed: {0}")]
    Failed(String),
}

/// Trait for sending a command fragment to the media server on behalf of the
/// player.
///
/// Infrastructure implementations post JSON-RPC over HTTP; test
/// implementations record calls.
#[async_trait]
pub trait CommandSender: Send + Sync {
    /// Sends `fragment` (a JSON array such as `["pause"]`) to `endpoint`.
    async fn send(&self, endpoint: &ServerEndpoint, fragment: &str) -> Result<(), DispatchError>;
}

/// Behaviour switches for [`ControlMapper`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlOptions {
    /// Clear a button's pending flag after it was dispatched successfully.
    pub clear_button_after_dispatch: bool,
}

struct ButtonControl {
    handle: ButtonHandle,
    command: ButtonCommand,
    pending: Arc<AtomicBool>,
}

struct EncoderControl {
    handle: EncoderHandle,
    /// Encoder value at the last successful dispatch.
    baseline: i64,
}

/// Owns the input registry and the per-control dispatch state.
pub struct ControlMapper<B: PinBackend> {
    registry: InputRegistry<B>,
    sender: Arc<dyn CommandSender>,
    options: ControlOptions,
    buttons: Vec<ButtonControl>,
    encoders: Vec<EncoderControl>,
}

impl<B: PinBackend> ControlMapper<B> {
    pub fn new(backend: B, sender: Arc<dyn CommandSender>, options: ControlOptions) -> Self {
        Self {
            registry: InputRegistry::new(backend),
            sender,
            options,
            buttons: Vec::new(),
            encoders: Vec::new(),
        }
    }

    /// Registers a button on `pin` that sends the command named by the
    /// 4-character `command_code` (`PLAY`, `VOL+`, `VOL-`, `PREV`, `NEXT`,
    /// `POWR`).
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::InvalidCommand`] for an unknown code and
    /// [`ControlError::Input`] if the button pool is full or the pin cannot
    /// be configured.
    pub fn configure_button_control(
        &mut self,
        command_code: &str,
        pin: u8,
        edge: Edge,
    ) -> Result<ButtonHandle, ControlError> {
        let command = ButtonCommand::from_code(command_code)?;

        let pending = Arc::new(AtomicBool::new(false));
        let isr_pending = Arc::clone(&pending);
        let handle = self.registry.register_button(
            pin,
            Arc::new(move |_, _| isr_pending.store(true, Ordering::Release)),
            edge,
        )?;

        self.buttons.push(ButtonControl {
            handle,
            command,
            pending,
        });
        info!(pin, %edge, fragment = command.fragment(), "button defined");
        Ok(handle)
    }

    /// Registers a rotary encoder on `pin_a`/`pin_b` controlling the volume.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Input`] if the encoder pool is full or a pin
    /// cannot be configured.
    pub fn configure_encoder_control(
        &mut self,
        pin_a: u8,
        pin_b: u8,
        edge: Edge,
    ) -> Result<EncoderHandle, ControlError> {
        let handle = self.registry.register_encoder(
            pin_a,
            pin_b,
            Arc::new(|_, value, increment| trace!(value, increment, "encoder interrupt")),
            edge,
        )?;

        self.encoders.push(EncoderControl {
            handle,
            baseline: 0,
        });
        info!(pin_a, pin_b, %edge, "rotary encoder defined");
        Ok(handle)
    }

    /// Registers the control described by `spec`.
    ///
    /// The command token of an encoder spec is ignored.
    ///
    /// # Errors
    ///
    /// See [`configure_button_control`](Self::configure_button_control) and
    /// [`configure_encoder_control`](Self::configure_encoder_control).
    pub fn configure(&mut self, spec: &ControlSpec) -> Result<(), ControlError> {
        match spec {
            ControlSpec::Button { pin, command, edge } => {
                self.configure_button_control(command, *pin, *edge)?;
            }
            ControlSpec::Encoder {
                pin_a, pin_b, edge, ..
            } => {
                self.configure_encoder_control(*pin_a, *pin_b, *edge)?;
            }
        }
        Ok(())
    }

    /// Dispatches the command of every pending button.  Returns the number of
    /// successful dispatches.
    pub async fn poll_buttons(&mut self, endpoint: &ServerEndpoint) -> usize {
        let mut sent = 0;
        for control in &self.buttons {
            if !control.pending.load(Ordering::Acquire) {
                continue;
            }
            let pin = self.registry.button_pin(control.handle);
            info!(pin, command = %control.command, "button pressed");

            match self.sender.send(endpoint, control.command.fragment()).await {
                Ok(()) => {
                    sent += 1;
                    if self.options.clear_button_after_dispatch {
                        control.pending.store(false, Ordering::Release);
                    }
                }
                Err(e) => debug!(pin, error = %e, "button command not sent"),
            }
        }
        sent
    }

    /// Sends the accumulated rotation of every encoder as a relative volume
    /// change.  Returns the number of successful dispatches.
    pub async fn poll_encoders(&mut self, endpoint: &ServerEndpoint) -> usize {
        let mut sent = 0;
        for control in &mut self.encoders {
            let value = self.registry.encoder_value(control.handle);
            let delta = value - control.baseline;
            if delta == 0 {
                continue;
            }
            let (pin_a, pin_b) = self.registry.encoder_pins(control.handle);
            if delta.abs() > MAX_VOLUME_STEP {
                warn!(pin_a, pin_b, delta, "encoder delta out of range, ignored");
                continue;
            }
            debug!(pin_a, pin_b, delta, "encoder value change");

            match self.sender.send(endpoint, &volume_fragment(delta)).await {
                Ok(()) => {
                    control.baseline = value;
                    sent += 1;
                }
                Err(DispatchError::TransportUnavailable) => {
                    control.baseline = value;
                    debug!(pin_a, pin_b, delta, "server not resolved, volume change dropped");
                }
                Err(e) => debug!(pin_a, pin_b, error = %e, "volume change not sent"),
            }
        }
        sent
    }

    /// Whether the button is waiting to be dispatched.
    pub fn is_button_pending(&self, handle: ButtonHandle) -> bool {
        self.buttons
            .iter()
            .find(|c| c.handle == handle)
            .is_some_and(|c| c.pending.load(Ordering::Acquire))
    }

    /// Encoder value acknowledged by the last successful dispatch.
    pub fn encoder_baseline(&self, handle: EncoderHandle) -> Option<i64> {
        self.encoders
            .iter()
            .find(|c| c.handle == handle)
            .map(|c| c.baseline)
    }

    pub fn registry(&self) -> &InputRegistry<B> {
        &self.registry
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
