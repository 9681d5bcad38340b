//! `rppal` implementation of [`PinBackend`] for the Raspberry Pi header.
//!
//! Every pin of a group is configured as an input with the internal pull-up and
//! an asynchronous interrupt on both edges.  `rppal` runs one interrupt thread
//! per pin, so the group keeps a shared level table: the thread that sees an
//! edge updates its own entry, applies the group's edge policy, and calls the
//! handler with a snapshot of the whole table.  The handler sits behind a
//! mutex so calls for one group never overlap even when two pins of an encoder
//! change at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rppal::gpio::{Event, Gpio, InputPin, Trigger};
use sbpd_core::gpio::{BackendError, PinBackend, PinHandler};
use sbpd_core::Edge;
use tracing::{debug, warn};

/// GPIO backend driving real pins through `rppal`.
pub struct RppalPinBackend {
    gpio: Gpio,
    // Dropping an InputPin cancels its interrupt, so the pins live as long
    // as the backend.
    pins: Vec<InputPin>,
}

impl RppalPinBackend {
    /// Opens the GPIO peripheral.
    ///
    /// # Errors
    ///
    /// Returns the `rppal` error if `/dev/gpiomem` or the GPIO character device
    /// is not accessible (not a Pi, or missing permissions).
    pub fn new() -> Result<Self, rppal::gpio::Error> {
        let gpio = Gpio::new()?;
        debug!("GPIO peripheral opened");
        Ok(Self {
            gpio,
            pins: Vec::new(),
        })
    }
}

struct Group {
    edge: Edge,
    levels: Vec<AtomicBool>,
    handler: Mutex<PinHandler>,
}

impl Group {
    fn on_event(&self, index: usize, event: Event) {
        let current = matches!(event.trigger, Trigger::RisingEdge);

        let Ok(mut handler) = self.handler.lock() else {
            warn!("GPIO handler lock poisoned; dropping edge");
            return;
        };
        let previous = self.levels[index].swap(current, Ordering::AcqRel);
        if !self.edge.matches(previous, current) {
            return;
        }
        let snapshot: Vec<bool> = self
            .levels
            .iter()
            .map(|level| level.load(Ordering::Acquire))
            .collect();
        (&mut *handler)(&snapshot);
    }
}

fn backend_error(pin: u8, err: rppal::gpio::Error) -> BackendError {
    BackendError {
        pin,
        message: err.to_string(),
    }
}

impl PinBackend for RppalPinBackend {
    fn watch(&mut self, pins: &[u8], edge: Edge, handler: PinHandler) -> Result<(), BackendError> {
        let mut inputs = Vec::with_capacity(pins.len());
        for &pin in pins {
            let input = self
                .gpio
                .get(pin)
                .map_err(|e| backend_error(pin, e))?
                .into_input_pullup();
            inputs.push((pin, input));
        }

        let group = Arc::new(Group {
            edge,
            levels: inputs
                .iter()
                .map(|(_, input)| AtomicBool::new(input.is_high()))
                .collect(),
            handler: Mutex::new(handler),
        });

        for (index, (pin, input)) in inputs.iter_mut().enumerate() {
            let group = Arc::clone(&group);
            input
                .set_async_interrupt(Trigger::Both, None, move |event| {
                    group.on_event(index, event)
                })
                .map_err(|e| backend_error(*pin, e))?;
            debug!(pin = *pin, %edge, "GPIO interrupt armed");
        }

        self.pins.extend(inputs.into_iter().map(|(_, input)| input));
        Ok(())
    }
}
