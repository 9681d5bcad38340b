//! Mock GPIO backend for unit and integration testing.
//!
//! Keeps pin levels in memory and lets tests drive them with
//! [`MockPinBackend::set_level`], as if the signal changed on the header.
//! Handlers run synchronously on the calling thread.  All pins start low.
//!
//! The type is a cheap handle around shared state: clone it, move one clone
//! into an [`InputRegistry`](super::registry::InputRegistry) and keep the
//! other to inject edges.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::{BackendError, PinBackend, PinHandler};
use crate::domain::edge::Edge;

struct WatchedGroup {
    pins: Vec<u8>,
    edge: Edge,
    handler: Arc<Mutex<PinHandler>>,
}

#[derive(Default)]
struct MockState {
    levels: HashMap<u8, bool>,
    groups: Vec<WatchedGroup>,
    failing: HashSet<u8>,
}

/// A mock implementation of [`PinBackend`] that lets tests set pin levels.
#[derive(Clone, Default)]
pub struct MockPinBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockPinBackend {
    /// Creates a backend with no watched pins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later `watch` that includes `pin` fail.
    pub fn fail_pin(&self, pin: u8) {
        self.state.lock().expect("lock poisoned").failing.insert(pin);
    }

    /// Drives `pin` to `level`, firing the handlers of every group containing
    /// the pin when the transition matches that group's edge policy.
    pub fn set_level(&self, pin: u8, level: bool) {
        let fired = {
            let mut state = self.state.lock().expect("lock poisoned");
            let previous = state.levels.insert(pin, level).unwrap_or(false);
            collect_firing(&state, pin, |edge| edge.matches(previous, level))
        };
        run(fired);
    }

    /// Fires an interrupt on `pin` without changing any level, the way a
    /// bouncing contact does.
    pub fn trigger(&self, pin: u8) {
        let fired = {
            let state = self.state.lock().expect("lock poisoned");
            collect_firing(&state, pin, |_| true)
        };
        run(fired);
    }

    /// Current level of `pin`.
    pub fn level(&self, pin: u8) -> bool {
        let state = self.state.lock().expect("lock poisoned");
        state.levels.get(&pin).copied().unwrap_or(false)
    }

    /// Every pin configured through [`PinBackend::watch`], in order.
    pub fn watched_pins(&self) -> Vec<u8> {
        let state = self.state.lock().expect("lock poisoned");
        state.groups.iter().flat_map(|g| g.pins.iter().copied()).collect()
    }
}

type Firing = Vec<(Arc<Mutex<PinHandler>>, Vec<bool>)>;

fn collect_firing(state: &MockState, pin: u8, edge_fires: impl Fn(Edge) -> bool) -> Firing {
    state
        .groups
        .iter()
        .filter(|group| group.pins.contains(&pin) && edge_fires(group.edge))
        .map(|group| {
            let levels = group
                .pins
                .iter()
                .map(|p| state.levels.get(p).copied().unwrap_or(false))
                .collect();
            (Arc::clone(&group.handler), levels)
        })
        .collect()
}

// Handlers run after the state lock is released so they may query the mock.
fn run(fired: Firing) {
    for (handler, levels) in fired {
        let mut handler = handler.lock().expect("lock poisoned");
        (&mut *handler)(&levels);
    }
}

impl PinBackend for MockPinBackend {
    fn watch(&mut self, pins: &[u8], edge: Edge, handler: PinHandler) -> Result<(), BackendError> {
        let mut state = self.state.lock().expect("lock poisoned");
        if let Some(&pin) = pins.iter().find(|p| state.failing.contains(p)) {
            return Err(BackendError {
                pin,
                message: "pin unavailable".to_string(),
            });
        }
        state.groups.push(WatchedGroup {
            pins: pins.to_vec(),
            edge,
            handler: Arc::new(Mutex::new(handler)),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_handler() -> (PinHandler, Arc<Mutex<Vec<Vec<bool>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: PinHandler = Box::new(move |levels: &[bool]| {
            sink.lock().unwrap().push(levels.to_vec());
        });
        (handler, seen)
    }

    #[test]
    fn test_set_level_fires_group_with_all_levels() {
        // Arrange
        let mut backend = MockPinBackend::new();
        let (handler, seen) = counting_handler();
        backend.watch(&[3, 4], Edge::Both, handler).unwrap();

        // Act
        backend.set_level(4, true);

        // Assert
        assert_eq!(*seen.lock().unwrap(), vec![vec![false, true]]);
    }

    #[test]
    fn test_set_level_without_transition_does_not_fire() {
        let mut backend = MockPinBackend::new();
        let (handler, seen) = counting_handler();
        backend.watch(&[3], Edge::Both, handler).unwrap();

        backend.set_level(3, false);

        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_falling_policy_only_fires_on_falling_edge() {
        let mut backend = MockPinBackend::new();
        let (handler, seen) = counting_handler();
        backend.watch(&[7], Edge::Falling, handler).unwrap();

        backend.set_level(7, true);
        backend.set_level(7, false);

        assert_eq!(*seen.lock().unwrap(), vec![vec![false]]);
        assert!(!backend.level(7));
    }

    #[test]
    fn test_trigger_fires_regardless_of_level() {
        let mut backend = MockPinBackend::new();
        let (handler, seen) = counting_handler();
        backend.watch(&[8], Edge::Rising, handler).unwrap();

        backend.trigger(8);

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_failing_pin_rejects_watch() {
        let mut backend = MockPinBackend::new();
        backend.fail_pin(12);
        let (handler, _) = counting_handler();

        let result = backend.watch(&[11, 12], Edge::Both, handler);

        assert_eq!(result.unwrap_err().pin, 12);
        assert!(backend.watched_pins().is_empty());
    }
}
