//! Per-pin debounce guards.
//!
//! Each armed pin owns its own lock, so a burst of contact noise on one button
//! never delays the edges of another. The table itself is immutable once the
//! watcher starts; only the per-pin timestamps change.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::settings::Edge;

#[derive(Debug)]
struct PinGuard {
    edge: Edge,
    bounce_time: Duration,
    last_accepted: Mutex<Option<Instant>>,
}

/// Outcome of submitting an edge to the [`DebounceTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeVerdict {
    Accepted,
    /// Inside the bounce window of the previous accepted edge.
    Bounce,
    /// Release edge of the button; never dispatched.
    InverseEdge,
    Unarmed,
}

#[derive(Debug, Default)]
pub struct DebounceTable {
    guards: HashMap<u8, PinGuard>,
}

impl DebounceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `pin` for `edge`. Re-arming a pin resets its window.
    pub fn arm(&mut self, pin: u8, edge: Edge, bounce_time: Duration) {
        self.guards.insert(
            pin,
            PinGuard {
                edge,
                bounce_time,
                last_accepted: Mutex::new(None),
            },
        );
    }

    pub fn is_armed(&self, pin: u8) -> bool {
        self.guards.contains_key(&pin)
    }

    pub fn trigger_edge(&self, pin: u8) -> Option<Edge> {
        self.guards.get(&pin).map(|guard| guard.edge)
    }

    /// Armed pins in ascending order.
    pub fn pins(&self) -> Vec<u8> {
        let mut pins: Vec<u8> = self.guards.keys().copied().collect();
        pins.sort_unstable();
        pins
    }

    /// Decides whether an edge observed at `at` is a new press.
    ///
    /// An accepted edge restarts the window: the next one must come at least
    /// `bounce_time` later. Timestamps older than the last accepted edge are
    /// treated as bounces.
    pub fn check(&self, pin: u8, edge: Edge, at: Instant) -> EdgeVerdict {
        let Some(guard) = self.guards.get(&pin) else {
            return EdgeVerdict::Unarmed;
        };
        if edge != guard.edge {
            return EdgeVerdict::InverseEdge;
        }

        let mut last = guard
            .last_accepted
            .lock()
            .expect("Debounce guard mutex poisoned");
        if let Some(previous) = *last {
            match at.checked_duration_since(previous) {
                Some(elapsed) if elapsed >= guard.bounce_time => {}
                _ => return EdgeVerdict::Bounce,
            }
        }
        *last = Some(at);
        EdgeVerdict::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn table_with(pin: u8, bounce: u64) -> DebounceTable {
        let mut table = DebounceTable::new();
        table.arm(pin, Edge::Falling, ms(bounce));
        table
    }

    #[test]
    fn test_edges_inside_window_are_merged() {
        let table = table_with(17, 300);
        let t0 = Instant::now();

        assert_eq!(table.check(17, Edge::Falling, t0), EdgeVerdict::Accepted);
        assert_eq!(
            table.check(17, Edge::Falling, t0 + ms(299)),
            EdgeVerdict::Bounce
        );
    }

    #[test]
    fn test_edges_outside_window_are_distinct() {
        let table = table_with(17, 300);
        let t0 = Instant::now();

        assert_eq!(table.check(17, Edge::Falling, t0), EdgeVerdict::Accepted);
        assert_eq!(
            table.check(17, Edge::Falling, t0 + ms(300)),
            EdgeVerdict::Accepted
        );
        assert_eq!(
            table.check(17, Edge::Falling, t0 + ms(700)),
            EdgeVerdict::Accepted
        );
    }

    #[test]
    fn test_window_restarts_on_accepted_edge_only() {
        let table = table_with(17, 100);
        let t0 = Instant::now();

        assert_eq!(table.check(17, Edge::Falling, t0), EdgeVerdict::Accepted);
        // Bounces do not extend the window.
        assert_eq!(
            table.check(17, Edge::Falling, t0 + ms(60)),
            EdgeVerdict::Bounce
        );
        assert_eq!(
            table.check(17, Edge::Falling, t0 + ms(100)),
            EdgeVerdict::Accepted
        );
    }

    #[test]
    fn test_stale_timestamp_is_a_bounce() {
        let table = table_with(17, 100);
        let t0 = Instant::now() + ms(1000);

        assert_eq!(table.check(17, Edge::Falling, t0), EdgeVerdict::Accepted);
        assert_eq!(
            table.check(17, Edge::Falling, t0 - ms(500)),
            EdgeVerdict::Bounce
        );
    }

    #[test]
    fn test_pins_are_independent() {
        let mut table = table_with(17, 300);
        table.arm(27, Edge::Falling, ms(300));
        let t0 = Instant::now();

        assert_eq!(table.check(17, Edge::Falling, t0), EdgeVerdict::Accepted);
        assert_eq!(
            table.check(27, Edge::Falling, t0 + ms(10)),
            EdgeVerdict::Accepted
        );
        assert_eq!(
            table.check(17, Edge::Falling, t0 + ms(20)),
            EdgeVerdict::Bounce
        );
    }

    #[test]
    fn test_inverse_and_unarmed() {
        let table = table_with(17, 300);
        let t0 = Instant::now();

        assert_eq!(
            table.check(17, Edge::Rising, t0),
            EdgeVerdict::InverseEdge
        );
        assert_eq!(table.check(4, Edge::Falling, t0), EdgeVerdict::Unarmed);
        // The ignored release edge does not open a window.
        assert_eq!(table.check(17, Edge::Falling, t0), EdgeVerdict::Accepted);
    }

    #[test]
    fn test_concurrent_pins() {
        let mut table = DebounceTable::new();
        for pin in 0..8 {
            table.arm(pin, Edge::Rising, ms(1000));
        }
        let table = Arc::new(table);
        let t0 = Instant::now();

        let handles: Vec<_> = (0..8u8)
            .map(|pin| {
                let table = Arc::clone(&table);
                thread::spawn(move || {
                    (0..100u64)
                        .filter(|i| table.check(pin, Edge::Rising, t0 + ms(*i)) == EdgeVerdict::Accepted)
                        .count()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1);
        }
        assert_eq!(table.pins(), (0..8).collect::<Vec<u8>>());
    }
}
