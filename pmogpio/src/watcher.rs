//! Debounced edge watcher.
//!
//! The watcher owns the pin controller for the lifetime of the frontend. It
//! arms each configured pin for the edge matching its polarity, then feeds
//! every observed transition through the [`DebounceTable`]. Accepted presses
//! are forwarded to the dispatch worker as [`DispatchMessage::Pin`].
//!
//! ## Delivery paths
//!
//! - Polling: [`DebouncedEdgeWatcher::start`] spawns a thread that samples
//!   every armed pin at a fixed interval and derives edges from level changes.
//! - Interrupts: backends with native edge notification call
//!   [`EdgeSink::on_edge`] from their own callback thread.
//!
//! Both paths share the same debounce state, so mixing them is safe.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use tracing::{debug, info, trace, warn};

use crate::debounce::{DebounceTable, EdgeVerdict};
use crate::dispatcher::DispatchMessage;
use crate::errors::{GpioControlError, Result};
use crate::hardware::{BCM_PIN_COUNT, PinBackend};
use crate::settings::{ActiveLevel, Edge, Level, PinSettings};

/// Entry point for raw edges, cloneable across delivery threads.
#[derive(Clone, Debug)]
pub struct EdgeSink {
    table: Arc<DebounceTable>,
    sender: Sender<DispatchMessage>,
}

impl EdgeSink {
    /// Submits an edge observed on `pin` at `at`.
    ///
    /// Returns true when the edge was accepted and handed to the dispatcher.
    pub fn on_edge(&self, pin: u8, edge: Edge, at: Instant) -> bool {
        match self.table.check(pin, edge, at) {
            EdgeVerdict::Accepted => {
                debug!(pin, edge = ?edge, "Edge accepted");
                if self.sender.send(DispatchMessage::Pin(pin)).is_err() {
                    warn!(pin, "Dispatch worker is gone, dropping edge");
                    return false;
                }
                true
            }
            EdgeVerdict::Bounce => {
                trace!(pin, "Bounce suppressed");
                false
            }
            EdgeVerdict::InverseEdge => false,
            EdgeVerdict::Unarmed => {
                warn!(pin, "Edge reported on a pin that is not armed");
                false
            }
        }
    }

    pub fn on_edge_now(&self, pin: u8, edge: Edge) -> bool {
        self.on_edge(pin, edge, Instant::now())
    }
}

pub struct DebouncedEdgeWatcher<B: PinBackend> {
    backend: Arc<Mutex<B>>,
    table: Arc<DebounceTable>,
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl<B: PinBackend> DebouncedEdgeWatcher<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(Mutex::new(backend)),
            table: Arc::new(DebounceTable::new()),
            stop_flag: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Claims `pin` as an input and arms it for the edge of its polarity.
    ///
    /// Fails fast on pins the controller does not know, on pins armed twice,
    /// and once the watcher has started.
    pub fn configure(
        &mut self,
        pin: u8,
        active: ActiveLevel,
        bounce_time: Duration,
    ) -> Result<()> {
        if pin >= BCM_PIN_COUNT {
            return Err(GpioControlError::UnknownPin(pin));
        }
        let table = Arc::get_mut(&mut self.table).ok_or_else(|| {
            GpioControlError::InvalidConfig(
                "pins cannot be configured once the watcher has started".to_string(),
            )
        })?;
        if table.is_armed(pin) {
            return Err(GpioControlError::InvalidConfig(format!(
                "pin {} is already armed",
                pin
            )));
        }

        self.backend
            .lock()
            .expect("Pin backend mutex poisoned")
            .setup_input(pin, active.pull())?;

        let edge = active.trigger_edge();
        table.arm(pin, edge, bounce_time);
        info!(
            pin,
            active = %active,
            edge = ?edge,
            bounce_ms = bounce_time.as_millis() as u64,
            "Pin armed"
        );
        Ok(())
    }

    pub fn configure_settings(&mut self, settings: &PinSettings) -> Result<()> {
        self.configure(settings.pin, settings.active, settings.bounce_time)
    }

    pub fn armed_pins(&self) -> Vec<u8> {
        self.table.pins()
    }

    /// Starts the polling thread and returns the sink shared with it.
    pub fn start(
        &mut self,
        sender: Sender<DispatchMessage>,
        poll_interval: Duration,
    ) -> Result<EdgeSink> {
        if self.handle.is_some() {
            return Err(GpioControlError::InvalidConfig(
                "watcher already started".to_string(),
            ));
        }

        let sink = EdgeSink {
            table: Arc::clone(&self.table),
            sender,
        };

        self.stop_flag.store(false, Ordering::SeqCst);
        let backend = Arc::clone(&self.backend);
        let stop_flag = Arc::clone(&self.stop_flag);
        let thread_sink = sink.clone();

        debug!(
            interval_ms = poll_interval.as_millis() as u64,
            pins = ?self.table.pins(),
            "Starting watcher thread"
        );
        let handle = thread::Builder::new()
            .name("gpio-watcher".to_string())
            .spawn(move || poll_loop(backend, thread_sink, poll_interval, stop_flag))?;
        self.handle = Some(handle);

        Ok(sink)
    }

    /// Stops the polling thread and waits for it. Idempotent.
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            debug!("Stopping watcher thread");
            let _ = handle.join();
        }
    }

    pub fn is_watching(&self) -> bool {
        self.handle.is_some()
    }
}

impl<B: PinBackend> Drop for DebouncedEdgeWatcher<B> {
    fn drop(&mut self) {
        self.stop();

        let pins = self.table.pins();
        let mut backend = match self.backend.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for &pin in &pins {
            backend.release(pin);
        }
        if !pins.is_empty() {
            info!(pins = ?pins, "Pins released");
        }
    }
}

fn poll_loop<B: PinBackend>(
    backend: Arc<Mutex<B>>,
    sink: EdgeSink,
    interval: Duration,
    stop_flag: Arc<AtomicBool>,
) {
    let pins = sink.table.pins();
    let mut previous: HashMap<u8, Level> = HashMap::new();
    let mut failing: HashSet<u8> = HashSet::new();

    while !stop_flag.load(Ordering::SeqCst) {
        let now = Instant::now();
        let mut edges = Vec::new();

        {
            let mut backend = backend.lock().expect("Pin backend mutex poisoned");
            for &pin in &pins {
                match backend.read_level(pin) {
                    Ok(level) => {
                        failing.remove(&pin);
                        if let Some(edge) = previous
                            .insert(pin, level)
                            .and_then(|before| Edge::between(before, level))
                        {
                            edges.push((pin, edge));
                        }
                    }
                    Err(e) => {
                        if failing.insert(pin) {
                            warn!(pin, error = %e, "Cannot sample pin");
                        }
                    }
                }
            }
        }

        for (pin, edge) in edges {
            sink.on_edge(pin, edge, now);
        }

        thread::sleep(interval);
    }

    debug!("Watcher thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::SimulatedPinBank;
    use crossbeam_channel::unbounded;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn pin_messages(rx: &crossbeam_channel::Receiver<DispatchMessage>) -> Vec<u8> {
        rx.try_iter()
            .filter_map(|message| match message {
                DispatchMessage::Pin(pin) => Some(pin),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_configure_rejects_unknown_pins() {
        let mut watcher = DebouncedEdgeWatcher::new(SimulatedPinBank::new([17]));

        assert!(matches!(
            watcher.configure(40, ActiveLevel::ActiveLow, ms(10)),
            Err(GpioControlError::UnknownPin(40))
        ));
        assert!(matches!(
            watcher.configure(4, ActiveLevel::ActiveLow, ms(10)),
            Err(GpioControlError::UnknownPin(4))
        ));
        watcher.configure(17, ActiveLevel::ActiveLow, ms(10)).unwrap();
        assert!(matches!(
            watcher.configure(17, ActiveLevel::ActiveHigh, ms(10)),
            Err(GpioControlError::InvalidConfig(_))
        ));
        assert_eq!(watcher.armed_pins(), vec![17]);
        assert_eq!(watcher.table.trigger_edge(17), Some(Edge::Falling));
    }

    #[test]
    fn test_sink_emits_once_per_press() {
        let mut watcher = DebouncedEdgeWatcher::new(SimulatedPinBank::all_bcm());
        watcher.configure(17, ActiveLevel::ActiveLow, ms(300)).unwrap();
        watcher.configure(22, ActiveLevel::ActiveHigh, ms(50)).unwrap();

        let (tx, rx) = unbounded();
        let sink = watcher.start(tx, ms(1000)).unwrap();
        let t0 = Instant::now();

        // Press on 17 with contact bounce, release edges in between.
        assert!(sink.on_edge(17, Edge::Falling, t0));
        assert!(!sink.on_edge(17, Edge::Rising, t0 + ms(5)));
        assert!(!sink.on_edge(17, Edge::Falling, t0 + ms(10)));
        assert!(!sink.on_edge(17, Edge::Falling, t0 + ms(250)));
        // 22 is unaffected by 17's window.
        assert!(sink.on_edge(22, Edge::Rising, t0 + ms(20)));
        assert!(!sink.on_edge(22, Edge::Falling, t0 + ms(30)));
        // Unarmed pin.
        assert!(!sink.on_edge(5, Edge::Falling, t0));
        // Second press on 17 after the window.
        assert!(sink.on_edge(17, Edge::Falling, t0 + ms(600)));

        assert_eq!(pin_messages(&rx), vec![17, 22, 17]);
    }

    #[test]
    fn test_configure_after_start_fails() {
        let mut watcher = DebouncedEdgeWatcher::new(SimulatedPinBank::all_bcm());
        watcher.configure(17, ActiveLevel::ActiveLow, ms(10)).unwrap();

        let (tx, _rx) = unbounded();
        let _sink = watcher.start(tx.clone(), ms(1000)).unwrap();
        assert!(watcher.is_watching());
        assert!(watcher.configure(18, ActiveLevel::ActiveLow, ms(10)).is_err());
        assert!(watcher.start(tx, ms(1000)).is_err());

        watcher.stop();
        assert!(!watcher.is_watching());
        watcher.stop();
    }

    #[test]
    fn test_polling_detects_debounced_presses() {
        let bank = SimulatedPinBank::all_bcm();
        let pins = bank.handle();
        let mut watcher = DebouncedEdgeWatcher::new(bank);
        watcher.configure(17, ActiveLevel::ActiveLow, ms(300)).unwrap();

        let (tx, rx) = unbounded();
        let _sink = watcher.start(tx, ms(1)).unwrap();
        thread::sleep(ms(30));

        // First press with contact bounce, all inside 300ms.
        pins.press(17, ActiveLevel::ActiveLow);
        thread::sleep(ms(20));
        pins.let_go(17, ActiveLevel::ActiveLow);
        thread::sleep(ms(20));
        pins.press(17, ActiveLevel::ActiveLow);
        thread::sleep(ms(20));
        pins.let_go(17, ActiveLevel::ActiveLow);

        // Second press well after the window.
        thread::sleep(ms(450));
        pins.press(17, ActiveLevel::ActiveLow);
        thread::sleep(ms(50));

        watcher.stop();
        assert_eq!(pin_messages(&rx), vec![17, 17]);
    }

    #[test]
    fn test_drop_releases_pins() {
        let bank = SimulatedPinBank::all_bcm();
        let pins = bank.handle();
        {
            let mut watcher = DebouncedEdgeWatcher::new(bank);
            watcher.configure(5, ActiveLevel::ActiveLow, ms(10)).unwrap();
            watcher.configure(6, ActiveLevel::ActiveHigh, ms(10)).unwrap();
            let (tx, _rx) = unbounded();
            let _sink = watcher.start(tx, ms(1)).unwrap();
            assert!(pins.is_claimed(5));
            assert!(pins.is_claimed(6));
        }
        assert!(!pins.is_claimed(5));
        assert!(!pins.is_claimed(6));
    }
}
