//! Pin controller abstraction.
//!
//! The watcher never talks to hardware directly: it goes through a
//! [`PinBackend`], owned for the whole process lifetime and released on
//! shutdown. Two backends are provided:
//!
//! - [`HalPinBank`] wraps any set of `embedded_hal` input lines, which is how
//!   a board support crate hands its pins over;
//! - [`SimulatedPinBank`] keeps the levels in memory and is driven through a
//!   [`SimulatedPins`] handle (dry runs, demos, tests).

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use embedded_hal::digital::{Error as _, InputPin};
use tracing::debug;

use crate::errors::{GpioControlError, Result};
use crate::settings::{ActiveLevel, Level, Pull};

/// Number of addressable BCM lines on a Raspberry Pi header (0..=27).
pub const BCM_PIN_COUNT: u8 = 28;

pub trait PinBackend: Send + 'static {
    /// Claims `pin` as an input with the given pull resistor.
    ///
    /// Must fail with [`GpioControlError::UnknownPin`] when the controller
    /// has no such line.
    fn setup_input(&mut self, pin: u8, pull: Pull) -> Result<()>;

    /// Samples the current level of a claimed pin.
    fn read_level(&mut self, pin: u8) -> Result<Level>;

    /// Gives a claimed pin back to the controller.
    fn release(&mut self, _pin: u8) {}
}

/// Backend over `embedded_hal` input lines keyed by BCM number.
pub struct HalPinBank<P> {
    lines: HashMap<u8, P>,
}

impl<P> Default for HalPinBank<P> {
    fn default() -> Self {
        Self {
            lines: HashMap::new(),
        }
    }
}

impl<P> HalPinBank<P>
where
    P: InputPin + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line(mut self, pin: u8, line: P) -> Self {
        self.lines.insert(pin, line);
        self
    }

    pub fn insert(&mut self, pin: u8, line: P) {
        self.lines.insert(pin, line);
    }
}

impl<P> PinBackend for HalPinBank<P>
where
    P: InputPin + Send + 'static,
{
    fn setup_input(&mut self, pin: u8, pull: Pull) -> Result<()> {
        if !self.lines.contains_key(&pin) {
            return Err(GpioControlError::UnknownPin(pin));
        }
        // HAL lines arrive already configured by the board crate.
        debug!(pin, pull = ?pull, "HAL input line claimed");
        Ok(())
    }

    fn read_level(&mut self, pin: u8) -> Result<Level> {
        let line = self
            .lines
            .get_mut(&pin)
            .ok_or(GpioControlError::UnknownPin(pin))?;
        line.is_high().map(Level::from_high).map_err(|e| {
            GpioControlError::hardware_error(format!("pin {}: {:?}", pin, e.kind()))
        })
    }

    fn release(&mut self, pin: u8) {
        debug!(pin, "HAL input line released");
    }
}

#[derive(Debug, Default)]
struct SimulatedState {
    levels: HashMap<u8, Level>,
    claimed: BTreeSet<u8>,
}

/// Handle used to drive a [`SimulatedPinBank`] from another thread.
#[derive(Clone, Debug, Default)]
pub struct SimulatedPins {
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedPins {
    pub fn set_level(&self, pin: u8, level: Level) {
        self.lock().levels.insert(pin, level);
    }

    pub fn level(&self, pin: u8) -> Option<Level> {
        self.lock().levels.get(&pin).copied()
    }

    /// Closes the contact of a button wired with the given polarity.
    pub fn press(&self, pin: u8, active: ActiveLevel) {
        let level = active.pull().idle_level();
        self.set_level(pin, opposite(level));
    }

    /// Opens the contact again.
    pub fn let_go(&self, pin: u8, active: ActiveLevel) {
        self.set_level(pin, active.pull().idle_level());
    }

    pub fn is_claimed(&self, pin: u8) -> bool {
        self.lock().claimed.contains(&pin)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimulatedState> {
        self.state.lock().expect("SimulatedPins mutex poisoned")
    }
}

fn opposite(level: Level) -> Level {
    match level {
        Level::Low => Level::High,
        Level::High => Level::Low,
    }
}

/// In-memory pin controller exposing a fixed set of lines.
#[derive(Debug)]
pub struct SimulatedPinBank {
    available: BTreeSet<u8>,
    pins: SimulatedPins,
}

impl SimulatedPinBank {
    pub fn new(available: impl IntoIterator<Item = u8>) -> Self {
        Self {
            available: available.into_iter().collect(),
            pins: SimulatedPins::default(),
        }
    }

    /// A bank exposing every BCM line.
    pub fn all_bcm() -> Self {
        Self::new(0..BCM_PIN_COUNT)
    }

    pub fn handle(&self) -> SimulatedPins {
        self.pins.clone()
    }
}

impl PinBackend for SimulatedPinBank {
    fn setup_input(&mut self, pin: u8, pull: Pull) -> Result<()> {
        if !self.available.contains(&pin) {
            return Err(GpioControlError::UnknownPin(pin));
        }
        let mut state = self.pins.lock();
        state.levels.entry(pin).or_insert(pull.idle_level());
        state.claimed.insert(pin);
        Ok(())
    }

    fn read_level(&mut self, pin: u8) -> Result<Level> {
        let state = self.pins.lock();
        if !state.claimed.contains(&pin) {
            return Err(GpioControlError::hardware_error(format!(
                "pin {} read before setup",
                pin
            )));
        }
        state
            .levels
            .get(&pin)
            .copied()
            .ok_or(GpioControlError::UnknownPin(pin))
    }

    fn release(&mut self, pin: u8) {
        self.pins.lock().claimed.remove(&pin);
    }
}
