//! Typed per-pin input settings.
//!
//! A [`PinSettings`] is built once at startup from the `bcmN` configuration
//! entries and never changes afterwards. The event name is kept as a plain
//! string: it is resolved against the handler table only when the pin fires.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::errors::{GpioControlError, Result};

/// Electrical polarity of a button: which voltage means "pressed".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveLevel {
    /// Pressed pulls the line high; idle is held low by a pull-down.
    ActiveHigh,
    /// Pressed pulls the line low; idle is held high by a pull-up.
    ActiveLow,
}

impl ActiveLevel {
    pub fn pull(self) -> Pull {
        match self {
            ActiveLevel::ActiveHigh => Pull::Down,
            ActiveLevel::ActiveLow => Pull::Up,
        }
    }

    /// The only edge that counts as a press for this polarity.
    pub fn trigger_edge(self) -> Edge {
        match self {
            ActiveLevel::ActiveHigh => Edge::Rising,
            ActiveLevel::ActiveLow => Edge::Falling,
        }
    }
}

impl fmt::Display for ActiveLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActiveLevel::ActiveHigh => write!(f, "active_high"),
            ActiveLevel::ActiveLow => write!(f, "active_low"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn from_high(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pull {
    Up,
    Down,
}

impl Pull {
    /// Level read on an open (unpressed) contact.
    pub fn idle_level(self) -> Level {
        match self {
            Pull::Up => Level::High,
            Pull::Down => Level::Low,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Edge {
    Rising,
    Falling,
}

impl Edge {
    /// Transition observed between two consecutive samples, if any.
    pub fn between(previous: Level, current: Level) -> Option<Edge> {
        match (previous, current) {
            (Level::Low, Level::High) => Some(Edge::Rising),
            (Level::High, Level::Low) => Some(Edge::Falling),
            _ => None,
        }
    }
}

/// Handler-specific options attached to a pin (e.g. `step` for volume).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventOptions(BTreeMap<String, Value>);

impl EventOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reads an integer option. Numeric strings are accepted; a missing or
    /// null entry yields `default`.
    pub fn integer(&self, key: &str, default: i64) -> Result<i64> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Number(n)) => n
                .as_i64()
                .ok_or_else(|| GpioControlError::invalid_option(key, n)),
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| GpioControlError::invalid_option(key, s)),
            Some(other) => Err(GpioControlError::invalid_option(
                key,
                format!("{:?}", other),
            )),
        }
    }
}

/// Immutable configuration of one monitored pin.
#[derive(Clone, Debug, PartialEq)]
pub struct PinSettings {
    /// BCM pin number, unique across the configuration.
    pub pin: u8,
    pub active: ActiveLevel,
    /// Minimum delay between two accepted presses on this pin.
    pub bounce_time: Duration,
    /// Name of the handler to run, e.g. `play_pause`.
    pub event: String,
    pub options: EventOptions,
}

impl PinSettings {
    pub fn new(pin: u8, active: ActiveLevel, bounce_time: Duration, event: &str) -> Self {
        Self {
            pin,
            active,
            bounce_time,
            event: event.to_string(),
            options: EventOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EventOptions) -> Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_level_wiring() {
        assert_eq!(ActiveLevel::ActiveLow.pull(), Pull::Up);
        assert_eq!(ActiveLevel::ActiveLow.trigger_edge(), Edge::Falling);
        assert_eq!(ActiveLevel::ActiveHigh.pull(), Pull::Down);
        assert_eq!(ActiveLevel::ActiveHigh.trigger_edge(), Edge::Rising);
        assert_eq!(Pull::Up.idle_level(), Level::High);
    }

    #[test]
    fn test_edge_between() {
        assert_eq!(Edge::between(Level::High, Level::Low), Some(Edge::Falling));
        assert_eq!(Edge::between(Level::Low, Level::High), Some(Edge::Rising));
        assert_eq!(Edge::between(Level::Low, Level::Low), None);
        assert_eq!(Edge::between(Level::High, Level::High), None);
    }

    #[test]
    fn test_integer_option() {
        let options = EventOptions::new()
            .with("step", 10)
            .with("text", "7")
            .with("bad", "loud")
            .with("flag", true);

        assert_eq!(options.integer("step", 5).unwrap(), 10);
        assert_eq!(options.integer("text", 5).unwrap(), 7);
        assert_eq!(options.integer("missing", 5).unwrap(), 5);
        assert!(matches!(
            options.integer("bad", 5),
            Err(GpioControlError::InvalidOption(key, value)) if key == "bad" && value == "loud"
        ));
        assert!(options.integer("flag", 5).is_err());
    }

    #[test]
    fn test_active_level_serde_names() {
        let level: ActiveLevel = serde_yaml::from_str("active_high").unwrap();
        assert_eq!(level, ActiveLevel::ActiveHigh);
        assert_eq!(ActiveLevel::ActiveLow.to_string(), "active_low");
    }
}
