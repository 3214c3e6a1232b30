//! # GPIO remote configuration
//!
//! The configuration is a YAML document. Any top-level key starting with
//! `bcm` describes one input pin; the remaining keys tune the frontend:
//!
//! ```yaml
//! playlists: [Morning, Jazz]
//! autoplay: true
//! shuffle: true
//! bcm17:
//!   active: active_low
//!   bouncetime: 300
//!   event: next
//! bcm22:
//!   active: active_low
//!   bouncetime: 150
//!   event: volume_up
//!   options:
//!     step: 2
//! bcm27: ~          # wired but disabled
//! ```
//!
//! File loading follows pmoconfig: an explicit path wins, otherwise the
//! `PMOGPIO_CONFIG` environment variable names the file.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_yaml::Value;
use tracing::{debug, info};

use crate::errors::GpioControlError;
use crate::settings::{ActiveLevel, EventOptions, PinSettings};
use crate::speech::SpeechConfig;

/// Commented reference configuration shipped with the crate.
pub const SAMPLE_CONFIG: &str = include_str!("pmogpio.yaml");

const ENV_CONFIG_FILE: &str = "PMOGPIO_CONFIG";
const PIN_KEY_PREFIX: &str = "bcm";
const DEFAULT_POLL_INTERVAL_MS: u64 = 5;

fn default_true() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Raw `bcmN` entry as written in the configuration file.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PinEntry {
    pub active: ActiveLevel,
    /// Debounce window in milliseconds.
    pub bouncetime: u64,
    pub event: String,
    #[serde(default)]
    pub options: EventOptions,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GpioConfig {
    /// Ordered playlist names cycled by `change_playlist`.
    #[serde(default)]
    pub playlists: Vec<String>,
    #[serde(default = "default_true")]
    pub autoplay: bool,
    #[serde(default = "default_true")]
    pub shuffle: bool,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(flatten)]
    entries: BTreeMap<String, Value>,
}

impl GpioConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Invalid GPIO configuration")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Cannot read configuration file {}", path.display()))?;
        let config = Self::from_yaml_str(&content)?;
        info!(path = %path.display(), "GPIO configuration loaded");
        Ok(config)
    }

    /// Loads the configuration from `path`, or from the file named by
    /// `PMOGPIO_CONFIG` when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let env_path = env::var(ENV_CONFIG_FILE).map_err(|_| {
                    anyhow!(
                        "No configuration file given and {} is not set",
                        ENV_CONFIG_FILE
                    )
                })?;
                info!(env_var = ENV_CONFIG_FILE, path = %env_path, "Loading config from env");
                PathBuf::from(env_path)
            }
        };
        Self::from_file(&path)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Converts every enabled `bcmN` entry into [`PinSettings`], sorted by pin.
    ///
    /// Null or empty entries are skipped. Event names are not checked here:
    /// an unknown event is reported when its pin fires.
    pub fn pin_settings(&self) -> Result<Vec<PinSettings>, GpioControlError> {
        let mut settings: Vec<PinSettings> = Vec::new();

        for (key, value) in &self.entries {
            let Some(suffix) = key.strip_prefix(PIN_KEY_PREFIX) else {
                continue;
            };
            let pin: u8 = suffix
                .parse()
                .map_err(|_| GpioControlError::InvalidPinKey(key.clone()))?;

            let disabled = value.is_null() || value.as_mapping().is_some_and(|m| m.is_empty());
            if disabled {
                debug!(pin, "Pin disabled in configuration");
                continue;
            }

            if settings.iter().any(|s| s.pin == pin) {
                return Err(GpioControlError::InvalidConfig(format!(
                    "pin {} is configured more than once",
                    pin
                )));
            }

            let entry: PinEntry = serde_yaml::from_value(value.clone())
                .map_err(|e| GpioControlError::InvalidConfig(format!("{}: {}", key, e)))?;

            settings.push(PinSettings {
                pin,
                active: entry.active,
                bounce_time: Duration::from_millis(entry.bouncetime),
                event: entry.event,
                options: entry.options,
            });
        }

        settings.sort_by_key(|s| s.pin);
        Ok(settings)
    }
}
