//! # pmogpio
//!
//! GPIO remote control for a music playback core.
//!
//! Buttons wired to BCM input pins are debounced, mapped to their configured
//! event, and dispatched to playback handlers (play/pause, skip, volume,
//! playlist rotation) that drive an external core through the capability
//! traits of [`capabilities`].
//!
//! ```text
//! PinBackend ─► DebouncedEdgeWatcher ─► EdgeSink ─► DispatchWorker
//!                                                     │
//!                          EventDispatcher ◄──────────┘
//!                                │
//!                    PlaybackController ─► PlaybackCore
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pmogpio::{GpioConfig, GpioFrontend, MemoryCore, SimulatedPinBank};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = GpioConfig::load(None)?;
//! let core = Arc::new(MemoryCore::new());
//! let frontend = GpioFrontend::start(
//!     &config,
//!     SimulatedPinBank::all_bcm(),
//!     core,
//!     config.speech.announcer(),
//! )?;
//! frontend.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod capabilities;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod dispatcher;
pub mod errors;
pub mod frontend;
pub mod hardware;
pub mod memory_core;
pub mod playlist;
pub mod settings;
pub mod speech;
pub mod watcher;

pub use capabilities::{
    PlaybackCore, PlaybackState, PlaybackStatus, PlaylistLibrary, PlaylistRef, TrackRef,
    TracklistControl, TransportControl, VolumeControl,
};
pub use config::{GpioConfig, SAMPLE_CONFIG};
pub use controller::PlaybackController;
pub use dispatcher::{DispatchMessage, EventDispatcher, HandlerTable, InputEvent};
pub use errors::{GpioControlError, Result};
pub use frontend::GpioFrontend;
pub use hardware::{HalPinBank, PinBackend, SimulatedPinBank, SimulatedPins};
pub use memory_core::{CoreCommand, MemoryCore};
pub use playlist::{PlaylistRegistry, PlaylistRotator, RuntimeState};
pub use settings::{ActiveLevel, Edge, EventOptions, Level, PinSettings, Pull};
pub use speech::{Announcer, CommandAnnouncer, RecordingAnnouncer, SilentAnnouncer, SpeechConfig};
pub use watcher::{DebouncedEdgeWatcher, EdgeSink};
