//! Process-lifetime assembly of the GPIO remote.
//!
//! Startup order matters: every pin is claimed and armed before any thread
//! runs, so a hardware or configuration mismatch aborts startup with nothing
//! left behind. The dispatch worker receives `Start` before the watcher can
//! emit its first press, so the initial playlist load always runs first.

use std::sync::Arc;

use tracing::info;

use crate::capabilities::{PlaybackCore, PlaylistLibrary};
use crate::config::GpioConfig;
use crate::controller::PlaybackController;
use crate::dispatcher::{DispatchMessage, DispatchWorker, EventDispatcher, HandlerTable};
use crate::errors::Result;
use crate::hardware::PinBackend;
use crate::playlist::{PlaylistRegistry, PlaylistRotator};
use crate::speech::Announcer;
use crate::watcher::{DebouncedEdgeWatcher, EdgeSink};

pub struct GpioFrontend<B: PinBackend> {
    watcher: DebouncedEdgeWatcher<B>,
    worker: DispatchWorker,
    sink: EdgeSink,
}

impl<B: PinBackend> GpioFrontend<B> {
    /// Configures the pins, loads the playlist registry and starts both the
    /// dispatch worker and the watcher thread.
    pub fn start(
        config: &GpioConfig,
        backend: B,
        core: Arc<dyn PlaybackCore>,
        announcer: Arc<dyn Announcer>,
    ) -> Result<Self> {
        Self::start_with_handlers(config, backend, core, announcer, HandlerTable::standard())
    }

    pub fn start_with_handlers(
        config: &GpioConfig,
        backend: B,
        core: Arc<dyn PlaybackCore>,
        announcer: Arc<dyn Announcer>,
        handlers: HandlerTable,
    ) -> Result<Self> {
        let settings = config.pin_settings()?;

        let mut watcher = DebouncedEdgeWatcher::new(backend);
        for pin_settings in &settings {
            watcher.configure_settings(pin_settings)?;
        }

        let registry = PlaylistRegistry::new(config.playlists.clone(), core.playlists()?)?;
        let rotator = PlaylistRotator::new(registry).with_flags(config.autoplay, config.shuffle);
        let controller = PlaybackController::new(core, announcer, rotator);

        let worker = DispatchWorker::spawn(EventDispatcher::new(settings, handlers), controller)?;
        worker.submit(DispatchMessage::Start);

        let sink = watcher.start(worker.sender(), config.poll_interval())?;
        info!(pins = ?watcher.armed_pins(), "GPIO frontend started");

        Ok(Self {
            watcher,
            worker,
            sink,
        })
    }

    /// Entry point for backends that deliver edges from their own callbacks.
    pub fn edge_sink(&self) -> EdgeSink {
        self.sink.clone()
    }

    pub fn armed_pins(&self) -> Vec<u8> {
        self.watcher.armed_pins()
    }

    /// Stops the watcher, then lets the worker drain every pending press.
    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.watcher.is_watching() {
            self.watcher.stop();
            self.worker.shutdown();
            info!("GPIO frontend stopped");
        }
    }
}

impl<B: PinBackend> Drop for GpioFrontend<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}
