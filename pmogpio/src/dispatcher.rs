//! Event dispatch.
//!
//! A fired pin is mapped to its [`PinSettings`], the settings' event name is
//! resolved in a [`HandlerTable`] built at startup, and the handler runs with
//! the pin's options. Unknown event names are not checked when the
//! configuration is loaded: they surface as [`GpioControlError::UnknownEvent`]
//! the first time the pin fires.
//!
//! All dispatches run on a single [`DispatchWorker`] thread, so handlers are
//! never reentrant and playback commands reach the core one at a time.

use std::collections::HashMap;
use std::fmt;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, error, info};

use crate::controller::PlaybackController;
use crate::errors::{GpioControlError, Result};
use crate::settings::{EventOptions, PinSettings};

/// Every action a pin can trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputEvent {
    PlayPause,
    PlayStop,
    Next,
    Prev,
    VolumeUp,
    VolumeDown,
    OnOff,
    ChangePlaylist,
}

impl InputEvent {
    pub const ALL: [InputEvent; 8] = [
        InputEvent::PlayPause,
        InputEvent::PlayStop,
        InputEvent::Next,
        InputEvent::Prev,
        InputEvent::VolumeUp,
        InputEvent::VolumeDown,
        InputEvent::OnOff,
        InputEvent::ChangePlaylist,
    ];

    /// Configuration name of the event.
    pub fn name(self) -> &'static str {
        match self {
            InputEvent::PlayPause => "play_pause",
            InputEvent::PlayStop => "play_stop",
            InputEvent::Next => "next",
            InputEvent::Prev => "prev",
            InputEvent::VolumeUp => "volume_up",
            InputEvent::VolumeDown => "volume_down",
            InputEvent::OnOff => "on_off",
            InputEvent::ChangePlaylist => "change_playlist",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.name() == name)
    }
}

impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub type InputHandler = fn(&mut PlaybackController, &EventOptions) -> Result<()>;

/// Static registration table from event kind to handler.
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<InputEvent, InputHandler>,
}

impl HandlerTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Table with the built-in playback handlers.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        table.register(InputEvent::PlayPause, PlaybackController::play_pause);
        table.register(InputEvent::PlayStop, PlaybackController::play_stop);
        table.register(InputEvent::Next, PlaybackController::next);
        table.register(InputEvent::Prev, PlaybackController::prev);
        table.register(InputEvent::VolumeUp, PlaybackController::volume_up);
        table.register(InputEvent::VolumeDown, PlaybackController::volume_down);
        table.register(InputEvent::OnOff, PlaybackController::on_off);
        table.register(InputEvent::ChangePlaylist, PlaybackController::change_playlist);
        table
    }

    /// Registers `handler` for `event`, returning the handler it replaces.
    pub fn register(&mut self, event: InputEvent, handler: InputHandler) -> Option<InputHandler> {
        self.handlers.insert(event, handler)
    }

    pub fn resolve(&self, name: &str) -> Option<(InputEvent, InputHandler)> {
        let event = InputEvent::from_name(name)?;
        self.handlers.get(&event).map(|handler| (event, *handler))
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut events: Vec<&str> = self.handlers.keys().map(|event| event.name()).collect();
        events.sort_unstable();
        f.debug_struct("HandlerTable").field("events", &events).finish()
    }
}

#[derive(Debug)]
pub struct EventDispatcher {
    settings: HashMap<u8, PinSettings>,
    handlers: HandlerTable,
}

impl EventDispatcher {
    pub fn new(settings: impl IntoIterator<Item = PinSettings>, handlers: HandlerTable) -> Self {
        Self {
            settings: settings.into_iter().map(|s| (s.pin, s)).collect(),
            handlers,
        }
    }

    pub fn settings(&self, pin: u8) -> Option<&PinSettings> {
        self.settings.get(&pin)
    }

    /// Runs the handler configured for `pin`.
    pub fn dispatch(&self, pin: u8, controller: &mut PlaybackController) -> Result<()> {
        let settings = self
            .settings
            .get(&pin)
            .ok_or(GpioControlError::UnconfiguredPin(pin))?;
        let (event, handler) = self
            .handlers
            .resolve(&settings.event)
            .ok_or_else(|| GpioControlError::UnknownEvent(settings.event.clone()))?;

        debug!(pin, event = %event, "Dispatching input event");
        handler(controller, &settings.options)
    }
}

/// Messages consumed by the [`DispatchWorker`], in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchMessage {
    /// Run the startup sequence (initial playlist load).
    Start,
    /// An accepted press on this pin.
    Pin(u8),
    Shutdown,
}

/// Thread owning the controller; serializes every dispatch.
#[derive(Debug)]
pub struct DispatchWorker {
    sender: Sender<DispatchMessage>,
    handle: Option<JoinHandle<()>>,
}

impl DispatchWorker {
    pub fn spawn(dispatcher: EventDispatcher, controller: PlaybackController) -> Result<Self> {
        let (sender, receiver) = unbounded::<DispatchMessage>();
        let handle = thread::Builder::new()
            .name("gpio-dispatch".to_string())
            .spawn(move || worker_loop(receiver, dispatcher, controller))?;
        Ok(Self {
            sender,
            handle: Some(handle),
        })
    }

    pub fn sender(&self) -> Sender<DispatchMessage> {
        self.sender.clone()
    }

    /// Queues `message`; false once the worker has exited.
    pub fn submit(&self, message: DispatchMessage) -> bool {
        self.sender.send(message).is_ok()
    }

    /// Lets the worker drain pending messages, then joins it. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.sender.send(DispatchMessage::Shutdown);
            if handle.join().is_err() {
                error!("Dispatch worker panicked");
            }
        }
    }
}

impl Drop for DispatchWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(
    receiver: Receiver<DispatchMessage>,
    dispatcher: EventDispatcher,
    mut controller: PlaybackController,
) {
    for message in receiver.iter() {
        match message {
            DispatchMessage::Start => {
                info!("Running startup sequence");
                if let Err(e) = controller.on_start() {
                    error!(error = %e, "Startup sequence failed");
                }
            }
            DispatchMessage::Pin(pin) => {
                if let Err(e) = dispatcher.dispatch(pin, &mut controller) {
                    error!(pin, error = %e, "Input dispatch failed");
                }
            }
            DispatchMessage::Shutdown => break,
        }
    }
    debug!("Dispatch worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::capabilities::{PlaybackState, PlaybackStatus, PlaylistLibrary};
    use crate::memory_core::{CoreCommand, MemoryCore};
    use crate::playlist::{PlaylistRegistry, PlaylistRotator};
    use crate::settings::ActiveLevel;
    use crate::speech::SilentAnnouncer;

    fn pin(pin: u8, event: &str) -> PinSettings {
        PinSettings::new(pin, ActiveLevel::ActiveLow, Duration::from_millis(50), event)
    }

    fn controller(core: &Arc<MemoryCore>) -> PlaybackController {
        let registry =
            PlaylistRegistry::new(vec!["A".to_string()], core.playlists().unwrap()).unwrap();
        PlaybackController::new(
            core.clone(),
            Arc::new(SilentAnnouncer),
            PlaylistRotator::new(registry),
        )
    }

    fn core() -> Arc<MemoryCore> {
        Arc::new(MemoryCore::new().with_playlist("A", "m3u:a", &["file:a1"]))
    }

    #[test]
    fn test_event_names_round_trip() {
        for event in InputEvent::ALL {
            assert_eq!(InputEvent::from_name(event.name()), Some(event));
        }
        assert_eq!(InputEvent::from_name("handle_next"), None);
        assert_eq!(InputEvent::ChangePlaylist.to_string(), "change_playlist");
    }

    #[test]
    fn test_standard_table_covers_every_event() {
        let table = HandlerTable::standard();
        for event in InputEvent::ALL {
            assert!(table.resolve(event.name()).is_some(), "{}", event);
        }
        assert!(HandlerTable::empty().resolve("next").is_none());
    }

    #[test]
    fn test_dispatch_runs_handler_with_options() {
        let core = core();
        let mut controller = controller(&core);
        let volume = pin(16, "volume_up").with_options(EventOptions::new().with("step", 20));
        let dispatcher = EventDispatcher::new(
            vec![pin(17, "next"), volume],
            HandlerTable::standard(),
        );

        dispatcher.dispatch(17, &mut controller).unwrap();
        dispatcher.dispatch(16, &mut controller).unwrap();

        assert_eq!(
            core.journal(),
            vec![CoreCommand::Next, CoreCommand::SetVolume(70)]
        );
        assert_eq!(dispatcher.settings(16).unwrap().event, "volume_up");
    }

    #[test]
    fn test_dispatch_unknown_event() {
        let core = core();
        let mut controller = controller(&core);
        let dispatcher = EventDispatcher::new(vec![pin(4, "explode")], HandlerTable::standard());

        assert!(matches!(
            dispatcher.dispatch(4, &mut controller),
            Err(GpioControlError::UnknownEvent(name)) if name == "explode"
        ));
        assert!(matches!(
            dispatcher.dispatch(5, &mut controller),
            Err(GpioControlError::UnconfiguredPin(5))
        ));
        assert!(core.journal().is_empty());
    }

    #[test]
    fn test_registered_handler_overrides() {
        let core = core();
        let mut controller = controller(&core);
        let mut table = HandlerTable::standard();
        let previous = table.register(InputEvent::Next, PlaybackController::prev);
        assert!(previous.is_some());

        let dispatcher = EventDispatcher::new(vec![pin(17, "next")], table);
        dispatcher.dispatch(17, &mut controller).unwrap();
        assert_eq!(core.journal(), vec![CoreCommand::Previous]);
    }

    #[test]
    fn test_worker_survives_failed_dispatch() {
        let core = core();
        let dispatcher = EventDispatcher::new(
            vec![pin(4, "explode"), pin(17, "next"), pin(5, "play_pause")],
            HandlerTable::standard(),
        );
        let mut worker = DispatchWorker::spawn(dispatcher, controller(&core)).unwrap();

        assert!(worker.submit(DispatchMessage::Pin(4)));
        assert!(worker.submit(DispatchMessage::Pin(17)));
        assert!(worker.submit(DispatchMessage::Pin(99)));
        assert!(worker.submit(DispatchMessage::Pin(5)));
        worker.shutdown();

        assert_eq!(core.journal(), vec![CoreCommand::Next, CoreCommand::Play]);
        assert!(!worker.submit(DispatchMessage::Pin(17)));
        worker.shutdown();
    }

    #[test]
    fn test_worker_runs_start_first() {
        let core = core();
        let dispatcher = EventDispatcher::new(vec![pin(5, "play_pause")], HandlerTable::standard());
        let worker = DispatchWorker::spawn(dispatcher, controller(&core)).unwrap();

        worker.submit(DispatchMessage::Start);
        worker.submit(DispatchMessage::Pin(5));
        drop(worker);

        assert_eq!(
            core.journal(),
            vec![
                CoreCommand::ClearTracklist,
                CoreCommand::AddTracks(vec!["file:a1".to_string()]),
                CoreCommand::SetRandom(true),
                CoreCommand::Play,
                CoreCommand::Pause,
            ]
        );
        assert_eq!(core.playback_state().unwrap(), PlaybackState::Paused);
    }
}
