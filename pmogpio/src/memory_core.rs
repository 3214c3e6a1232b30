//! In-process playback core.
//!
//! `MemoryCore` implements the whole [`PlaybackCore`](crate::PlaybackCore)
//! capability set without any audio output. Every command is appended to a
//! journal, which makes it the reference collaborator for dry runs, demos
//! and tests.

use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::capabilities::{
    PlaybackState, PlaybackStatus, PlaylistLibrary, PlaylistRef, TrackRef, TracklistControl,
    TransportControl, VolumeControl,
};
use crate::errors::{GpioControlError, Result};

/// Command received by a [`MemoryCore`], in arrival order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoreCommand {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    SetVolume(u16),
    ClearTracklist,
    AddTracks(Vec<String>),
    SetRandom(bool),
}

#[derive(Debug)]
struct MemoryCoreState {
    playback: PlaybackState,
    volume: u16,
    tracklist: Vec<String>,
    random: bool,
    library: Vec<(PlaylistRef, Vec<TrackRef>)>,
    journal: Vec<CoreCommand>,
}

impl Default for MemoryCoreState {
    fn default() -> Self {
        Self {
            playback: PlaybackState::Stopped,
            volume: 50,
            tracklist: Vec::new(),
            random: false,
            library: Vec::new(),
            journal: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryCore {
    state: Mutex<MemoryCoreState>,
}

impl MemoryCore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a playlist to the library listing.
    pub fn with_playlist(self, name: &str, uri: &str, tracks: &[&str]) -> Self {
        {
            let mut state = self.lock();
            let tracks = tracks
                .iter()
                .map(|uri| TrackRef {
                    uri: uri.to_string(),
                })
                .collect();
            state.library.push((PlaylistRef::new(name, uri), tracks));
        }
        self
    }

    pub fn with_volume(self, volume: u16) -> Self {
        self.lock().volume = volume;
        self
    }

    pub fn with_state(self, playback: PlaybackState) -> Self {
        self.force_state(playback);
        self
    }

    /// Changes the transport state without journaling a command, as if the
    /// player had changed on its own (end of tracklist, another client...).
    pub fn force_state(&self, playback: PlaybackState) {
        self.lock().playback = playback;
    }

    pub fn journal(&self) -> Vec<CoreCommand> {
        self.lock().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.lock().journal.clear();
    }

    pub fn tracklist(&self) -> Vec<String> {
        self.lock().tracklist.clone()
    }

    pub fn is_random(&self) -> bool {
        self.lock().random
    }

    fn lock(&self) -> MutexGuard<'_, MemoryCoreState> {
        self.state.lock().expect("MemoryCore mutex poisoned")
    }

    fn record(&self, command: CoreCommand) -> MutexGuard<'_, MemoryCoreState> {
        debug!(command = ?command, "Playback core command");
        let mut state = self.lock();
        state.journal.push(command);
        state
    }
}

impl TransportControl for MemoryCore {
    fn play(&self) -> Result<()> {
        self.record(CoreCommand::Play).playback = PlaybackState::Playing;
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        let mut state = self.record(CoreCommand::Pause);
        if state.playback == PlaybackState::Playing {
            state.playback = PlaybackState::Paused;
        }
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.record(CoreCommand::Stop).playback = PlaybackState::Stopped;
        Ok(())
    }

    fn next(&self) -> Result<()> {
        self.record(CoreCommand::Next);
        Ok(())
    }

    fn previous(&self) -> Result<()> {
        self.record(CoreCommand::Previous);
        Ok(())
    }
}

impl PlaybackStatus for MemoryCore {
    fn playback_state(&self) -> Result<PlaybackState> {
        Ok(self.lock().playback)
    }
}

impl VolumeControl for MemoryCore {
    fn volume(&self) -> Result<u16> {
        Ok(self.lock().volume)
    }

    fn set_volume(&self, volume: u16) -> Result<()> {
        if volume > 100 {
            return Err(GpioControlError::core_error(format!(
                "volume {} out of range 0..=100",
                volume
            )));
        }
        self.record(CoreCommand::SetVolume(volume)).volume = volume;
        Ok(())
    }
}

impl TracklistControl for MemoryCore {
    fn clear_tracklist(&self) -> Result<()> {
        self.record(CoreCommand::ClearTracklist).tracklist.clear();
        Ok(())
    }

    fn add_tracks(&self, uris: &[String]) -> Result<()> {
        self.record(CoreCommand::AddTracks(uris.to_vec()))
            .tracklist
            .extend_from_slice(uris);
        Ok(())
    }

    fn set_random(&self, random: bool) -> Result<()> {
        self.record(CoreCommand::SetRandom(random)).random = random;
        Ok(())
    }
}

impl PlaylistLibrary for MemoryCore {
    fn playlists(&self) -> Result<Vec<PlaylistRef>> {
        Ok(self
            .lock()
            .library
            .iter()
            .map(|(playlist, _)| playlist.clone())
            .collect())
    }

    fn playlist_items(&self, uri: &str) -> Result<Vec<TrackRef>> {
        self.lock()
            .library
            .iter()
            .find(|(playlist, _)| playlist.uri == uri)
            .map(|(_, tracks)| tracks.clone())
            .ok_or_else(|| GpioControlError::core_error(format!("unknown playlist uri {}", uri)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_journal() {
        let core = MemoryCore::new();
        core.play().unwrap();
        core.pause().unwrap();
        assert_eq!(core.playback_state().unwrap(), PlaybackState::Paused);
        core.stop().unwrap();
        core.pause().unwrap();
        assert_eq!(core.playback_state().unwrap(), PlaybackState::Stopped);

        assert_eq!(
            core.journal(),
            vec![
                CoreCommand::Play,
                CoreCommand::Pause,
                CoreCommand::Stop,
                CoreCommand::Pause
            ]
        );
    }

    #[test]
    fn test_volume_range() {
        let core = MemoryCore::new().with_volume(10);
        assert_eq!(core.volume().unwrap(), 10);
        assert!(core.set_volume(101).is_err());
        core.set_volume(100).unwrap();
        assert_eq!(core.volume().unwrap(), 100);
    }

    #[test]
    fn test_library_listing() {
        let core = MemoryCore::new()
            .with_playlist("Jazz", "m3u:jazz", &["file:a", "file:b"])
            .with_playlist("Rock", "m3u:rock", &[]);

        let names: Vec<String> = core.playlists().unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Jazz", "Rock"]);
        assert_eq!(core.playlist_items("m3u:jazz").unwrap().len(), 2);
        assert!(core.playlist_items("m3u:pop").is_err());
        assert!(core.journal().is_empty());
    }
}
