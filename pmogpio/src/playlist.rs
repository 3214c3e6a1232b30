//! Playlist selection and cycling.
//!
//! The registry pairs the configured playlist order with the URIs the
//! playback core exposes at startup. The rotator keeps the current selection
//! and knows how to turn a playlist name into a freshly loaded tracklist.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::capabilities::{
    PlaybackCore, PlaylistLibrary, PlaylistRef, TracklistControl, TransportControl,
};
use crate::errors::{GpioControlError, Result};
use crate::speech::Announcer;

/// Spoken when startup ends without automatic playback.
pub const READY_ANNOUNCEMENT: &str = "Ready!";

#[derive(Clone, Debug)]
pub struct PlaylistRegistry {
    order: Vec<String>,
    uris: HashMap<String, String>,
}

impl PlaylistRegistry {
    /// Builds the registry from the configured order and the core listing.
    ///
    /// Configured names missing from the listing are kept: they fail when
    /// loaded, like any unknown name.
    pub fn new(order: Vec<String>, listing: Vec<PlaylistRef>) -> Result<Self> {
        if order.is_empty() {
            return Err(GpioControlError::EmptyPlaylists);
        }
        info!(playlists = ?order, "Selected playlists");

        let uris: HashMap<String, String> = listing
            .into_iter()
            .map(|playlist| (playlist.name, playlist.uri))
            .collect();
        for (name, uri) in &uris {
            info!(playlist = %name, uri = %uri, "Playlist available");
        }
        for name in order.iter().filter(|name| !uris.contains_key(*name)) {
            warn!(playlist = %name, "Configured playlist is not offered by the playback core");
        }

        Ok(Self { order, uris })
    }

    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn first(&self) -> &str {
        &self.order[0]
    }

    pub fn uri(&self, name: &str) -> Option<&str> {
        self.uris.get(name).map(String::as_str)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.order.iter().position(|candidate| candidate == name)
    }

    /// Name following `name` in configured order, wrapping around.
    pub fn next_after(&self, name: &str) -> &str {
        let next = self
            .index_of(name)
            .map_or(0, |index| (index + 1) % self.order.len());
        &self.order[next]
    }
}

/// Mutable selection state, lives for the process lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeState {
    pub current_playlist: String,
    pub autoplay: bool,
    pub shuffle: bool,
}

impl RuntimeState {
    pub fn new(current_playlist: &str) -> Self {
        Self {
            current_playlist: current_playlist.to_string(),
            autoplay: true,
            shuffle: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PlaylistRotator {
    registry: PlaylistRegistry,
    state: RuntimeState,
}

impl PlaylistRotator {
    /// Starts on the first configured playlist with autoplay and shuffle on.
    pub fn new(registry: PlaylistRegistry) -> Self {
        let state = RuntimeState::new(registry.first());
        Self { registry, state }
    }

    pub fn with_flags(mut self, autoplay: bool, shuffle: bool) -> Self {
        self.state.autoplay = autoplay;
        self.state.shuffle = shuffle;
        self
    }

    pub fn registry(&self) -> &PlaylistRegistry {
        &self.registry
    }

    pub fn state(&self) -> &RuntimeState {
        &self.state
    }

    pub fn current_playlist(&self) -> &str {
        &self.state.current_playlist
    }

    /// Replaces the tracklist with the tracks of playlist `name`.
    ///
    /// Returns `Ok(false)` without touching the tracklist when the name is
    /// unknown. Tracks are fetched before the tracklist is cleared, so a
    /// failing lookup on the core side leaves the old tracklist in place.
    pub fn load(&self, core: &dyn PlaybackCore, name: &str) -> Result<bool> {
        let Some(uri) = self.registry.uri(name) else {
            warn!("{}", GpioControlError::PlaylistNotFound(name.to_string()));
            return Ok(false);
        };

        let uris: Vec<String> = core
            .playlist_items(uri)?
            .into_iter()
            .map(|track| track.uri)
            .collect();

        core.clear_tracklist()?;
        core.add_tracks(&uris)?;
        core.set_random(self.state.shuffle)?;

        info!(
            playlist = %name,
            tracks = uris.len(),
            shuffle = self.state.shuffle,
            "Loaded playlist"
        );
        Ok(true)
    }

    /// Selects the next playlist, loads it and announces its name.
    ///
    /// Playback resumes only when the load succeeded; otherwise the transport
    /// is left as it was.
    pub fn advance(&mut self, core: &dyn PlaybackCore, announcer: &dyn Announcer) -> Result<bool> {
        let next = self
            .registry
            .next_after(&self.state.current_playlist)
            .to_string();
        self.state.current_playlist = next.clone();

        let loaded = self.load(core, &next)?;
        announcer.speak(&next);
        if loaded {
            core.play()?;
        }
        Ok(loaded)
    }

    /// Loads the current playlist at startup and starts playback when
    /// autoplay is on; otherwise announces readiness.
    pub fn on_start(&self, core: &dyn PlaybackCore, announcer: &dyn Announcer) -> Result<()> {
        let loaded = self.load(core, &self.state.current_playlist)?;
        if loaded && self.state.autoplay {
            core.play()?;
        } else {
            announcer.speak(READY_ANNOUNCEMENT);
        }
        Ok(())
    }
}
