// pmogpio/src/capabilities.rs
//! Capability set expected from the playback core.
//!
//! The GPIO frontend never owns the player: it only issues commands through
//! these traits. Any host that can provide transport, volume, tracklist and
//! playlist listing gets [`PlaybackCore`] for free.

use std::fmt;

use crate::errors::Result;

/// Transport state as reported by the playback core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Stopped => write!(f, "stopped"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// Playlist entry from the core's library listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaylistRef {
    pub name: String,
    pub uri: String,
}

impl PlaylistRef {
    pub fn new(name: &str, uri: &str) -> Self {
        Self {
            name: name.to_string(),
            uri: uri.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackRef {
    pub uri: String,
}

/// Transport commands (play / pause / stop / skip).
pub trait TransportControl {
    fn play(&self) -> Result<()>;

    fn pause(&self) -> Result<()>;

    fn stop(&self) -> Result<()>;

    /// Skips to the next track of the tracklist.
    fn next(&self) -> Result<()>;

    /// Skips back to the previous track of the tracklist.
    fn previous(&self) -> Result<()>;
}

pub trait PlaybackStatus {
    fn playback_state(&self) -> Result<PlaybackState>;
}

/// Mixer access. Volumes are on a 0..=100 scale.
pub trait VolumeControl {
    fn volume(&self) -> Result<u16>;

    fn set_volume(&self, volume: u16) -> Result<()>;
}

/// Manipulation of the queue of tracks loaded for playback.
pub trait TracklistControl {
    fn clear_tracklist(&self) -> Result<()>;

    /// Appends tracks, in order, at the end of the tracklist.
    fn add_tracks(&self, uris: &[String]) -> Result<()>;

    /// Enables or disables shuffled playback order.
    fn set_random(&self, random: bool) -> Result<()>;
}

pub trait PlaylistLibrary {
    fn playlists(&self) -> Result<Vec<PlaylistRef>>;

    /// Ordered tracks of the playlist identified by `uri`.
    fn playlist_items(&self, uri: &str) -> Result<Vec<TrackRef>>;
}

/// Full capability set consumed by the handlers.
pub trait PlaybackCore:
    TransportControl + PlaybackStatus + VolumeControl + TracklistControl + PlaylistLibrary + Send + Sync
{
}

impl<T> PlaybackCore for T where
    T: TransportControl
        + PlaybackStatus
        + VolumeControl
        + TracklistControl
        + PlaylistLibrary
        + Send
        + Sync
{
}
