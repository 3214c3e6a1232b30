//! Playback handlers bound to input events.
//!
//! Every handler has the same shape, `fn(&mut self, &EventOptions)`, so it can
//! be registered in the [`HandlerTable`](crate::dispatcher::HandlerTable).

use std::sync::Arc;

use tracing::{debug, info};

use crate::capabilities::{
    PlaybackCore, PlaybackState, PlaybackStatus, TransportControl, VolumeControl,
};
use crate::errors::Result;
use crate::playlist::PlaylistRotator;
use crate::settings::EventOptions;
use crate::speech::Announcer;

/// Volume increment used when a pin has no `step` option.
pub const DEFAULT_VOLUME_STEP: i64 = 5;

const MAX_VOLUME: i64 = 100;

pub struct PlaybackController {
    core: Arc<dyn PlaybackCore>,
    announcer: Arc<dyn Announcer>,
    rotator: PlaylistRotator,
}

impl PlaybackController {
    pub fn new(
        core: Arc<dyn PlaybackCore>,
        announcer: Arc<dyn Announcer>,
        rotator: PlaylistRotator,
    ) -> Self {
        Self {
            core,
            announcer,
            rotator,
        }
    }

    pub fn rotator(&self) -> &PlaylistRotator {
        &self.rotator
    }

    pub fn on_start(&mut self) -> Result<()> {
        self.rotator
            .on_start(self.core.as_ref(), self.announcer.as_ref())
    }

    pub fn play_pause(&mut self, _options: &EventOptions) -> Result<()> {
        if self.core.playback_state()? == PlaybackState::Playing {
            self.core.pause()
        } else {
            self.core.play()
        }
    }

    pub fn play_stop(&mut self, _options: &EventOptions) -> Result<()> {
        if self.core.playback_state()? == PlaybackState::Playing {
            self.core.stop()
        } else {
            self.core.play()
        }
    }

    pub fn next(&mut self, _options: &EventOptions) -> Result<()> {
        self.core.next()
    }

    pub fn prev(&mut self, _options: &EventOptions) -> Result<()> {
        self.core.previous()
    }

    pub fn volume_up(&mut self, options: &EventOptions) -> Result<()> {
        let step = options.integer("step", DEFAULT_VOLUME_STEP)?;
        self.adjust_volume(step)
    }

    pub fn volume_down(&mut self, options: &EventOptions) -> Result<()> {
        let step = options.integer("step", DEFAULT_VOLUME_STEP)?;
        self.adjust_volume(step.saturating_neg())
    }

    pub fn on_off(&mut self, _options: &EventOptions) -> Result<()> {
        // Reserved for power control.
        info!("handle_on_off");
        Ok(())
    }

    pub fn change_playlist(&mut self, _options: &EventOptions) -> Result<()> {
        info!(current = self.rotator.current_playlist(), "handle_change_playlist");
        self.rotator
            .advance(self.core.as_ref(), self.announcer.as_ref())
            .map(|_| ())
    }

    /// Saturating volume change clamped to 0..=100.
    fn adjust_volume(&self, delta: i64) -> Result<()> {
        let current = i64::from(self.core.volume()?);
        let target = current.saturating_add(delta).clamp(0, MAX_VOLUME);
        debug!(from = current, to = target, "Volume change");
        self.core.set_volume(target as u16)
    }
}
