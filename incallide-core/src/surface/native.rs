use std::sync::Arc;

use crate::{
    error::HostError,
    track::{TrackState, UNKNOWN},
};

use super::ControlSurface;

/// Track description as reported by the host player
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostTrack {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub cover_url: Option<String>,
}

/// In-process control API of the host player
pub trait HostPlayer: Send + Sync {
    /// `None` when nothing is loaded
    fn current_track(&self) -> Result<Option<HostTrack>, HostError>;
    fn position(&self) -> Result<f64, HostError>;
    fn duration(&self) -> Result<f64, HostError>;
    fn is_playing(&self) -> Result<bool, HostError>;
    fn volume(&self) -> Result<u8, HostError>;
    fn toggle_play_pause(&self) -> Result<(), HostError>;
    fn next(&self) -> Result<(), HostError>;
    fn previous(&self) -> Result<(), HostError>;
    fn set_volume(&self, volume: u8) -> Result<(), HostError>;
}

/// Surface backed by the host's own player API
pub struct NativeSurface {
    player: Arc<dyn HostPlayer>,
}

impl NativeSurface {
    pub fn new(player: Arc<dyn HostPlayer>) -> Self {
        Self { player }
    }
}

/// Log a failed getter and substitute a fallback value
fn or_default<T>(field: &str, result: Result<T, HostError>, fallback: T) -> T {
    result.unwrap_or_else(|err| {
        log::debug!("native {} unavailable: {}", field, err);
        fallback
    })
}

impl ControlSurface for NativeSurface {
    fn name(&self) -> &'static str {
        "native"
    }

    fn observe(&mut self) -> TrackState {
        let track = or_default("track", self.player.current_track(), None).unwrap_or_default();
        let text = |value: Option<String>| value.unwrap_or_else(|| UNKNOWN.to_string());

        TrackState {
            title: text(track.title),
            artist: text(track.artist),
            album: text(track.album),
            duration_seconds: or_default("duration", self.player.duration(), 0.0),
            position_seconds: or_default("position", self.player.position(), 0.0),
            is_playing: or_default("play state", self.player.is_playing(), false),
            volume: or_default("volume", self.player.volume(), 0),
            artwork_url: track.cover_url,
        }
        .normalized()
    }

    fn play_pause(&mut self) -> Result<(), HostError> {
        self.player.toggle_play_pause()
    }

    fn next(&mut self) -> Result<(), HostError> {
        self.player.next()
    }

    fn previous(&mut self) -> Result<(), HostError> {
        self.player.previous()
    }

    fn volume(&mut self) -> Result<u8, HostError> {
        self.player.volume()
    }

    fn set_volume(&mut self, volume: u8) -> Result<(), HostError> {
        self.player.set_volume(volume)
    }
}
