//! Self-contained player that implements [`HostPlayer`].
//!
//! Lets the bridge run without the host application installed, and gives
//! tests a native surface whose calls can be counted.

use std::sync::Mutex;
use std::time::Instant;

use crate::{error::HostError, track::MAX_VOLUME};

use super::{HostPlayer, HostTrack};

#[derive(Debug, Clone, PartialEq)]
pub struct DemoTrack {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: f64,
}

impl DemoTrack {
    pub fn new(title: &str, artist: &str, album: &str, duration: f64) -> Self {
        Self {
            title: title.to_string(),
            artist: artist.to_string(),
            album: album.to_string(),
            duration,
        }
    }
}

/// How many times each control was invoked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemoCalls {
    pub toggles: usize,
    pub nexts: usize,
    pub previouses: usize,
    pub volume_sets: usize,
}

struct DemoInner {
    playlist: Vec<DemoTrack>,
    index: usize,
    playing_since: Option<Instant>,
    /// Position accumulated before `playing_since`
    offset: f64,
    volume: u8,
    calls: DemoCalls,
}

impl DemoInner {
    fn position(&self) -> f64 {
        let running = self
            .playing_since
            .map(|since| since.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        let duration = self.playlist.get(self.index).map(|t| t.duration).unwrap_or(0.0);
        (self.offset + running).min(duration)
    }

    fn jump_to(&mut self, index: usize) {
        self.index = index;
        self.offset = 0.0;
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
    }
}

pub struct DemoPlayer {
    inner: Mutex<DemoInner>,
}

impl Default for DemoPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoPlayer {
    /// Player with a small built-in playlist, paused on the first track
    pub fn new() -> Self {
        Self::with_tracks(vec![
            DemoTrack::new("Says", "Nils Frahm", "Spaces", 527.0),
            DemoTrack::new("Avril 14th", "Aphex Twin", "Drukqs", 125.0),
            DemoTrack::new("An Ending (Ascent)", "Brian Eno", "Apollo", 266.0),
        ])
    }

    pub fn with_tracks(playlist: Vec<DemoTrack>) -> Self {
        Self {
            inner: Mutex::new(DemoInner {
                playlist,
                index: 0,
                playing_since: None,
                offset: 0.0,
                volume: 70,
                calls: DemoCalls::default(),
            }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, DemoInner>, HostError> {
        self.inner
            .lock()
            .map_err(|_| HostError::Failed("demo player state poisoned".into()))
    }

    pub fn calls(&self) -> DemoCalls {
        self.lock().map(|inner| inner.calls).unwrap_or_default()
    }

    /// Move the playhead within the current track
    pub fn seek(&self, seconds: f64) {
        if let Ok(mut inner) = self.lock() {
            inner.offset = seconds.max(0.0);
            if inner.playing_since.is_some() {
                inner.playing_since = Some(Instant::now());
            }
        }
    }
}

impl HostPlayer for DemoPlayer {
    fn current_track(&self) -> Result<Option<HostTrack>, HostError> {
        let inner = self.lock()?;
        Ok(inner.playlist.get(inner.index).map(|track| HostTrack {
            title: Some(track.title.clone()),
            artist: Some(track.artist.clone()),
            album: Some(track.album.clone()),
            cover_url: None,
        }))
    }

    fn position(&self) -> Result<f64, HostError> {
        Ok(self.lock()?.position())
    }

    fn duration(&self) -> Result<f64, HostError> {
        let inner = self.lock()?;
        Ok(inner.playlist.get(inner.index).map(|t| t.duration).unwrap_or(0.0))
    }

    fn is_playing(&self) -> Result<bool, HostError> {
        Ok(self.lock()?.playing_since.is_some())
    }

    fn volume(&self) -> Result<u8, HostError> {
        Ok(self.lock()?.volume)
    }

    fn toggle_play_pause(&self) -> Result<(), HostError> {
        let mut inner = self.lock()?;
        inner.calls.toggles += 1;
        match inner.playing_since.take() {
            Some(since) => inner.offset += since.elapsed().as_secs_f64(),
            None => inner.playing_since = Some(Instant::now()),
        }
        Ok(())
    }

    fn next(&self) -> Result<(), HostError> {
        let mut inner = self.lock()?;
        inner.calls.nexts += 1;
        if inner.playlist.is_empty() {
            return Ok(());
        }
        let next = (inner.index + 1) % inner.playlist.len();
        inner.jump_to(next);
        Ok(())
    }

    fn previous(&self) -> Result<(), HostError> {
        let mut inner = self.lock()?;
        inner.calls.previouses += 1;
        if inner.playlist.is_empty() {
            return Ok(());
        }
        let len = inner.playlist.len();
        let prev = (inner.index + len - 1) % len;
        inner.jump_to(prev);
        Ok(())
    }

    fn set_volume(&self, volume: u8) -> Result<(), HostError> {
        let mut inner = self.lock()?;
        inner.calls.volume_sets += 1;
        inner.volume = volume.min(MAX_VOLUME);
        Ok(())
    }
}
