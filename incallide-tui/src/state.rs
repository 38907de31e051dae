use std::time::Instant;

use incallide_core::{
    client::{ClientEvent, ConnectionState},
    track::TrackState,
};

/// Application state for the TUI
pub struct AppState {
    pub connection: ConnectionState,
    /// Last snapshot from the relay, `None` until the first one arrives
    pub track: Option<TrackState>,
    /// When `track` was received, used to move the playhead between snapshots
    pub received_at: Option<Instant>,
    /// Status message to display
    pub status_message: String,
    pub relay_url: String,
}

impl AppState {
    pub fn new(relay_url: String) -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            track: None,
            received_at: None,
            status_message: format!("Connecting to {}", relay_url),
            relay_url,
        }
    }

    /// Handle an event from the relay listener
    pub fn handle_event(&mut self, event: ClientEvent) {
        self.handle_event_at(event, Instant::now());
    }

    pub(crate) fn handle_event_at(&mut self, event: ClientEvent, now: Instant) {
        self.connection = self.connection.on_event(&event);
        match event {
            ClientEvent::Connected => {
                self.status_message = format!("Connected to {}", self.relay_url);
            }
            ClientEvent::Disconnected => {
                self.status_message = "Disconnected – reconnecting".to_string();
            }
            ClientEvent::Track(state) => {
                let changed = self
                    .track
                    .as_ref()
                    .is_none_or(|old| old.track_key() != state.track_key());
                if changed {
                    log::info!("Now playing: {} - {}", state.title, state.artist);
                }
                self.track = Some(state);
                self.received_at = Some(now);
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    pub fn is_playing(&self) -> bool {
        self.track.as_ref().is_some_and(|t| t.is_playing)
    }

    /// Playhead estimate: the last reported position plus the wall time
    /// since, while playing. Never past the track's end.
    pub fn position_at(&self, now: Instant) -> f64 {
        let Some(track) = &self.track else {
            return 0.0;
        };
        let mut position = track.position_seconds;
        if track.is_playing {
            if let Some(at) = self.received_at {
                position += now.saturating_duration_since(at).as_secs_f64();
            }
        }
        if track.duration_seconds > 0.0 {
            position = position.min(track.duration_seconds);
        }
        position
    }

    pub fn duration(&self) -> f64 {
        self.track.as_ref().map_or(0.0, |t| t.duration_seconds)
    }

    /// Get the progress fraction (0.0 to 1.0)
    pub fn progress_at(&self, now: Instant) -> f64 {
        let duration = self.duration();
        if duration > 0.0 {
            (self.position_at(now) / duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
