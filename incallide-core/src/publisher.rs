use crate::{surface::ControlSurface, track::TrackState};

/// Detects track changes on the host and decides when to broadcast.
///
/// A change is a different (title, artist) pair than the last one
/// broadcast. Position, play state and volume never trigger on their own.
#[derive(Debug, Default)]
pub struct StatePublisher {
    last_broadcast: Option<(String, String)>,
}

impl StatePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe the host; returns a snapshot to broadcast if the track changed
    pub fn poll(&mut self, surface: &mut dyn ControlSurface) -> Option<TrackState> {
        let state = surface.observe();
        self.track_changed(&state).then_some(state)
    }

    /// Full snapshot for an explicit request, regardless of change state
    pub fn snapshot(&self, surface: &mut dyn ControlSurface) -> TrackState {
        surface.observe()
    }

    /// Record `state` as broadcast if its track differs from the last one
    pub fn track_changed(&mut self, state: &TrackState) -> bool {
        let (title, artist) = state.track_key();
        let unchanged = self
            .last_broadcast
            .as_ref()
            .is_some_and(|(last_title, last_artist)| last_title == title && last_artist == artist);
        if unchanged {
            return false;
        }

        log::info!("Track changed: {} - {}", title, artist);
        self.last_broadcast = Some((title.to_string(), artist.to_string()));
        true
    }
}
