use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder used for any text field the host could not report
pub const UNKNOWN: &str = "Unknown";

pub const MAX_VOLUME: u8 = 100;

/// Volume assumed when a publisher leaves it out
pub const DEFAULT_VOLUME: u8 = 70;

/// Full snapshot of what the host player is doing.
///
/// Always sent whole; there is no partial update form. Publishers may still
/// leave fields out, which decode to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackState {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Track length in seconds
    #[serde(rename = "duration")]
    pub duration_seconds: f64,
    /// Playback position in seconds
    #[serde(rename = "position")]
    pub position_seconds: f64,
    pub is_playing: bool,
    /// 0..=100; any JSON number is rounded and clamped on decode
    #[serde(default = "default_volume", deserialize_with = "lenient_volume")]
    pub volume: u8,
    pub artwork_url: Option<String>,
}

impl Default for TrackState {
    fn default() -> Self {
        Self {
            title: UNKNOWN.to_string(),
            artist: UNKNOWN.to_string(),
            album: UNKNOWN.to_string(),
            duration_seconds: 0.0,
            position_seconds: 0.0,
            is_playing: false,
            volume: 0,
            artwork_url: None,
        }
    }
}

fn default_volume() -> u8 {
    DEFAULT_VOLUME
}

fn lenient_volume<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() {
        return Ok(0);
    }
    Ok(raw.round().clamp(0.0, f64::from(MAX_VOLUME)) as u8)
}

impl TrackState {
    /// Identity used for change detection. Position, play state and volume
    /// are not part of it.
    pub fn track_key(&self) -> (&str, &str) {
        (&self.title, &self.artist)
    }

    /// Replace empty text fields with [`UNKNOWN`] and clamp numbers into range.
    pub fn normalized(mut self) -> Self {
        for field in [&mut self.title, &mut self.artist, &mut self.album] {
            if field.trim().is_empty() {
                *field = UNKNOWN.to_string();
            }
        }
        if !self.duration_seconds.is_finite() || self.duration_seconds < 0.0 {
            self.duration_seconds = 0.0;
        }
        if !self.position_seconds.is_finite() || self.position_seconds < 0.0 {
            self.position_seconds = 0.0;
        }
        self.volume = self.volume.min(MAX_VOLUME);
        self.artwork_url = self.artwork_url.filter(|url| !url.trim().is_empty());
        self
    }

    /// Get the progress fraction (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.duration_seconds > 0.0 {
            (self.position_seconds / self.duration_seconds).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Apply a signed delta to a volume and clamp the result into `0..=100`.
pub fn clamp_volume(current: u8, delta: i32) -> u8 {
    i32::from(current)
        .saturating_add(delta)
        .clamp(0, i32::from(MAX_VOLUME)) as u8
}

/// Format time as MM:SS
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_stays_in_range_for_any_delta_sequence() {
        let deltas = [
            10, 10, 250, -5, -1000, 37, i32::MAX, i32::MIN + 1, -10, 99, -101, 0,
        ];
        let mut volume = 50;
        for delta in deltas {
            volume = clamp_volume(volume, delta);
            assert!(volume <= MAX_VOLUME, "volume {} escaped range", volume);
        }
        assert_eq!(clamp_volume(95, 10), 100);
        assert_eq!(clamp_volume(5, -10), 0);
        assert_eq!(clamp_volume(40, 10), 50);
    }

    #[test]
    fn normalized_fills_unknown_fields() {
        let state = TrackState {
            title: "".into(),
            artist: "  ".into(),
            album: "Blue".into(),
            duration_seconds: f64::NAN,
            position_seconds: -3.0,
            is_playing: true,
            volume: 180,
            artwork_url: Some(String::new()),
        }
        .normalized();

        assert_eq!(state.title, UNKNOWN);
        assert_eq!(state.artist, UNKNOWN);
        assert_eq!(state.album, "Blue");
        assert_eq!(state.duration_seconds, 0.0);
        assert_eq!(state.position_seconds, 0.0);
        assert_eq!(state.volume, 100);
        assert_eq!(state.artwork_url, None);
    }

    #[test]
    fn wire_names_match_terminal_client() {
        let state = TrackState {
            title: "A Case of You".into(),
            artist: "Joni Mitchell".into(),
            album: "Blue".into(),
            duration_seconds: 262.0,
            position_seconds: 12.5,
            is_playing: true,
            volume: 70,
            artwork_url: None,
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["duration"], 262.0);
        assert_eq!(value["position"], 12.5);
        assert_eq!(value["isPlaying"], true);
        assert_eq!(value["volume"], 70);
        assert!(value["artworkUrl"].is_null());
    }

    #[test]
    fn format_time_pads_minutes_and_seconds() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(65.9), "01:05");
        assert_eq!(format_time(-4.0), "00:00");
    }
}
