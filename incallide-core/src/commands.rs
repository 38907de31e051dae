use serde::{Deserialize, Serialize};

/// Commands sent from a terminal client to the host player.
///
/// Unit variants travel as bare snake_case strings (`"next"`), the delta
/// form as `{"volume_delta": 10}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Command {
    /// Toggle between playing and paused
    PlayPause,
    /// Skip to next track
    Next,
    /// Skip to previous track
    Previous,
    /// Raise volume by the configured step
    VolumeUp,
    /// Lower volume by the configured step
    VolumeDown,
    /// Change volume by a signed amount, clamped to 0..=100
    VolumeDelta(i32),
    /// Ask for a full snapshot of the current state
    RequestState,
}

impl Command {
    /// Resolve the volume change this command asks for, if any.
    pub fn volume_delta(&self, step: u8) -> Option<i32> {
        match self {
            Command::VolumeUp => Some(i32::from(step)),
            Command::VolumeDown => Some(-i32::from(step)),
            Command::VolumeDelta(delta) => Some(*delta),
            _ => None,
        }
    }
}
