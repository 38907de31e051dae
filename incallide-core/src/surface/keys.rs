use crate::{
    error::HostError,
    track::{MAX_VOLUME, TrackState},
};

use super::ControlSurface;

/// A key code with an optional command modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyGesture {
    pub key_code: u16,
    pub command: bool,
}

impl KeyGesture {
    pub const fn plain(key_code: u16) -> Self {
        Self {
            key_code,
            command: false,
        }
    }

    pub const fn with_command(key_code: u16) -> Self {
        Self {
            key_code,
            command: true,
        }
    }
}

/// Space
pub const PLAY_PAUSE: KeyGesture = KeyGesture::plain(49);
/// Cmd + Right arrow
pub const NEXT_TRACK: KeyGesture = KeyGesture::with_command(124);
/// Cmd + Left arrow
pub const PREVIOUS_TRACK: KeyGesture = KeyGesture::with_command(123);
/// Cmd + Up arrow
pub const VOLUME_UP: KeyGesture = KeyGesture::with_command(126);
/// Cmd + Down arrow
pub const VOLUME_DOWN: KeyGesture = KeyGesture::with_command(125);

/// Volume the host is assumed to start at when it cannot be read
pub const ASSUMED_VOLUME: u8 = 70;

/// Delivers synthetic key presses to the host application
pub trait KeySender: Send {
    fn send(&mut self, gesture: KeyGesture) -> Result<(), HostError>;
}

/// Key gestures plus the local estimates they imply.
///
/// Key presses give no feedback, so play state and volume are tracked here.
pub struct KeyGestures {
    sender: Box<dyn KeySender>,
    volume_step: u8,
    pub(crate) volume_estimate: u8,
    pub(crate) playing_estimate: bool,
}

impl KeyGestures {
    pub fn new(sender: Box<dyn KeySender>, volume_step: u8) -> Self {
        Self {
            sender,
            volume_step: volume_step.max(1),
            volume_estimate: ASSUMED_VOLUME,
            playing_estimate: false,
        }
    }

    pub fn play_pause(&mut self) -> Result<(), HostError> {
        self.sender.send(PLAY_PAUSE)?;
        self.playing_estimate = !self.playing_estimate;
        Ok(())
    }

    pub fn next(&mut self) -> Result<(), HostError> {
        self.sender.send(NEXT_TRACK)
    }

    pub fn previous(&mut self) -> Result<(), HostError> {
        self.sender.send(PREVIOUS_TRACK)
    }

    /// Press volume up/down until the estimate reaches `target`.
    ///
    /// Each press that went through moves the estimate one step, so a
    /// failure partway leaves it where the host actually is.
    pub fn set_volume(&mut self, target: u8) -> Result<(), HostError> {
        let target = target.min(MAX_VOLUME);
        let raising = target >= self.volume_estimate;
        let gesture = if raising { VOLUME_UP } else { VOLUME_DOWN };

        while self.volume_estimate != target {
            self.sender.send(gesture)?;
            self.volume_estimate = if raising {
                self.volume_estimate.saturating_add(self.volume_step).min(target)
            } else {
                self.volume_estimate.saturating_sub(self.volume_step).max(target)
            };
        }
        Ok(())
    }
}

/// Surface for hosts that can only be driven by raw key codes.
///
/// Track text is never readable here; every snapshot reports `"Unknown"`
/// with the locally estimated play state and volume.
pub struct KeystrokeSurface {
    gestures: KeyGestures,
}

impl KeystrokeSurface {
    pub fn new(sender: Box<dyn KeySender>, volume_step: u8) -> Self {
        Self {
            gestures: KeyGestures::new(sender, volume_step),
        }
    }
}

impl ControlSurface for KeystrokeSurface {
    fn name(&self) -> &'static str {
        "keys"
    }

    fn observe(&mut self) -> TrackState {
        TrackState {
            is_playing: self.gestures.playing_estimate,
            volume: self.gestures.volume_estimate,
            ..TrackState::default()
        }
    }

    fn play_pause(&mut self) -> Result<(), HostError> {
        self.gestures.play_pause()
    }

    fn next(&mut self) -> Result<(), HostError> {
        self.gestures.next()
    }

    fn previous(&mut self) -> Result<(), HostError> {
        self.gestures.previous()
    }

    fn volume(&mut self) -> Result<u8, HostError> {
        Ok(self.gestures.volume_estimate)
    }

    fn set_volume(&mut self, volume: u8) -> Result<(), HostError> {
        self.gestures.set_volume(volume)
    }
}
