use crate::{
    error::HostError,
    track::{TrackState, UNKNOWN},
};

use super::{ControlSurface, KeySender, keys::KeyGestures};

/// UI elements the scraper knows how to look for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum UiField {
    Title,
    Artist,
    Album,
    /// Elapsed time text, e.g. `1:23`
    Position,
    /// Total time text, e.g. `4:05`
    Duration,
    /// Label of the play/pause button (`Pause` while playing)
    PlayButton,
    Volume,
    Artwork,
}

/// Reads visible text out of the host application's UI
pub trait UiProbe: Send {
    /// Called once before each round of reads
    fn refresh(&mut self) {}

    /// Text of the element, `None` when it is missing
    fn read(&mut self, field: UiField) -> Option<String>;
}

/// Surface that reads the UI and controls through the app's keyboard shortcuts
pub struct ScrapeSurface {
    probe: Box<dyn UiProbe>,
    gestures: KeyGestures,
}

impl ScrapeSurface {
    pub fn new(probe: Box<dyn UiProbe>, keys: Box<dyn KeySender>, volume_step: u8) -> Self {
        Self {
            probe,
            gestures: KeyGestures::new(keys, volume_step),
        }
    }

    fn text(&mut self, field: UiField) -> String {
        self.probe
            .read(field)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    fn seconds(&mut self, field: UiField) -> f64 {
        self.probe
            .read(field)
            .and_then(|text| parse_clock(&text))
            .unwrap_or(0.0)
    }
}

/// Parse `ss`, `m:ss` or `h:mm:ss` into seconds
pub fn parse_clock(text: &str) -> Option<f64> {
    let text = text.trim().trim_start_matches('-');
    if text.is_empty() {
        return None;
    }
    text.split(':').try_fold(0.0, |acc, part| {
        let value: f64 = part.trim().parse().ok()?;
        (value >= 0.0).then_some(acc * 60.0 + value)
    })
}

/// Parse a volume label such as `70` or `70%`
fn parse_volume(text: &str) -> Option<u8> {
    let value: f64 = text.trim().trim_end_matches('%').trim().parse().ok()?;
    Some(value.round().clamp(0.0, 100.0) as u8)
}

impl ControlSurface for ScrapeSurface {
    fn name(&self) -> &'static str {
        "scrape"
    }

    fn observe(&mut self) -> TrackState {
        self.probe.refresh();

        let title = self.text(UiField::Title);
        let artist = self.text(UiField::Artist);
        let album = self.text(UiField::Album);
        let duration_seconds = self.seconds(UiField::Duration);
        let position_seconds = self.seconds(UiField::Position);

        if let Some(label) = self.probe.read(UiField::PlayButton) {
            self.gestures.playing_estimate = label.trim().eq_ignore_ascii_case("pause");
        }
        if let Some(volume) = self.probe.read(UiField::Volume).and_then(|t| parse_volume(&t)) {
            self.gestures.volume_estimate = volume;
        }

        TrackState {
            title,
            artist,
            album,
            duration_seconds,
            position_seconds,
            is_playing: self.gestures.playing_estimate,
            volume: self.gestures.volume_estimate,
            artwork_url: self.probe.read(UiField::Artwork),
        }
        .normalized()
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
        if let Some(volume) = self.probe.read(UiField::Volume).and_then(|t| parse_volume(&t)) {
            self.gestures.volume_estimate = volume;
        }
        Ok(self.gestures.volume_estimate)
    }

    fn set_volume(&mut self, volume: u8) -> Result<(), HostError> {
        self.gestures.set_volume(volume)
    }
}
