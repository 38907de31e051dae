//! Capability surfaces for observing and controlling the host player.
//!
//! Three implementations exist, picked once at startup by [`select_surface`]:
//! - [`NativeSurface`]: the host exposes an in-process player API
//! - [`ScrapeSurface`]: read visible UI text, control through app shortcuts
//! - [`KeystrokeSurface`]: nothing to read, raw key codes only

pub mod applescript;
pub mod demo;
pub mod keys;
pub mod native;
pub mod scrape;

use std::sync::Arc;

use crate::{
    config::SurfacePreference,
    error::{BridgeError, HostError},
    track::TrackState,
};

pub use keys::{KeyGesture, KeySender, KeystrokeSurface};
pub use native::{HostPlayer, HostTrack, NativeSurface};
pub use scrape::{ScrapeSurface, UiField, UiProbe};

/// One way of talking to the host player.
///
/// Owned by the host worker thread; calls may block (e.g. on `osascript`).
pub trait ControlSurface: Send {
    /// Short label for logs
    fn name(&self) -> &'static str;

    /// Read a full snapshot. Never fails: unknown text is `"Unknown"`,
    /// unknown numbers are 0.
    fn observe(&mut self) -> TrackState;

    fn play_pause(&mut self) -> Result<(), HostError>;

    fn next(&mut self) -> Result<(), HostError>;

    fn previous(&mut self) -> Result<(), HostError>;

    /// Current volume as the surface knows it (0..=100)
    fn volume(&mut self) -> Result<u8, HostError>;

    /// Set an already clamped volume
    fn set_volume(&mut self, volume: u8) -> Result<(), HostError>;
}

/// Collaborators found on this machine
#[derive(Default)]
pub struct Capabilities {
    pub native: Option<Arc<dyn HostPlayer>>,
    pub probe: Option<Box<dyn UiProbe>>,
    pub keys: Option<Box<dyn KeySender>>,
}

impl Capabilities {
    pub fn with_native(player: Arc<dyn HostPlayer>) -> Self {
        Self {
            native: Some(player),
            ..Default::default()
        }
    }
}

/// Pick the surface to use for the lifetime of the process.
///
/// With [`SurfacePreference::Auto`] the order is native, scrape, keys. A
/// forced preference whose collaborators are missing is a startup error.
pub fn select_surface(
    caps: Capabilities,
    preference: SurfacePreference,
    volume_step: u8,
) -> Result<Box<dyn ControlSurface>, BridgeError> {
    let Capabilities {
        native,
        probe,
        keys,
    } = caps;

    let surface: Box<dyn ControlSurface> = match preference {
        SurfacePreference::Native => {
            let player = native.ok_or_else(|| {
                BridgeError::Startup("native player API requested but not available".into())
            })?;
            Box::new(NativeSurface::new(player))
        }
        SurfacePreference::Scrape => match (probe, keys) {
            (Some(probe), Some(keys)) => Box::new(ScrapeSurface::new(probe, keys, volume_step)),
            _ => {
                return Err(BridgeError::Startup(
                    "UI scraping requested but no UI probe or key sender is available".into(),
                ));
            }
        },
        SurfacePreference::Keys => {
            let keys = keys.ok_or_else(|| {
                BridgeError::Startup("key codes requested but no key sender is available".into())
            })?;
            Box::new(KeystrokeSurface::new(keys, volume_step))
        }
        SurfacePreference::Auto => {
            if let Some(player) = native {
                Box::new(NativeSurface::new(player))
            } else {
                log::warn!(
                    "{}, falling back",
                    BridgeError::HostPlayerUnavailable("no native player API".into())
                );
                match (probe, keys) {
                    (Some(probe), Some(keys)) => {
                        Box::new(ScrapeSurface::new(probe, keys, volume_step))
                    }
                    (None, Some(keys)) => {
                        log::warn!("No UI probe either, track info will read as Unknown");
                        Box::new(KeystrokeSurface::new(keys, volume_step))
                    }
                    (_, None) => {
                        return Err(BridgeError::Startup(
                            "no way to control the host player: no native API and no key sender"
                                .into(),
                        ));
                    }
                }
            }
        }
    };

    log::info!("Using {} surface", surface.name());
    Ok(surface)
}
