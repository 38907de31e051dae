//! System media keys as a command source.
//!
//! - macOS: MPRemoteCommandCenter via souvlaki; the keyboard's F7/F8/F9
//!   media keys arrive here as previous, toggle and next
//! - elsewhere: not available, nothing is registered

use std::time::Duration;

use crossbeam_channel::Receiver;
use incallide_core::{commands::Command, engine::HostEngineHandle};

/// How long the main thread waits between checks for shutdown
const PUMP_INTERVAL: Duration = Duration::from_millis(100);

/// Media key presses, independent of the platform backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKey {
    Play,
    Pause,
    Toggle,
    Next,
    Previous,
    Stop,
    /// Anything the host player has no command for
    Other,
}

/// Command a media key press turns into. Play and pause toggle, since the
/// engine does not know the play state without polling.
pub fn command_for(key: MediaKey) -> Option<Command> {
    match key {
        MediaKey::Play | MediaKey::Pause | MediaKey::Toggle => Some(Command::PlayPause),
        MediaKey::Next => Some(Command::Next),
        MediaKey::Previous => Some(Command::Previous),
        MediaKey::Stop | MediaKey::Other => None,
    }
}

/// Forward one key press to the host engine; returns the command sent
pub fn dispatch(handle: &HostEngineHandle, key: MediaKey) -> Option<Command> {
    let command = command_for(key)?;
    log::debug!("Media key {:?} -> {}", key, command);
    handle.execute(command, None);
    Some(command)
}

/// Keeps the platform registration alive
pub struct MediaKeys {
    #[cfg(target_os = "macos")]
    _controls: souvlaki::MediaControls,
}

#[cfg(target_os = "macos")]
impl From<&souvlaki::MediaControlEvent> for MediaKey {
    fn from(event: &souvlaki::MediaControlEvent) -> Self {
        use souvlaki::MediaControlEvent;
        match event {
            MediaControlEvent::Play => MediaKey::Play,
            MediaControlEvent::Pause => MediaKey::Pause,
            MediaControlEvent::Toggle => MediaKey::Toggle,
            MediaControlEvent::Next => MediaKey::Next,
            MediaControlEvent::Previous => MediaKey::Previous,
            MediaControlEvent::Stop => MediaKey::Stop,
            _ => MediaKey::Other,
        }
    }
}

/// Register for media keys. `None` when the platform has no backend or
/// registration failed.
#[cfg(target_os = "macos")]
pub fn start(handle: HostEngineHandle) -> Option<MediaKeys> {
    use souvlaki::{MediaControlEvent, MediaControls, PlatformConfig};

    let config = PlatformConfig {
        dbus_name: "incallide",
        display_name: "Incallide",
        hwnd: None,
    };
    let mut controls = match MediaControls::new(config) {
        Ok(controls) => controls,
        Err(err) => {
            log::warn!("Media keys unavailable: {:?}", err);
            return None;
        }
    };
    if let Err(err) = controls.attach(move |event: MediaControlEvent| {
        dispatch(&handle, MediaKey::from(&event));
    }) {
        log::warn!("Cannot listen for media keys: {:?}", err);
        return None;
    }
    log::info!("Listening for media keys");
    Some(MediaKeys {
        _controls: controls,
    })
}

#[cfg(not(target_os = "macos"))]
pub fn start(_handle: HostEngineHandle) -> Option<MediaKeys> {
    log::debug!("Media keys are only captured on macOS");
    None
}

/// Block the calling thread until `stop` fires. On macOS the main run loop
/// is spun meanwhile, which is where media key callbacks are delivered.
pub fn run_until(stop: &Receiver<()>) {
    loop {
        #[cfg(target_os = "macos")]
        {
            use core_foundation::runloop::{CFRunLoop, kCFRunLoopDefaultMode};
            // SAFETY: reading an immutable CoreFoundation constant
            let mode = unsafe { kCFRunLoopDefaultMode };
            let _ = CFRunLoop::run_in_mode(mode, PUMP_INTERVAL, false);
            if stop.try_recv().is_ok() {
                return;
            }
        }
        #[cfg(not(target_os = "macos"))]
        match stop.recv_timeout(PUMP_INTERVAL) {
            Ok(()) | Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
        }
    }
}
