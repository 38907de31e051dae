//! macOS collaborators driven through `osascript` and System Events.
//!
//! These compile everywhere; off macOS detection simply finds nothing.

use std::path::PathBuf;
use std::process::Command;

use crate::error::HostError;

use super::{KeyGesture, KeySender, UiField, UiProbe};

/// App names the host player ships under
pub const KNOWN_APP_NAMES: &[&str] = &["TIDAL", "Tidal Luna", "Tidal"];

/// Run an AppleScript snippet and return its trimmed stdout
pub fn run_osascript(script: &str) -> Result<String, HostError> {
    let output = Command::new("osascript")
        .arg("-e")
        .arg(script)
        .output()
        .map_err(|err| HostError::Unavailable(format!("osascript: {}", err)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(HostError::Failed(stderr.trim().to_string()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Escape a value for embedding inside an AppleScript string literal
fn quoted(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// The installed host application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostApp {
    pub name: String,
}

impl HostApp {
    /// Look for the host app in `/Applications` and `~/Applications`.
    ///
    /// A configured name is trusted as long as its bundle exists.
    pub fn detect(configured: Option<&str>) -> Option<HostApp> {
        if !cfg!(target_os = "macos") {
            return None;
        }

        let candidates: Vec<&str> = match configured {
            Some(name) => vec![name],
            None => KNOWN_APP_NAMES.to_vec(),
        };
        let roots: Vec<PathBuf> = [
            Some(PathBuf::from("/Applications")),
            dirs::home_dir().map(|home| home.join("Applications")),
        ]
        .into_iter()
        .flatten()
        .collect();

        candidates
            .into_iter()
            .find(|name| {
                roots
                    .iter()
                    .any(|root| root.join(format!("{}.app", name)).exists())
            })
            .map(|name| HostApp {
                name: name.to_string(),
            })
    }

    pub fn is_running(&self) -> bool {
        let script = format!(
            r#"tell application "System Events" to return (name of every application process) contains "{}""#,
            quoted(&self.name)
        );
        match run_osascript(&script) {
            Ok(answer) => answer == "true",
            Err(err) => {
                log::error!("Error checking if {} is running: {}", self.name, err);
                false
            }
        }
    }

    pub fn launch(&self) -> Result<(), HostError> {
        let status = Command::new("open")
            .arg("-a")
            .arg(&self.name)
            .status()
            .map_err(|err| HostError::Unavailable(format!("open: {}", err)))?;
        if status.success() {
            log::info!("Launched {}", self.name);
            Ok(())
        } else {
            Err(HostError::Failed(format!("open -a {} exited with {}", self.name, status)))
        }
    }

    /// Title of the app's front window, `None` when it has no window
    pub fn window_title(&self) -> Result<Option<String>, HostError> {
        let script = format!(
            r#"tell application "System Events"
                tell process "{}"
                    if exists window 1 then
                        return name of window 1
                    else
                        return ""
                    end if
                end tell
            end tell"#,
            quoted(&self.name)
        );
        let title = run_osascript(&script)?;
        Ok((!title.is_empty()).then_some(title))
    }
}

/// Split a `"<title> - <artist>"` window title.
///
/// A bare app name (no separator) yields nothing.
pub fn parse_window_title(title: &str) -> (Option<String>, Option<String>) {
    match title.rsplit_once(" - ") {
        Some((track, artist)) if !track.trim().is_empty() => (
            Some(track.trim().to_string()),
            Some(artist.trim().to_string()).filter(|a| !a.is_empty()),
        ),
        _ => (None, None),
    }
}

/// Reads track text from the host's window title
pub struct WindowTitleProbe {
    app: HostApp,
    title: Option<String>,
    artist: Option<String>,
}

impl WindowTitleProbe {
    pub fn new(app: HostApp) -> Self {
        Self {
            app,
            title: None,
            artist: None,
        }
    }
}

impl UiProbe for WindowTitleProbe {
    fn refresh(&mut self) {
        let (title, artist) = match self.app.window_title() {
            Ok(Some(window)) => parse_window_title(&window),
            Ok(None) => (None, None),
            Err(err) => {
                log::debug!("window title unavailable: {}", err);
                (None, None)
            }
        };
        self.title = title;
        self.artist = artist;
    }

    fn read(&mut self, field: UiField) -> Option<String> {
        match field {
            UiField::Title => self.title.clone(),
            UiField::Artist => self.artist.clone(),
            _ => None,
        }
    }
}

/// Sends key codes to the host process through System Events
pub struct SystemEventsKeys {
    app: HostApp,
}

impl SystemEventsKeys {
    pub fn new(app: HostApp) -> Self {
        Self { app }
    }
}

impl KeySender for SystemEventsKeys {
    fn send(&mut self, gesture: KeyGesture) -> Result<(), HostError> {
        if !self.app.is_running() {
            return Err(HostError::Unavailable(format!("{} is not running", self.app.name)));
        }

        let modifiers = if gesture.command {
            " using {command down}"
        } else {
            ""
        };
        let script = format!(
            r#"tell application "System Events"
                tell process "{}"
                    set frontmost to true
                    key code {}{}
                end tell
            end tell"#,
            quoted(&self.app.name),
            gesture.key_code,
            modifiers
        );
        run_osascript(&script)?;
        log::debug!("Sent key code {} (command: {})", gesture.key_code, gesture.command);
        Ok(())
    }
}
