//! Key-value settings read once at startup.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

pub const DEFAULT_PORT: u16 = 9876;
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Lower bound for the reconnect delay; zero would spin the retry loop
pub const MIN_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Which control surface to use for the host player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SurfacePreference {
    /// Probe in order: native API, UI scraping, raw key codes
    #[default]
    Auto,
    Native,
    Scrape,
    Keys,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub reconnect_delay_secs: u64,
    pub poll_interval_ms: u64,
    pub volume_step: u8,
    pub surface: SurfacePreference,
    /// Name of the host application; detected when absent
    pub app_name: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            reconnect_delay_secs: 5,
            poll_interval_ms: 1000,
            volume_step: 10,
            surface: SurfacePreference::Auto,
            app_name: None,
        }
    }
}

impl Config {
    /// Get the default config file path (~/.config/incallide/config.toml)
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("incallide")
            .join("config.toml")
    }

    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs).max(MIN_RECONNECT_DELAY)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(50))
    }

    /// Whether `host` names the local machine only
    pub fn is_loopback(&self) -> bool {
        match self.host.parse::<IpAddr>() {
            Ok(ip) => ip.is_loopback(),
            Err(_) => self.host.eq_ignore_ascii_case("localhost"),
        }
    }

    /// Address the relay server binds to. The relay is never exposed beyond
    /// the local machine.
    pub fn bind_addr(&self) -> Result<String, BridgeError> {
        if !self.is_loopback() {
            return Err(BridgeError::Startup(format!(
                "relay host `{}` is not a loopback address",
                self.host
            )));
        }
        Ok(format!("{}:{}", self.host, self.port))
    }

    /// URL terminal clients connect to
    pub fn relay_url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.port, 9876);
        assert_eq!(config.reconnect_delay(), Duration::from_secs(5));
        assert_eq!(config.relay_url(), "ws://127.0.0.1:9876");
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 9900\nsurface = \"keys\"\napp_name = \"TIDAL\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.port, 9900);
        assert_eq!(config.surface, SurfacePreference::Keys);
        assert_eq!(config.app_name.as_deref(), Some("TIDAL"));
        assert_eq!(config.volume_step, 10);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn zero_reconnect_delay_is_clamped() {
        let config = Config {
            reconnect_delay_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.reconnect_delay(), MIN_RECONNECT_DELAY);

        let config = Config {
            reconnect_delay_secs: 30,
            ..Config::default()
        };
        assert_eq!(config.reconnect_delay(), Duration::from_secs(30));
    }

    #[test]
    fn relay_only_binds_loopback_hosts() {
        for host in ["127.0.0.1", "::1", "localhost", "LOCALHOST"] {
            let config = Config {
                host: host.to_string(),
                ..Config::default()
            };
            assert!(config.bind_addr().is_ok(), "{} should be accepted", host);
        }
        assert_eq!(Config::default().bind_addr().unwrap(), "127.0.0.1:9876");

        for host in ["0.0.0.0", "192.168.1.20", "music.example.org"] {
            let config = Config {
                host: host.to_string(),
                ..Config::default()
            };
            let err = config.bind_addr().unwrap_err();
            assert!(err.is_fatal(), "{} should be rejected", host);
        }
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();
        assert!(Config::load(file.path()).is_err());
    }
}
