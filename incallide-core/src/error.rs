use thiserror::Error;

/// Failure of a single call against the host player capability surface.
#[derive(Debug, Error)]
pub enum HostError {
    /// The surface does not offer this operation at all
    #[error("{0} is not supported by this surface")]
    Unsupported(&'static str),
    /// The host application is not running or could not be reached
    #[error("host player unavailable: {0}")]
    Unavailable(String),
    /// The call was made but the host rejected or failed it
    #[error("host call failed: {0}")]
    Failed(String),
}

/// Error taxonomy of the bridge.
///
/// Only [`BridgeError::Startup`] is allowed to end a process. Every other
/// variant is caught where it happens and turned into a log line.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Channel unreachable or dropped; recovered by fixed-delay reconnect
    #[error("transport error: {0}")]
    Transport(String),
    /// Preferred control surface missing; a fallback surface is selected
    #[error("host player unavailable: {0}")]
    HostPlayerUnavailable(String),
    /// A command reached the surface and failed there
    #[error("command execution failed: {0}")]
    CommandExecution(#[from] HostError),
    /// A required capability is entirely absent
    #[error("startup failed: {0}")]
    Startup(String),
}

impl BridgeError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, BridgeError::Startup(_))
    }
}

/// Decoding failures for relay envelopes.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown message type `{0}`")]
    UnknownType(String),
    #[error("invalid `{kind}` payload: {reason}")]
    InvalidPayload { kind: String, reason: String },
}

impl From<tokio_tungstenite::tungstenite::Error> for BridgeError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        BridgeError::Transport(err.to_string())
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Transport(err.to_string())
    }
}
