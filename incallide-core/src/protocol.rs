//! JSON envelopes exchanged over the relay channel.
//!
//! Every frame is `{"type": <kind>, "data": <payload>}`. Kinds without a
//! payload send `data: {}`; a missing `data` is accepted on input.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{commands::Command, error::ProtocolError, track::TrackState};

pub const TRACK_UPDATE: &str = "track_update";
pub const COMMAND: &str = "command";
pub const REQUEST_INFO: &str = "request_info";
pub const PING: &str = "ping";
pub const PONG: &str = "pong";

/// Raw envelope as it appears on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// Decoded relay message
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    TrackUpdate(TrackState),
    Command(Command),
    RequestInfo,
    Ping,
    Pong,
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::TrackUpdate(_) => TRACK_UPDATE,
            Message::Command(_) => COMMAND,
            Message::RequestInfo => REQUEST_INFO,
            Message::Ping => PING,
            Message::Pong => PONG,
        }
    }

    /// Encode into a JSON text frame
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        let data = match self {
            Message::TrackUpdate(state) => serde_json::to_value(state)?,
            Message::Command(command) => serde_json::to_value(command)?,
            Message::RequestInfo | Message::Ping | Message::Pong => Value::Object(Map::new()),
        };
        let envelope = Envelope {
            kind: self.kind().to_string(),
            data,
        };
        Ok(serde_json::to_string(&envelope)?)
    }

    /// Decode a JSON text frame
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        Message::try_from(envelope)
    }
}

impl TryFrom<Envelope> for Message {
    type Error = ProtocolError;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        let invalid = |reason: serde_json::Error| ProtocolError::InvalidPayload {
            kind: envelope.kind.clone(),
            reason: reason.to_string(),
        };

        match envelope.kind.as_str() {
            TRACK_UPDATE => serde_json::from_value(envelope.data.clone())
                .map(|state: TrackState| Message::TrackUpdate(state.normalized()))
                .map_err(invalid),
            COMMAND => serde_json::from_value(envelope.data.clone())
                .map(Message::Command)
                .map_err(invalid),
            REQUEST_INFO => Ok(Message::RequestInfo),
            PING => Ok(Message::Ping),
            PONG => Ok(Message::Pong),
            other => Err(ProtocolError::UnknownType(other.to_string())),
        }
    }
}
