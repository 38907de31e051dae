pub mod bridge;
pub mod client;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod observers;
pub mod protocol;
pub mod publisher;
pub mod reconnect;
pub mod relay;
pub mod surface;
pub mod track;
pub mod watchdog;

pub use commands::Command;
pub use error::{BridgeError, HostError, ProtocolError};
pub use protocol::Message;
pub use track::TrackState;
