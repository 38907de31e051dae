//! Relay channel between the host-side publisher and terminal clients.

pub mod hub;
pub mod server;

pub use hub::{Outbound, PeerId, RelayHub, Target};
pub use server::{RelayServer, pump_outbound};
