use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use crate::{
    observers::{ObserverId, ObserverList},
    protocol::Message,
};

/// Outgoing queue of one connected peer
pub type PeerSender = mpsc::UnboundedSender<Message>;

pub type PeerId = ObserverId;

/// Who an outbound message is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    All,
    Peer(PeerId),
    AllExcept(PeerId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub target: Target,
    pub message: Message,
}

impl Outbound {
    pub fn broadcast(message: Message) -> Self {
        Self {
            target: Target::All,
            message,
        }
    }

    pub fn to_peer(peer: PeerId, message: Message) -> Self {
        Self {
            target: Target::Peer(peer),
            message,
        }
    }
}

/// The set of connected peers.
///
/// Delivery is best effort: a peer whose queue is closed is dropped on the
/// next send, nothing is buffered for peers that join later.
#[derive(Clone, Default)]
pub struct RelayHub {
    peers: Arc<Mutex<ObserverList<PeerSender>>>,
}

impl RelayHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn peers(&self) -> MutexGuard<'_, ObserverList<PeerSender>> {
        self.peers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_peer(&self, sender: PeerSender) -> PeerId {
        let id = self.peers().add(sender);
        log::info!("Peer {} connected", id);
        id
    }

    pub fn remove_peer(&self, id: PeerId) -> bool {
        let removed = self.peers().remove(id).is_some();
        if removed {
            log::info!("Peer {} disconnected", id);
        }
        removed
    }

    pub fn peer_count(&self) -> usize {
        self.peers().len()
    }

    /// Send to every connected peer, returns how many accepted it
    pub fn send(&self, message: &Message) -> usize {
        self.deliver(message, |_| true)
    }

    /// Send to a single peer
    pub fn send_to(&self, id: PeerId, message: &Message) -> bool {
        self.deliver(message, |peer| peer == id) == 1
    }

    pub fn dispatch(&self, outbound: Outbound) -> usize {
        match outbound.target {
            Target::All => self.send(&outbound.message),
            Target::Peer(id) => usize::from(self.send_to(id, &outbound.message)),
            Target::AllExcept(id) => self.deliver(&outbound.message, |peer| peer != id),
        }
    }

    fn deliver(&self, message: &Message, wanted: impl Fn(PeerId) -> bool) -> usize {
        let mut delivered = 0;
        self.peers().retain(|id, sender| {
            if !wanted(id) {
                return true;
            }
            match sender.send(message.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => {
                    log::debug!("Dropping closed peer {}", id);
                    false
                }
            }
        });
        delivered
    }
}
