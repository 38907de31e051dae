use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::{
    engine::HostEngineHandle,
    error::BridgeError,
    protocol::Message,
    reconnect::ReconnectPolicy,
};

use super::hub::{Outbound, PeerId, RelayHub, Target};

/// WebSocket side of the relay channel
#[derive(Clone)]
pub struct RelayServer {
    hub: RelayHub,
    engine: HostEngineHandle,
}

impl RelayServer {
    pub fn new(hub: RelayHub, engine: HostEngineHandle) -> Self {
        Self { hub, engine }
    }

    pub fn hub(&self) -> &RelayHub {
        &self.hub
    }

    /// Bind and serve forever, re-binding on the policy's fixed delay
    /// whenever the listener cannot be created or fails.
    pub async fn run(self, bind_addr: String, policy: ReconnectPolicy) {
        let addr = bind_addr.as_str();
        loop {
            let listener = policy
                .retry("Binding relay listener", move || TcpListener::bind(addr))
                .await;

            match listener.local_addr() {
                Ok(addr) => log::info!("Relay listening on ws://{}", addr),
                Err(_) => log::info!("Relay listening on ws://{}", bind_addr),
            }

            if let Err(err) = self.clone().serve(listener).await {
                log::warn!("{}; re-binding in {}s", err, policy.delay().as_secs());
                policy.pause().await;
            }
        }
    }

    /// Accept connections on an already bound listener until it fails
    pub async fn serve(self, listener: TcpListener) -> Result<(), BridgeError> {
        loop {
            let (stream, addr) = listener.accept().await?;
            let server = self.clone();
            tokio::spawn(async move {
                if let Err(err) = server.handle_connection(stream, addr).await {
                    log::warn!("Connection from {} ended: {}", addr, err);
                }
            });
        }
    }

    async fn handle_connection(self, stream: TcpStream, addr: SocketAddr) -> Result<(), BridgeError> {
        let ws = tokio_tungstenite::accept_async(stream).await?;
        let (mut sink, mut frames) = ws.split();

        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        let peer = self.hub.add_peer(tx.clone());
        log::debug!("Peer {} is {}", peer, addr);

        let writer = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let text = match message.to_json() {
                    Ok(text) => text,
                    Err(err) => {
                        log::error!("Cannot encode {}: {}", message.kind(), err);
                        continue;
                    }
                };
                if sink.send(WsMessage::Text(text)).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let result = loop {
            match frames.next().await {
                Some(Ok(WsMessage::Text(text))) => self.on_text(peer, &tx, &text),
                Some(Ok(WsMessage::Close(_))) | None => break Ok(()),
                Some(Ok(_)) => {}
                Some(Err(err)) => break Err(BridgeError::from(err)),
            }
        };

        self.hub.remove_peer(peer);
        drop(tx);
        writer.abort();
        result
    }

    fn on_text(&self, peer: PeerId, tx: &mpsc::UnboundedSender<Message>, text: &str) {
        let message = match Message::from_json(text) {
            Ok(message) => message,
            Err(err) => {
                log::warn!("Ignoring frame from peer {}: {}", peer, err);
                return;
            }
        };

        match message {
            Message::Ping => {
                let _ = tx.send(Message::Pong);
            }
            Message::Pong => {}
            Message::RequestInfo => self.engine.request_snapshot(peer),
            Message::Command(command) => {
                log::info!("Command from peer {}: {}", peer, command);
                self.engine.execute(command, Some(peer));
            }
            Message::TrackUpdate(state) => {
                // pushed by an external publisher, fan out to everyone else
                self.hub.dispatch(Outbound {
                    target: Target::AllExcept(peer),
                    message: Message::TrackUpdate(state),
                });
            }
        }
    }
}

/// Forward host worker output into the hub until the worker goes away
pub async fn pump_outbound(hub: RelayHub, mut out_rx: mpsc::UnboundedReceiver<Outbound>) {
    while let Some(outbound) = out_rx.recv().await {
        let kind = outbound.message.kind();
        let delivered = hub.dispatch(outbound);
        log::trace!("{} delivered to {} peers", kind, delivered);
    }
}
