//! Terminal-side connection to the relay.
//!
//! A single background thread owns the WebSocket session and reconnects on a
//! fixed delay; the UI loop talks to it through [`ClientHandle`] without
//! ever blocking.

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message as WsMessage};

use crate::{
    commands::Command, error::BridgeError, protocol::Message, reconnect::ReconnectPolicy,
    track::TrackState,
};

/// Send a ping when the relay has been silent this long
pub const PING_AFTER_IDLE: Duration = Duration::from_secs(1);

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Events delivered to the UI loop
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Connected,
    Disconnected,
    Track(TrackState),
}

/// Connection state as seen by the terminal client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionState {
    /// Apply a listener event; track updates leave the state unchanged
    pub fn on_event(self, event: &ClientEvent) -> Self {
        match event {
            ClientEvent::Connected => ConnectionState::Connected,
            ClientEvent::Disconnected => ConnectionState::Disconnected,
            ClientEvent::Track(_) => self,
        }
    }
}

/// UI-side handle to the listener thread
pub struct ClientHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
    event_rx: Receiver<ClientEvent>,
    thread: Option<JoinHandle<()>>,
}

impl ClientHandle {
    /// Queue a command; dropped with a log line while disconnected
    pub fn send(&self, command: Command) {
        if self.cmd_tx.send(command).is_err() {
            log::warn!("Listener stopped, dropping {}", command);
        }
    }

    pub fn try_recv(&self) -> Result<ClientEvent, TryRecvError> {
        self.event_rx.try_recv()
    }

    pub fn events(&self) -> &Receiver<ClientEvent> {
        &self.event_rx
    }

    /// Close the socket and wait for the listener thread to exit
    pub fn shutdown(mut self) {
        let (closed_tx, _) = mpsc::unbounded_channel();
        drop(std::mem::replace(&mut self.cmd_tx, closed_tx));
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Relay listener panicked");
            }
        }
    }
}

/// Start the background listener for `url`.
///
/// Fails only if the listener runtime cannot be created.
pub fn spawn_listener(url: String, policy: ReconnectPolicy) -> Result<ClientHandle, BridgeError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| BridgeError::Startup(format!("cannot start listener runtime: {}", err)))?;

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = crossbeam_channel::unbounded();

    let thread = std::thread::Builder::new()
        .name("relay-listener".into())
        .spawn(move || runtime.block_on(listen(url, policy, cmd_rx, event_tx)))
        .map_err(|err| BridgeError::Startup(format!("cannot spawn listener thread: {}", err)))?;

    Ok(ClientHandle {
        cmd_tx,
        event_rx,
        thread: Some(thread),
    })
}

async fn listen(
    url: String,
    policy: ReconnectPolicy,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    events: Sender<ClientEvent>,
) {
    let mut wait_first = false;
    loop {
        let Some(ws) = connect(&url, policy, wait_first, &mut cmd_rx).await else {
            return;
        };
        log::info!("Connected to relay at {}", url);
        let _ = events.send(ClientEvent::Connected);

        let keep_going = session(ws, &mut cmd_rx, &events).await;

        log::info!("Disconnected from relay");
        let _ = events.send(ClientEvent::Disconnected);
        if !keep_going {
            return;
        }
        wait_first = true;
    }
}

/// Connect with fixed-delay retries. Returns `None` if the handle was dropped.
async fn connect(
    url: &str,
    policy: ReconnectPolicy,
    wait_first: bool,
    cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
) -> Option<WsStream> {
    let attempt = async {
        if wait_first {
            policy.pause().await;
        }
        policy
            .retry("Connecting to relay", move || async move {
                tokio_tungstenite::connect_async(url).await.map(|(ws, _)| ws)
            })
            .await
    };
    tokio::pin!(attempt);

    loop {
        tokio::select! {
            ws = &mut attempt => return Some(ws),
            command = cmd_rx.recv() => match command {
                Some(command) => log::warn!("Not connected, dropping {}", command),
                None => return None,
            },
        }
    }
}

async fn send(ws: &mut futures_util::stream::SplitSink<WsStream, WsMessage>, message: &Message) -> bool {
    let text = match message.to_json() {
        Ok(text) => text,
        Err(err) => {
            log::error!("Cannot encode {}: {}", message.kind(), err);
            return true;
        }
    };
    match ws.send(WsMessage::Text(text)).await {
        Ok(()) => true,
        Err(err) => {
            log::warn!("Send failed: {}", err);
            false
        }
    }
}

/// Run one connected session. Returns false when the handle was dropped.
async fn session(
    ws: WsStream,
    cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
    events: &Sender<ClientEvent>,
) -> bool {
    let (mut sink, mut frames) = ws.split();

    // nothing is buffered relay-side, so ask for the current snapshot
    if !send(&mut sink, &Message::RequestInfo).await {
        return true;
    }

    let mut idle = tokio::time::interval(PING_AFTER_IDLE);
    idle.reset();

    loop {
        tokio::select! {
            frame = frames.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    idle.reset();
                    match Message::from_json(&text) {
                        Ok(Message::TrackUpdate(state)) => {
                            let _ = events.send(ClientEvent::Track(state));
                        }
                        Ok(Message::Pong) => log::trace!("pong"),
                        Ok(other) => log::debug!("Ignoring {} from relay", other.kind()),
                        Err(err) => log::warn!("Bad frame from relay: {}", err),
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => return true,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    log::warn!("{}", BridgeError::from(err));
                    return true;
                }
            },
            command = cmd_rx.recv() => match command {
                Some(command) => {
                    log::debug!("Sending {}", command);
                    if !send(&mut sink, &Message::Command(command)).await {
                        return true;
                    }
                }
                None => {
                    let _ = sink.close().await;
                    return false;
                }
            },
            _ = idle.tick() => {
                if !send(&mut sink, &Message::Ping).await {
                    return true;
                }
            }
        }
    }
}
