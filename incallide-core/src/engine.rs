use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tokio::sync::mpsc;

use crate::{
    bridge::{CommandBridge, CommandOutcome, CommandStats},
    commands::Command,
    protocol::Message,
    publisher::StatePublisher,
    relay::hub::{Outbound, PeerId},
    surface::ControlSurface,
};

/// Requests sent to the host worker
#[derive(Debug)]
pub enum HostRequest {
    /// Apply a command, then answer `reply_to` with a fresh snapshot
    Execute {
        command: Command,
        reply_to: Option<PeerId>,
    },
    /// Answer `reply_to` with a full snapshot
    Snapshot { reply_to: PeerId },
    Shutdown,
}

/// Cheap, cloneable handle for talking to the host worker.
///
/// Sending never blocks; the worker applies requests in arrival order.
#[derive(Clone)]
pub struct HostEngineHandle {
    req_tx: Sender<HostRequest>,
}

impl HostEngineHandle {
    pub fn execute(&self, command: Command, reply_to: Option<PeerId>) {
        self.send(HostRequest::Execute { command, reply_to });
    }

    pub fn request_snapshot(&self, reply_to: PeerId) {
        self.send(HostRequest::Snapshot { reply_to });
    }

    pub fn shutdown(&self) {
        self.send(HostRequest::Shutdown);
    }

    fn send(&self, request: HostRequest) {
        if let Err(err) = self.req_tx.send(request) {
            log::warn!("Host worker is gone, dropping {:?}", err.into_inner());
        }
    }
}

/// Single owner of the host player surface.
///
/// Runs the state publisher on a fixed tick and the command bridge on
/// request, all on one dedicated thread.
pub struct HostEngine {
    surface: Box<dyn ControlSurface>,
    publisher: StatePublisher,
    bridge: CommandBridge,
    req_rx: Receiver<HostRequest>,
    out_tx: mpsc::UnboundedSender<Outbound>,
    poll_interval: Duration,
}

impl HostEngine {
    pub fn new(
        surface: Box<dyn ControlSurface>,
        bridge: CommandBridge,
        poll_interval: Duration,
    ) -> (Self, HostEngineHandle, mpsc::UnboundedReceiver<Outbound>) {
        let (req_tx, req_rx) = crossbeam_channel::unbounded();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        let engine = Self {
            surface,
            publisher: StatePublisher::new(),
            bridge,
            req_rx,
            out_tx,
            poll_interval,
        };
        (engine, HostEngineHandle { req_tx }, out_rx)
    }

    /// Spawn the worker on a dedicated thread; returns final command stats on exit
    pub fn spawn(self) -> std::io::Result<JoinHandle<CommandStats>> {
        std::thread::Builder::new()
            .name("host-engine".into())
            .spawn(move || self.run())
    }

    fn run(mut self) -> CommandStats {
        log::info!(
            "Host engine started on {} surface, polling every {:?}",
            self.surface.name(),
            self.poll_interval
        );
        let ticker = crossbeam_channel::tick(self.poll_interval);
        self.poll();

        loop {
            crossbeam_channel::select! {
                recv(self.req_rx) -> request => match request {
                    Ok(HostRequest::Shutdown) | Err(_) => break,
                    Ok(request) => self.handle(request),
                },
                recv(ticker) -> _ => self.poll(),
            }
        }

        let stats = self.bridge.stats();
        log::info!(
            "Host engine stopped: {} commands handled, {} failed",
            stats.handled,
            stats.failed
        );
        stats
    }

    pub(crate) fn poll(&mut self) {
        if let Some(state) = self.publisher.poll(self.surface.as_mut()) {
            self.emit(Outbound::broadcast(Message::TrackUpdate(state)));
        }
    }

    pub(crate) fn handle(&mut self, request: HostRequest) {
        match request {
            HostRequest::Execute { command, reply_to } => {
                let outcome = self.bridge.execute(self.surface.as_mut(), command);
                if let CommandOutcome::Swallowed(err) = &outcome {
                    log::debug!("{} swallowed: {}", command, err);
                }
                // a skip may have changed the track; let watchers know right away
                self.poll();
                if let Some(peer) = reply_to {
                    self.reply_snapshot(peer);
                }
            }
            HostRequest::Snapshot { reply_to } => self.reply_snapshot(reply_to),
            HostRequest::Shutdown => {}
        }
    }

    fn reply_snapshot(&mut self, peer: PeerId) {
        let state = self.publisher.snapshot(self.surface.as_mut());
        self.emit(Outbound::to_peer(peer, Message::TrackUpdate(state)));
    }

    fn emit(&self, outbound: Outbound) {
        if self.out_tx.send(outbound).is_err() {
            log::debug!("Relay is gone, dropping outbound message");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        observers::ObserverList,
        relay::hub::Target,
        surface::{NativeSurface, demo::DemoPlayer},
    };

    fn peer() -> PeerId {
        let mut ids = ObserverList::new();
        ids.add(())
    }

    fn engine() -> (
        Arc<DemoPlayer>,
        HostEngine,
        mpsc::UnboundedReceiver<Outbound>,
    ) {
        let player = Arc::new(DemoPlayer::new());
        let surface = Box::new(NativeSurface::new(player.clone()));
        let (engine, _handle, out_rx) =
            HostEngine::new(surface, CommandBridge::new(10), Duration::from_secs(1));
        (player, engine, out_rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Vec<Outbound> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[test]
    fn snapshot_request_yields_exactly_one_update() {
        let (_player, mut engine, mut out_rx) = engine();
        let peer = peer();

        engine.handle(HostRequest::Snapshot { reply_to: peer });
        let out = drain(&mut out_rx);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target, Target::Peer(peer));
        let Message::TrackUpdate(state) = &out[0].message else {
            panic!("expected track update");
        };
        assert_eq!(state.title, "Says");
        assert_eq!(state.album, "Spaces");
    }

    #[test]
    fn repeated_snapshots_are_identical() {
        let (_player, mut engine, mut out_rx) = engine();
        let peer = peer();

        engine.handle(HostRequest::Snapshot { reply_to: peer });
        engine.handle(HostRequest::Snapshot { reply_to: peer });
        let out = drain(&mut out_rx);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], out[1]);
    }

    #[test]
    fn next_skips_once_and_broadcasts_new_track() {
        let (player, mut engine, mut out_rx) = engine();
        let peer = peer();
        engine.poll();
        drain(&mut out_rx);

        engine.handle(HostRequest::Execute {
            command: Command::Next,
            reply_to: Some(peer),
        });
        assert_eq!(player.calls().nexts, 1);

        let out = drain(&mut out_rx);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].target, Target::All);
        assert_eq!(out[1].target, Target::Peer(peer));
        assert!(matches!(&out[1].message, Message::TrackUpdate(s) if s.title == "Avril 14th"));
    }

    #[test]
    fn play_pause_does_not_broadcast() {
        let (player, mut engine, mut out_rx) = engine();
        engine.poll();
        drain(&mut out_rx);

        engine.handle(HostRequest::Execute {
            command: Command::PlayPause,
            reply_to: None,
        });
        engine.handle(HostRequest::Execute {
            command: Command::PlayPause,
            reply_to: None,
        });
        assert_eq!(player.calls().toggles, 2);
        assert!(drain(&mut out_rx).is_empty());
    }

    #[test]
    fn spawned_worker_stops_on_shutdown() {
        let player = Arc::new(DemoPlayer::new());
        let surface = Box::new(NativeSurface::new(player.clone()));
        let (engine, handle, mut out_rx) =
            HostEngine::new(surface, CommandBridge::new(10), Duration::from_millis(50));
        let worker = engine.spawn().unwrap();

        handle.execute(Command::Next, None);
        handle.execute(Command::Previous, None);
        handle.shutdown();
        let stats = worker.join().unwrap();

        assert_eq!(stats.handled, 2);
        assert_eq!(player.calls().nexts, 1);
        assert_eq!(player.calls().previouses, 1);
        assert!(matches!(
            out_rx.try_recv().map(|o| o.target),
            Ok(Target::All)
        ));
    }
}
