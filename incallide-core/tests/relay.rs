use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use incallide_core::{
    bridge::CommandBridge,
    client::{ClientEvent, spawn_listener},
    engine::{HostEngine, HostEngineHandle},
    protocol::Message,
    reconnect::ReconnectPolicy,
    relay::{RelayHub, RelayServer, pump_outbound},
    surface::{NativeSurface, demo::DemoPlayer},
};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message as WsMessage};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Relay {
    url: String,
    player: Arc<DemoPlayer>,
    handle: HostEngineHandle,
}

async fn start_relay() -> Relay {
    let player = Arc::new(DemoPlayer::new());
    let surface = Box::new(NativeSurface::new(player.clone()));
    let (engine, handle, mut out_rx) =
        HostEngine::new(surface, CommandBridge::new(10), Duration::from_secs(60));
    engine.spawn().unwrap();

    // the first poll broadcasts to nobody; swallow it so peers only see replies
    out_rx.recv().await.unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let hub = RelayHub::new();
    tokio::spawn(pump_outbound(hub.clone(), out_rx));
    tokio::spawn(RelayServer::new(hub, handle.clone()).serve(listener));

    Relay {
        url,
        player,
        handle,
    }
}

async fn send<S: AsyncRead + AsyncWrite + Unpin>(ws: &mut WebSocketStream<S>, text: &str) {
    ws.send(WsMessage::Text(text.to_string())).await.unwrap();
}

async fn next_json<S: AsyncRead + AsyncWrite + Unpin>(ws: &mut WebSocketStream<S>) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("no frame from relay")
            .unwrap()
            .unwrap();
        if let WsMessage::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn assert_silent(ws: &mut Ws) {
    let extra = tokio::time::timeout(Duration::from_millis(300), ws.next()).await;
    assert!(extra.is_err(), "unexpected frame: {:?}", extra);
}

#[tokio::test]
async fn request_info_answers_with_one_full_update() {
    let relay = start_relay().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(relay.url.as_str()).await.unwrap();

    send(&mut ws, r#"{"type":"request_info"}"#).await;
    let reply = next_json(&mut ws).await;

    assert_eq!(reply["type"], "track_update");
    let data = &reply["data"];
    for field in [
        "title",
        "artist",
        "album",
        "duration",
        "position",
        "isPlaying",
        "volume",
        "artworkUrl",
    ] {
        assert!(data.get(field).is_some(), "missing {}", field);
    }
    assert_eq!(data["title"], "Says");
    assert_eq!(data["isPlaying"], false);
    assert_eq!(data["volume"], 70);

    assert_silent(&mut ws).await;
    relay.handle.shutdown();
}

#[tokio::test]
async fn next_command_skips_exactly_once() {
    let relay = start_relay().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(relay.url.as_str()).await.unwrap();

    send(&mut ws, r#"{"type":"command","data":"next"}"#).await;

    // broadcast of the new track, then the reply snapshot
    let first = next_json(&mut ws).await;
    let second = next_json(&mut ws).await;
    assert_eq!(first["data"]["title"], "Avril 14th");
    assert_eq!(first, second);
    assert_eq!(relay.player.calls().nexts, 1);

    relay.handle.shutdown();
}

#[tokio::test]
async fn volume_delta_is_clamped() {
    let relay = start_relay().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(relay.url.as_str()).await.unwrap();

    send(&mut ws, r#"{"type":"command","data":{"volume_delta":500}}"#).await;
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["data"]["volume"], 100);

    send(&mut ws, r#"{"type":"command","data":"volume_down"}"#).await;
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["data"]["volume"], 90);

    relay.handle.shutdown();
}

#[tokio::test]
async fn ping_gets_pong_and_garbage_is_ignored() {
    let relay = start_relay().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(relay.url.as_str()).await.unwrap();

    send(&mut ws, "not json").await;
    send(&mut ws, r#"{"type":"launch_rockets","data":{}}"#).await;
    send(&mut ws, r#"{"type":"ping","data":{}}"#).await;

    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "pong");
    assert_silent(&mut ws).await;

    relay.handle.shutdown();
}

#[tokio::test]
async fn external_track_update_reaches_other_peers_only() {
    let relay = start_relay().await;
    let (mut publisher, _) = tokio_tungstenite::connect_async(relay.url.as_str()).await.unwrap();
    let (mut watcher, _) = tokio_tungstenite::connect_async(relay.url.as_str()).await.unwrap();

    // make sure both peers are registered before publishing
    send(&mut watcher, r#"{"type":"ping"}"#).await;
    assert_eq!(next_json(&mut watcher).await["type"], "pong");

    let update = Message::TrackUpdate(incallide_core::TrackState {
        title: "Windowlicker".into(),
        ..Default::default()
    });
    send(&mut publisher, &update.to_json().unwrap()).await;

    let seen = next_json(&mut watcher).await;
    assert_eq!(seen["type"], "track_update");
    assert_eq!(seen["data"]["title"], "Windowlicker");
    assert_silent(&mut publisher).await;

    relay.handle.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn listener_connects_and_fetches_snapshot() {
    let relay = start_relay().await;
    let client = spawn_listener(
        relay.url.clone(),
        ReconnectPolicy::fixed(Duration::from_millis(100)),
    )
    .unwrap();

    let events = client.events().clone();
    let (connected, track) = tokio::task::spawn_blocking(move || {
        let timeout = Duration::from_secs(5);
        (events.recv_timeout(timeout), events.recv_timeout(timeout))
    })
    .await
    .unwrap();

    assert_eq!(connected.unwrap(), ClientEvent::Connected);
    match track.unwrap() {
        ClientEvent::Track(state) => assert_eq!(state.title, "Says"),
        other => panic!("expected a track, got {:?}", other),
    }

    tokio::task::spawn_blocking(move || client.shutdown())
        .await
        .unwrap();
    relay.handle.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn listener_keeps_retrying_until_relay_appears() {
    // reserve a port, then free it so the first attempts are refused
    let port = {
        let reserved = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        reserved.local_addr().unwrap().port()
    };
    let client = spawn_listener(
        format!("ws://127.0.0.1:{}", port),
        ReconnectPolicy::fixed(Duration::from_millis(100)),
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(client.try_recv().is_err());

    let player = Arc::new(DemoPlayer::new());
    let (engine, handle, out_rx) = HostEngine::new(
        Box::new(NativeSurface::new(player)),
        CommandBridge::new(10),
        Duration::from_secs(60),
    );
    engine.spawn().unwrap();
    let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
    let hub = RelayHub::new();
    tokio::spawn(pump_outbound(hub.clone(), out_rx));
    tokio::spawn(RelayServer::new(hub, handle.clone()).serve(listener));

    let events = client.events().clone();
    let connected = tokio::task::spawn_blocking(move || events.recv_timeout(Duration::from_secs(5)))
        .await
        .unwrap();
    assert_eq!(connected.unwrap(), ClientEvent::Connected);

    tokio::task::spawn_blocking(move || client.shutdown())
        .await
        .unwrap();
    handle.shutdown();
}

async fn next_event(client: &incallide_core::client::ClientHandle) -> ClientEvent {
    let events = client.events().clone();
    tokio::task::spawn_blocking(move || events.recv_timeout(Duration::from_secs(5)))
        .await
        .unwrap()
        .expect("no event from listener")
}

fn track_title(event: ClientEvent) -> String {
    match event {
        ClientEvent::Track(state) => state.title,
        other => panic!("expected a track, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn listener_reconnects_after_relay_closes_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let delay = Duration::from_millis(200);
    let client = spawn_listener(
        format!("ws://{}", listener.local_addr().unwrap()),
        ReconnectPolicy::fixed(delay),
    )
    .unwrap();

    // first session: answer the snapshot request, then hang up
    let (stream, _) = listener.accept().await.unwrap();
    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
    assert_eq!(next_json(&mut ws).await["type"], "request_info");
    send(&mut ws, r#"{"type":"track_update","data":{"title":"Says","artist":"Nils Frahm"}}"#).await;

    assert_eq!(next_event(&client).await, ClientEvent::Connected);
    assert_eq!(track_title(next_event(&client).await), "Says");

    let closed_at = Instant::now();
    ws.close(None).await.unwrap();
    drop(ws);
    assert_eq!(next_event(&client).await, ClientEvent::Disconnected);

    // second session comes back after one delay and asks again
    let (stream, _) = listener.accept().await.unwrap();
    assert!(closed_at.elapsed() >= delay, "reconnected before the delay");
    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
    assert_eq!(next_json(&mut ws).await["type"], "request_info");
    send(
        &mut ws,
        r#"{"type":"track_update","data":{"title":"Avril 14th","artist":"Aphex Twin"}}"#,
    )
    .await;

    assert_eq!(next_event(&client).await, ClientEvent::Connected);
    assert_eq!(track_title(next_event(&client).await), "Avril 14th");

    tokio::task::spawn_blocking(move || client.shutdown())
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn relay_binds_once_the_port_frees_up() {
    let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = blocker.local_addr().unwrap();

    let player = Arc::new(DemoPlayer::new());
    let (engine, handle, out_rx) = HostEngine::new(
        Box::new(NativeSurface::new(player)),
        CommandBridge::new(10),
        Duration::from_secs(60),
    );
    engine.spawn().unwrap();
    let hub = RelayHub::new();
    tokio::spawn(pump_outbound(hub.clone(), out_rx));
    tokio::spawn(
        RelayServer::new(hub, handle.clone())
            .run(addr.to_string(), ReconnectPolicy::fixed(Duration::from_millis(100))),
    );

    // a few bind attempts fail while the port is taken
    tokio::time::sleep(Duration::from_millis(250)).await;
    drop(blocker);

    let url = format!("ws://{}", addr);
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut ws = loop {
        match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok((ws, _)) => break ws,
            Err(err) => {
                assert!(Instant::now() < deadline, "relay never bound: {}", err);
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    };

    send(&mut ws, r#"{"type":"request_info"}"#).await;
    assert_eq!(next_json(&mut ws).await["type"], "track_update");
    handle.shutdown();
}
