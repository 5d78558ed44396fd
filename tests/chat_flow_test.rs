//! End-to-end chat flow tests over real WebSockets

use std::net::SocketAddr;
use std::time::Duration;

use chatrelay::api::{AppState, ChatApi};
use chatrelay::config::Config;
use chatrelay::protocol::Envelope;
use chatrelay::session::SessionRegistry;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Bind on an ephemeral port and serve the full router in the background.
async fn spawn_server(config: Config) -> (SocketAddr, AppState) {
    let state = AppState::new(config);
    let app = ChatApi::create_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

async fn connect(addr: SocketAddr, token: &str) -> WsClient {
    let (client, _) = connect_async(format!("ws://{}/ws/{}", addr, token))
        .await
        .expect("WebSocket connect failed");
    client
}

/// Admission is finished by the upgrade task, not the connect call, so
/// tests wait for the registry to settle before sending.
async fn wait_for_sessions(registry: &SessionRegistry, expected: usize) {
    timeout(Duration::from_secs(2), async {
        while registry.active_sessions() != expected {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session count never settled");
}

async fn next_envelope(client: &mut WsClient) -> Envelope {
    let message = timeout(Duration::from_secs(2), client.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("stream ended")
        .expect("transport error");
    match message {
        Message::Text(text) => Envelope::decode(&text).unwrap(),
        other => panic!("expected a text frame, got {:?}", other),
    }
}

async fn assert_silent(client: &mut WsClient) {
    let result = timeout(Duration::from_millis(300), client.next()).await;
    assert!(result.is_err(), "expected no frame, got {:?}", result);
}

#[tokio::test]
async fn message_reaches_the_other_session_but_never_echoes() {
    let (addr, state) = spawn_server(Config::default()).await;
    let alice = state.auth.register("alice", "pw").unwrap();
    let bob = state.auth.register("bob", "pw").unwrap();

    let mut ws_alice = connect(addr, &alice.token).await;
    let mut ws_bob = connect(addr, &bob.token).await;
    wait_for_sessions(&state.registry, 2).await;

    let envelope = Envelope::message("hi", "alice");
    ws_alice
        .send(Message::Text(envelope.encode().unwrap()))
        .await
        .unwrap();

    let received = next_envelope(&mut ws_bob).await;
    assert_eq!(received, envelope);

    // The sender gets no echo of its own message.
    assert_silent(&mut ws_alice).await;
}

#[tokio::test]
async fn unknown_op_is_ignored_without_disconnecting_anyone() {
    let (addr, state) = spawn_server(Config::default()).await;
    let alice = state.auth.register("alice", "pw").unwrap();
    let bob = state.auth.register("bob", "pw").unwrap();

    let mut ws_alice = connect(addr, &alice.token).await;
    let mut ws_bob = connect(addr, &bob.token).await;
    wait_for_sessions(&state.registry, 2).await;

    ws_alice
        .send(Message::Text(r#"{"op":99,"data":{}}"#.to_string()))
        .await
        .unwrap();

    assert_silent(&mut ws_bob).await;
    assert_eq!(state.registry.active_sessions(), 2);
}

#[tokio::test]
async fn malformed_frame_does_not_kill_the_session() {
    let (addr, state) = spawn_server(Config::default()).await;
    let alice = state.auth.register("alice", "pw").unwrap();
    let bob = state.auth.register("bob", "pw").unwrap();

    let mut ws_alice = connect(addr, &alice.token).await;
    let mut ws_bob = connect(addr, &bob.token).await;
    wait_for_sessions(&state.registry, 2).await;

    ws_alice
        .send(Message::Text("definitely not json".to_string()))
        .await
        .unwrap();

    // The same session can still chat afterwards.
    let envelope = Envelope::message("still here", "alice");
    ws_alice
        .send(Message::Text(envelope.encode().unwrap()))
        .await
        .unwrap();

    assert_eq!(next_envelope(&mut ws_bob).await, envelope);
    assert_eq!(state.registry.active_sessions(), 2);
}

#[tokio::test]
async fn disconnected_peer_is_evicted_and_the_rest_still_receive() {
    let (addr, state) = spawn_server(Config::default()).await;
    let alice = state.auth.register("alice", "pw").unwrap();
    let bob = state.auth.register("bob", "pw").unwrap();
    let carol = state.auth.register("carol", "pw").unwrap();

    let mut ws_alice = connect(addr, &alice.token).await;
    let mut ws_bob = connect(addr, &bob.token).await;
    let mut ws_carol = connect(addr, &carol.token).await;
    wait_for_sessions(&state.registry, 3).await;

    ws_bob.close(None).await.unwrap();
    wait_for_sessions(&state.registry, 2).await;

    let envelope = Envelope::message("anyone there?", "alice");
    ws_alice
        .send(Message::Text(envelope.encode().unwrap()))
        .await
        .unwrap();

    assert_eq!(next_envelope(&mut ws_carol).await, envelope);
    assert_eq!(state.registry.active_sessions(), 2);
    assert_silent(&mut ws_alice).await;
}

#[tokio::test]
async fn unknown_token_is_rejected_before_registration() {
    let (addr, state) = spawn_server(Config::default()).await;

    let result = connect_async(format!("ws://{}/ws/{}", addr, "bogus-token")).await;
    assert!(result.is_err());
    assert_eq!(state.registry.active_sessions(), 0);
}

#[tokio::test]
async fn session_limit_closes_the_door() {
    let mut config = Config::default();
    config.server.max_sessions = 1;
    let (addr, state) = spawn_server(config).await;
    let alice = state.auth.register("alice", "pw").unwrap();
    let bob = state.auth.register("bob", "pw").unwrap();

    let _ws_alice = connect(addr, &alice.token).await;
    wait_for_sessions(&state.registry, 1).await;

    let result = connect_async(format!("ws://{}/ws/{}", addr, bob.token)).await;
    assert!(result.is_err());
    assert_eq!(state.registry.active_sessions(), 1);
}

#[tokio::test]
async fn messages_from_one_sender_arrive_in_order() {
    let (addr, state) = spawn_server(Config::default()).await;
    let alice = state.auth.register("alice", "pw").unwrap();
    let bob = state.auth.register("bob", "pw").unwrap();

    let mut ws_alice = connect(addr, &alice.token).await;
    let mut ws_bob = connect(addr, &bob.token).await;
    wait_for_sessions(&state.registry, 2).await;

    for i in 0..10 {
        let envelope = Envelope::message(&format!("msg {i}"), "alice");
        ws_alice
            .send(Message::Text(envelope.encode().unwrap()))
            .await
            .unwrap();
    }

    for i in 0..10 {
        let chat = next_envelope(&mut ws_bob).await.chat_payload().unwrap();
        assert_eq!(chat.message, format!("msg {i}"));
    }
}
