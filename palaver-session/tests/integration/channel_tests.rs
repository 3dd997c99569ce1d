use crate::integration::init_tracing;
use crate::utils::{EVENT_TIMEOUT, MockCallBackend};
use palaver_core::{Envelope, Identity, RoomId};
use palaver_relay::{RelayState, router};
use palaver_session::{
    CallBackend, ChannelEvent, RoomSession, SessionConfig, SessionEvent, SignalingChannel,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

async fn spawn_relay() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(RelayState::new())).await.unwrap();
    });
    format!("ws://{addr}")
}

async fn next_frame(rx: &mut tokio::sync::mpsc::Receiver<ChannelEvent>) -> String {
    match timeout(EVENT_TIMEOUT, rx.recv()).await {
        Ok(Some(ChannelEvent::Frame(text))) => text,
        other => panic!("expected a frame, got {other:?}"),
    }
}

#[tokio::test]
async fn relay_delivers_to_everyone_including_the_sender() {
    init_tracing();

    let base = spawn_relay().await;
    let room = RoomId::new();

    let (sender_a, mut recv_a) = SignalingChannel::connect(&base, room).await.unwrap();
    let (_sender_b, mut recv_b) = SignalingChannel::connect(&base, room).await.unwrap();

    // Both subscriptions are live once the upgrades complete; give the
    // second one a beat to finish.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let alice = Identity::new("alice");
    sender_a.send(&Envelope::chat(&alice, "hello over the wire"));

    let frame_b = next_frame(&mut recv_b).await;
    assert!(frame_b.contains("hello over the wire"));

    let frame_a = next_frame(&mut recv_a).await;
    assert_eq!(frame_a, frame_b);
}

#[tokio::test]
async fn rooms_do_not_leak_into_each_other() {
    init_tracing();

    let base = spawn_relay().await;

    let (sender_a, _recv_a) = SignalingChannel::connect(&base, RoomId::new()).await.unwrap();
    let (_sender_b, mut recv_b) = SignalingChannel::connect(&base, RoomId::new()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;

    let alice = Identity::new("alice");
    sender_a.send(&Envelope::chat(&alice, "wrong room"));

    let leaked = timeout(Duration::from_millis(300), recv_b.recv()).await;
    assert!(leaked.is_err(), "frame crossed rooms: {leaked:?}");
}

#[tokio::test]
async fn dropped_connection_is_surfaced_as_closed() {
    init_tracing();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        drop(ws);
    });

    let (_sender, mut recv) = SignalingChannel::connect(&format!("ws://{addr}"), RoomId::new())
        .await
        .unwrap();

    let event = timeout(EVENT_TIMEOUT, recv.recv())
        .await
        .expect("timed out waiting for channel close")
        .expect("channel stream ended without a Closed event");
    assert!(matches!(event, ChannelEvent::Closed));
}

#[tokio::test]
async fn session_chats_through_a_real_relay() {
    init_tracing();

    let base = spawn_relay().await;
    let room = RoomId::new();

    let (channel, inbound_rx) = SignalingChannel::connect(&base, room).await.unwrap();
    let backend = MockCallBackend::new();
    let (session, mut handle) = RoomSession::new(
        Identity::new("alice"),
        SessionConfig::default(),
        backend as Arc<dyn CallBackend>,
        channel,
        inbound_rx,
        Vec::new(),
    );
    tokio::spawn(session.run());

    handle.send_chat("routed through the relay").await.unwrap();

    let event = timeout(EVENT_TIMEOUT, handle.next_event())
        .await
        .expect("timed out waiting for the chat echo")
        .expect("session stopped");
    let SessionEvent::ChatAppended(message) = event else {
        panic!("expected the chat echo, got {event:?}");
    };
    assert_eq!(message.username, "alice");
    assert_eq!(message.message, "routed through the relay");
}
