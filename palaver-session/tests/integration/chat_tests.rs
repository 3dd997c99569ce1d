use crate::integration::init_tracing;
use crate::utils::{MockCallBackend, chat_from, spawn_session, spawn_session_with_history};
use palaver_core::{ChatMessage, Identity};
use palaver_session::SessionEvent;
use serde_json::Value;

#[tokio::test]
async fn inbound_chat_is_appended_once() {
    init_tracing();

    let mut session = spawn_session("alice", MockCallBackend::new());
    let bob = Identity::new("bob");

    session.deliver_envelope(&chat_from(&bob, "hi there")).await;

    let event = session
        .wait_for_event(|e| matches!(e, SessionEvent::ChatAppended(_)))
        .await;
    let SessionEvent::ChatAppended(message) = event else {
        unreachable!()
    };
    assert_eq!(message.username, "bob");
    assert_eq!(message.message, "hi there");

    let snapshot = session.snapshot().await;
    assert_eq!(
        snapshot.messages,
        vec![ChatMessage {
            username: "bob".to_owned(),
            message: "hi there".to_owned(),
        }]
    );
}

#[tokio::test]
async fn outbound_chat_carries_no_action_field() {
    init_tracing();

    let mut session = spawn_session("alice", MockCallBackend::new());
    session.handle.send_chat("hello room").await.unwrap();

    let frame = session.next_outbound().await;
    let value: Value = serde_json::from_str(&frame).unwrap();

    assert!(value.get("action").is_none());
    assert_eq!(value["username"], "alice");
    assert_eq!(value["message"], "hello room");
}

#[tokio::test]
async fn own_chat_echo_is_appended() {
    init_tracing();

    let mut session = spawn_session("alice", MockCallBackend::new());
    session.handle.send_chat("talking to myself").await.unwrap();

    // The relay sends every frame back to its sender; the echo is the
    // moment the message enters the log.
    let frame = session.next_outbound().await;
    session.deliver(frame).await;

    let event = session
        .wait_for_event(|e| matches!(e, SessionEvent::ChatAppended(_)))
        .await;
    let SessionEvent::ChatAppended(message) = event else {
        unreachable!()
    };
    assert_eq!(message.username, "alice");
    assert_eq!(message.message, "talking to myself");
    assert_eq!(session.snapshot().await.messages.len(), 1);
}

#[tokio::test]
async fn history_seeds_the_log() {
    init_tracing();

    let history = vec![
        ChatMessage {
            username: "bob".to_owned(),
            message: "earlier".to_owned(),
        },
        ChatMessage {
            username: "alice".to_owned(),
            message: "much earlier".to_owned(),
        },
    ];
    let session = spawn_session_with_history("alice", MockCallBackend::new(), history.clone());

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.messages, history);
}
