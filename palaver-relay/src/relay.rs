//! Room-group relay. Every frame a participant sends on a room's channel is
//! fanned out to everyone subscribed to that room, the sender included. The
//! relay never interprets frames beyond checking they parse as an
//! [`Envelope`]; chat and signaling ride the same pipe and clients sort them
//! apart on receipt.

use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::any;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use palaver_core::Envelope;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const GROUP_CAPACITY: usize = 256;

#[derive(Clone, Default)]
pub struct RelayState {
    groups: Arc<DashMap<String, broadcast::Sender<String>>>,
}

impl RelayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a room group, creating the group on first join.
    pub fn join(&self, room_id: &str) -> (broadcast::Sender<String>, broadcast::Receiver<String>) {
        let tx = self
            .groups
            .entry(room_id.to_owned())
            .or_insert_with(|| broadcast::channel(GROUP_CAPACITY).0)
            .clone();
        let rx = tx.subscribe();
        (tx, rx)
    }

    /// Drop a room group once its last subscriber is gone, so the registry
    /// does not accumulate every room id ever visited.
    fn leave(&self, room_id: &str) {
        self.groups
            .remove_if(room_id, |_, tx| tx.receiver_count() == 0);
    }
}

pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/ws/chat/{room_id}", any(ws_handler))
        .with_state(state)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<String>,
    State(state): State<RelayState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, room_id, state))
}

async fn handle_socket(socket: WebSocket, room_id: String, state: RelayState) {
    info!("Participant joined room '{}'", room_id);

    let (mut sender, mut receiver) = socket.split();
    let (group_tx, mut group_rx) = state.join(&room_id);

    let mut send_task = tokio::spawn(async move {
        loop {
            match group_rx.recv().await {
                Ok(frame) => {
                    if sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Relay subscriber lagged, {} frames dropped", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let room_id = room_id.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => {
                        if serde_json::from_str::<Envelope>(&text).is_err() {
                            warn!("Unparseable frame in room '{}'; dropped", room_id);
                            continue;
                        }
                        // Group send includes the sender's own subscription.
                        let _ = group_tx.send(text.to_string());
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };
    // Both tasks must be gone before the subscriber count is trustworthy.
    let _ = tokio::join!(send_task, recv_task);

    state.leave(&room_id);
    debug!("Participant left room '{}'", room_id);
}
