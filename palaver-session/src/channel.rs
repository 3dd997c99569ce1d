use crate::error::ChannelError;
use futures::{SinkExt, StreamExt};
use palaver_core::{Envelope, RoomId};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// What the room channel delivers to its consumer. After `Closed` no further
/// frames arrive; reconnecting is the room view's decision, not ours.
#[derive(Debug)]
pub enum ChannelEvent {
    Frame(String),
    Closed,
}

/// Write half of the room channel. Cheap to clone; both the chat sender and
/// the peer-connection manager hold one.
#[derive(Clone)]
pub struct ChannelSender {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSender {
    /// Create a sender together with the stream of raw frames it produces.
    /// `connect` feeds the receiver into the websocket writer task; tests
    /// and in-process embeddings can read it directly.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, envelope: &Envelope) {
        match serde_json::to_string(envelope) {
            Ok(json) => {
                if self.tx.send(json).is_err() {
                    warn!("Channel writer gone; dropping outbound frame");
                }
            }
            Err(e) => error!("Failed to serialize envelope: {}", e),
        }
    }
}

/// One persistent bidirectional channel per room visit.
pub struct SignalingChannel;

impl SignalingChannel {
    /// Open the room's websocket. `base_url` is the relay origin, e.g.
    /// `ws://localhost:8000`. Connecting is the only suspension point;
    /// everything after is event-driven through the returned receiver.
    pub async fn connect(
        base_url: &str,
        room: RoomId,
    ) -> Result<(ChannelSender, mpsc::Receiver<ChannelEvent>), ChannelError> {
        let url = format!("{}/ws/chat/{}", base_url.trim_end_matches('/'), room);
        let (socket, _response) =
            connect_async(&url)
                .await
                .map_err(|source| ChannelError::Connect {
                    url: url.clone(),
                    source,
                })?;
        info!("Signaling channel connected: {}", url);

        let (mut sink, mut stream) = socket.split();
        let (sender, mut out_rx) = ChannelSender::pair();
        let (event_tx, event_rx) = mpsc::channel(256);

        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                if sink.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if event_tx
                            .send(ChannelEvent::Frame(text.to_string()))
                            .await
                            .is_err()
                        {
                            // Consumer gone; nobody left to tell.
                            return;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Signaling channel error: {}", e);
                        break;
                    }
                }
            }
            debug!("Signaling channel reader finished");
            let _ = event_tx.send(ChannelEvent::Closed).await;
        });

        Ok((sender, event_rx))
    }
}
