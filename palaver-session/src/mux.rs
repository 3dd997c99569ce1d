//! Inbound frame classification: one channel and one envelope schema carry
//! both chat and call signaling, so every received frame is routed here
//! before it touches the message log or the state machine.

use palaver_core::{ChatMessage, Envelope, Identity, SignalAction, SignalPayload};
use tracing::{debug, warn};

pub enum Inbound {
    Chat(ChatMessage),
    Signal {
        action: SignalAction,
        payload: SignalPayload,
    },
    Dropped(DropReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Our own signaling broadcast echoed back by the relay.
    SelfEcho,
    Malformed,
}

/// Classify one raw frame. Chat is passed through regardless of author (the
/// relay echo is how the sender sees its own message); signaling authored by
/// the local participant is dropped so we never react to our own broadcast.
pub fn classify(frame: &str, local: &Identity) -> Inbound {
    let envelope: Envelope = match serde_json::from_str(frame) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("Dropping malformed frame: {}", e);
            return Inbound::Dropped(DropReason::Malformed);
        }
    };

    match envelope {
        Envelope::Chat(chat) => Inbound::Chat(ChatMessage::new(chat.username, chat.message)),
        Envelope::Signal(signal) => {
            // The participant id is authoritative; username comparison is a
            // fallback for peers that do not send one (display names are not
            // unique).
            let own = match signal.sender {
                Some(sender) => sender == local.participant,
                None => signal.username == local.username,
            };
            if own {
                debug!("Ignoring self-originated {:?} echo", signal.action);
                return Inbound::Dropped(DropReason::SelfEcho);
            }
            Inbound::Signal {
                action: signal.action,
                payload: signal.data,
            }
        }
    }
}
