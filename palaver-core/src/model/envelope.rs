use crate::model::participant::ParticipantId;
use serde::{Deserialize, Serialize};

/// STUN/TURN server entry handed to the peer-connection manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SignalAction {
    Offer,
    Answer,
    IceCandidate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

/// SDP blob plus its type tag. The coordinator never looks inside `sdp`;
/// only the peer-connection primitive interprets it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// One trickled connectivity candidate, field names as on the browser wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IceCandidateInit {
    pub candidate: String,
    #[serde(rename = "sdpMid", skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex", skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
}

/// Payload of a signaling envelope: a session description for
/// `offer`/`answer`, a candidate for `ice-candidate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SignalPayload {
    Description(SessionDescription),
    Candidate(IceCandidateInit),
}

/// Unknown fields are rejected here so a frame carrying an `action` (or any
/// other signaling field) with a broken payload can never fall back to chat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ChatFrame {
    pub username: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<ParticipantId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalFrame {
    pub action: SignalAction,
    pub data: SignalPayload,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<ParticipantId>,
}

/// Wire unit of the room channel. Exactly one channel and one message shape
/// serves both chat and call signaling: a frame carrying an `action` field
/// is signaling, a frame without one is chat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Envelope {
    Signal(SignalFrame),
    Chat(ChatFrame),
}

impl Envelope {
    pub fn chat(identity: &crate::model::Identity, message: impl Into<String>) -> Self {
        Envelope::Chat(ChatFrame {
            username: identity.username.clone(),
            message: message.into(),
            sender: Some(identity.participant),
        })
    }

    pub fn signal(
        identity: &crate::model::Identity,
        action: SignalAction,
        data: SignalPayload,
    ) -> Self {
        Envelope::Signal(SignalFrame {
            action,
            data,
            username: identity.username.clone(),
            sender: Some(identity.participant),
        })
    }
}
