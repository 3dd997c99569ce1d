mod chat;
mod envelope;
mod participant;
mod room;

pub use chat::{ChatMessage, MessageLog};
pub use envelope::{
    ChatFrame, Envelope, IceCandidateInit, IceServerConfig, SdpKind, SessionDescription,
    SignalAction, SignalFrame, SignalPayload,
};
pub use participant::{Identity, ParticipantId};
pub use room::RoomId;
