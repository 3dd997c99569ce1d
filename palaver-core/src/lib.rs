pub mod model;
pub mod utils;

pub use model::{
    ChatFrame, ChatMessage, Envelope, IceCandidateInit, IceServerConfig, Identity, MessageLog,
    ParticipantId, RoomId, SdpKind, SessionDescription, SignalAction, SignalFrame, SignalPayload,
};
