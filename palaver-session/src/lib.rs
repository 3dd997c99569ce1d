pub mod backend;
pub mod call;
pub mod channel;
pub mod config;
pub mod error;
pub mod mux;
pub mod rest;
pub mod session;

pub use backend::{CallBackend, MediaTrack, PeerEvent, PeerHandle, RtcBackend, TrackKind};
pub use call::{CallRole, CallState};
pub use channel::{ChannelEvent, ChannelSender, SignalingChannel};
pub use config::SessionConfig;
pub use error::{ApiError, ChannelError, MediaError, PeerError, SessionError};
pub use rest::ApiClient;
pub use session::{
    CallFailure, RoomSession, SessionCommand, SessionEvent, SessionHandle, SessionSnapshot,
};
