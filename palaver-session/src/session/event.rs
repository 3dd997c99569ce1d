use crate::backend::{MediaTrack, PeerEvent, TrackKind};
use crate::call::CallState;
use crate::error::MediaError;
use palaver_core::ChatMessage;
use std::sync::Arc;

/// What the room view observes. The UI renders off these events; it never
/// reaches into the session state directly.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    ChatAppended(ChatMessage),
    CallState(CallState),
    /// A remote media track arrived and joined the remote track set.
    RemoteTrack(TrackKind),
    /// A call attempt was aborted before it got off the ground.
    CallFailed(CallFailure),
    /// The signaling channel is gone; the session loop has stopped.
    ChannelClosed,
}

#[derive(Debug, Clone)]
pub enum CallFailure {
    Media(String),
    Peer(String),
}

/// Internal completions funneled into the session loop. Each one is stamped
/// with the call attempt it belongs to; completions of a superseded attempt
/// (the call was ended while they were in flight) are discarded.
pub(crate) struct EngineEvent {
    pub attempt: u64,
    pub kind: EngineEventKind,
}

pub(crate) enum EngineEventKind {
    Peer(PeerEvent),
    MediaReady(Vec<Arc<dyn MediaTrack>>),
    MediaFailed(MediaError),
}
