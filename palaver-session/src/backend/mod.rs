//! Seams around the native peer-connection and media-capture primitives.
//! The session event loop only ever talks to these traits; the callback
//! storm of the native layer is translated into [`PeerEvent`] messages so
//! the single-writer rule of the session holds.

mod rtc;

pub use rtc::{RtcBackend, RtcLocalTrack};

use crate::error::{MediaError, PeerError};
use async_trait::async_trait;
use palaver_core::{IceCandidateInit, IceServerConfig, SessionDescription};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Handle to one media track. Local tracks are what the mute/video toggles
/// act on; remote tracks accumulate as the peer connection delivers them.
pub trait MediaTrack: Send + Sync {
    fn kind(&self) -> TrackKind;
    fn is_enabled(&self) -> bool;
    fn set_enabled(&self, enabled: bool);
    /// Stop the track for good. Safe to call more than once.
    fn stop(&self);
    /// Escape hatch for backends to recover their concrete track type when
    /// attaching local tracks to a connection.
    fn as_any(&self) -> &dyn Any;
}

/// Event emitted by the native peer connection.
pub enum PeerEvent {
    /// A local candidate was generated and should go out as `ice-candidate`.
    CandidateGenerated(IceCandidateInit),
    /// The remote peer added a track to the connection.
    TrackReceived(Arc<dyn MediaTrack>),
    /// The connection failed, disconnected, or was closed underneath us.
    ConnectionClosed,
}

impl fmt::Debug for PeerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerEvent::CandidateGenerated(c) => {
                f.debug_tuple("CandidateGenerated").field(c).finish()
            }
            PeerEvent::TrackReceived(t) => f.debug_tuple("TrackReceived").field(&t.kind()).finish(),
            PeerEvent::ConnectionClosed => f.write_str("ConnectionClosed"),
        }
    }
}

/// One live native peer connection.
#[async_trait]
pub trait PeerHandle: Send + Sync {
    /// Generate the local offer and apply it as the local description.
    async fn create_offer(&self) -> Result<SessionDescription, PeerError>;

    /// Generate the local answer and apply it as the local description.
    /// Only valid once the remote offer has been set.
    async fn create_answer(&self) -> Result<SessionDescription, PeerError>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), PeerError>;

    async fn add_ice_candidate(&self, candidate: IceCandidateInit) -> Result<(), PeerError>;

    /// Close the native connection. Safe to call multiple times.
    async fn close(&self);
}

/// Factory seam for media capture and peer-connection creation. Production
/// uses [`RtcBackend`]; tests script it.
#[async_trait]
pub trait CallBackend: Send + Sync {
    /// Capture the local track set: audio, plus video when requested.
    async fn acquire_local_media(
        &self,
        want_video: bool,
    ) -> Result<Vec<Arc<dyn MediaTrack>>, MediaError>;

    /// Create the native peer connection with the local tracks attached and
    /// its callbacks wired into `events`.
    async fn create_peer(
        &self,
        ice_servers: Vec<IceServerConfig>,
        local_tracks: &[Arc<dyn MediaTrack>],
        events: mpsc::Sender<PeerEvent>,
    ) -> Result<Arc<dyn PeerHandle>, PeerError>;
}
