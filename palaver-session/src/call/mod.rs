mod candidates;
mod state;

pub use candidates::PendingCandidateQueue;
pub use state::{CallRole, CallState};

use crate::backend::{MediaTrack, PeerHandle, TrackKind};
use palaver_core::SessionDescription;
use std::sync::Arc;

/// One 1:1 negotiation attempt. Exclusive owner of the peer handle, both
/// track sets, and the pending candidate queue; only the session event loop
/// mutates it.
pub(crate) struct CallSession {
    pub state: CallState,
    pub role: Option<CallRole>,
    pub peer: Option<Arc<dyn PeerHandle>>,
    pub local_tracks: Vec<Arc<dyn MediaTrack>>,
    pub remote_tracks: Vec<Arc<dyn MediaTrack>>,
    pub pending_candidates: PendingCandidateQueue,
    /// Offer received while the local media capture is still in flight.
    pub pending_remote_offer: Option<SessionDescription>,
    pub remote_description_set: bool,
    /// The "have local offer" sub-state: set after our offer goes out,
    /// cleared once the matching answer is applied.
    pub awaiting_answer: bool,
    pub muted: bool,
    pub video_enabled: bool,
}

impl CallSession {
    pub fn new() -> Self {
        Self {
            state: CallState::Idle,
            role: None,
            peer: None,
            local_tracks: Vec::new(),
            remote_tracks: Vec::new(),
            pending_candidates: PendingCandidateQueue::new(),
            pending_remote_offer: None,
            remote_description_set: false,
            awaiting_answer: false,
            muted: false,
            video_enabled: true,
        }
    }

    /// Flip the local audio tracks. Purely local: the remote peer only
    /// observes the resulting silence on the already-flowing track.
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.set_local_tracks_enabled(TrackKind::Audio, !self.muted);
        self.muted
    }

    /// Flip the local video tracks, same rules as [`toggle_mute`].
    ///
    /// [`toggle_mute`]: CallSession::toggle_mute
    pub fn toggle_video(&mut self) -> bool {
        self.video_enabled = !self.video_enabled;
        self.set_local_tracks_enabled(TrackKind::Video, self.video_enabled);
        self.video_enabled
    }

    fn set_local_tracks_enabled(&self, kind: TrackKind, enabled: bool) {
        for track in self.local_tracks.iter().filter(|t| t.kind() == kind) {
            track.set_enabled(enabled);
        }
    }
}
