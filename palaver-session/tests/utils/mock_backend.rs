use async_trait::async_trait;
use palaver_core::{IceCandidateInit, IceServerConfig, SessionDescription};
use palaver_session::{
    CallBackend, MediaError, MediaTrack, PeerError, PeerEvent, PeerHandle, TrackKind,
};
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub struct MockTrack {
    kind: TrackKind,
    enabled: AtomicBool,
    stopped: AtomicBool,
}

impl MockTrack {
    pub fn new(kind: TrackKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
        })
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl MediaTrack for MockTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst) && !self.is_stopped()
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Mock peer connection that records everything applied to it. Emits one
/// remote audio track as soon as the remote description is set, standing in
/// for the real connection delivering the peer's media.
pub struct MockPeer {
    events: mpsc::Sender<PeerEvent>,
    fail_candidate_containing: Option<String>,
    remote_descriptions: Mutex<Vec<SessionDescription>>,
    applied_candidates: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl MockPeer {
    pub fn remote_descriptions(&self) -> Vec<SessionDescription> {
        self.remote_descriptions.lock().unwrap().clone()
    }

    pub fn applied_candidates(&self) -> Vec<String> {
        self.applied_candidates.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PeerHandle for MockPeer {
    async fn create_offer(&self) -> Result<SessionDescription, PeerError> {
        Ok(SessionDescription::offer("v=0 mock-offer"))
    }

    async fn create_answer(&self) -> Result<SessionDescription, PeerError> {
        Ok(SessionDescription::answer("v=0 mock-answer"))
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), PeerError> {
        let first = {
            let mut descriptions = self.remote_descriptions.lock().unwrap();
            descriptions.push(desc);
            descriptions.len() == 1
        };
        if first {
            let track = MockTrack::new(TrackKind::Audio);
            let _ = self.events.send(PeerEvent::TrackReceived(track)).await;
        }
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidateInit) -> Result<(), PeerError> {
        if let Some(needle) = &self.fail_candidate_containing {
            if candidate.candidate.contains(needle.as_str()) {
                return Err(PeerError::Backend(format!(
                    "scripted failure for {}",
                    candidate.candidate
                )));
            }
        }
        self.applied_candidates
            .lock()
            .unwrap()
            .push(candidate.candidate);
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Scriptable [`CallBackend`]: captures fake tracks immediately (or after a
/// delay, or not at all) and hands out [`MockPeer`] connections.
#[derive(Default)]
pub struct MockCallBackend {
    fail_media: bool,
    media_delay: Option<Duration>,
    fail_candidate_containing: Option<String>,
    acquired_tracks: Mutex<Vec<Arc<MockTrack>>>,
    peers: Mutex<Vec<Arc<MockPeer>>>,
}

impl MockCallBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_media() -> Arc<Self> {
        Arc::new(Self {
            fail_media: true,
            ..Self::default()
        })
    }

    pub fn with_media_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            media_delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn with_candidate_failure(needle: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            fail_candidate_containing: Some(needle.into()),
            ..Self::default()
        })
    }

    pub fn peer_count(&self) -> usize {
        self.peers.lock().unwrap().len()
    }

    pub fn last_peer(&self) -> Option<Arc<MockPeer>> {
        self.peers.lock().unwrap().last().cloned()
    }

    pub fn acquired_tracks(&self) -> Vec<Arc<MockTrack>> {
        self.acquired_tracks.lock().unwrap().clone()
    }

    pub fn audio_track(&self) -> Option<Arc<MockTrack>> {
        self.acquired_tracks
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.kind() == TrackKind::Audio)
            .cloned()
    }
}

#[async_trait]
impl CallBackend for MockCallBackend {
    async fn acquire_local_media(
        &self,
        want_video: bool,
    ) -> Result<Vec<Arc<dyn MediaTrack>>, MediaError> {
        if let Some(delay) = self.media_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_media {
            return Err(MediaError::PermissionDenied);
        }

        let mut tracks = vec![MockTrack::new(TrackKind::Audio)];
        if want_video {
            tracks.push(MockTrack::new(TrackKind::Video));
        }
        self.acquired_tracks.lock().unwrap().extend(tracks.clone());
        Ok(tracks.into_iter().map(|t| t as Arc<dyn MediaTrack>).collect())
    }

    async fn create_peer(
        &self,
        _ice_servers: Vec<IceServerConfig>,
        _local_tracks: &[Arc<dyn MediaTrack>],
        events: mpsc::Sender<PeerEvent>,
    ) -> Result<Arc<dyn PeerHandle>, PeerError> {
        let peer = Arc::new(MockPeer {
            events,
            fail_candidate_containing: self.fail_candidate_containing.clone(),
            remote_descriptions: Mutex::new(Vec::new()),
            applied_candidates: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        });
        self.peers.lock().unwrap().push(peer.clone());
        Ok(peer)
    }
}
