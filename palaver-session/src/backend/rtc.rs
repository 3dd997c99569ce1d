use crate::backend::{CallBackend, MediaTrack, PeerEvent, PeerHandle, TrackKind};
use crate::error::{MediaError, PeerError};
use async_trait::async_trait;
use palaver_core::{IceCandidateInit, IceServerConfig, SdpKind, SessionDescription};
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_remote::TrackRemote;

/// Local track backed by a [`TrackLocalStaticSample`]. The capture pipeline
/// writes samples into [`sample_track`]; it must consult `is_enabled` before
/// writing — a disabled track receives no samples, which is exactly what the
/// remote side observes as mute or a frozen frame.
///
/// [`sample_track`]: RtcLocalTrack::sample_track
pub struct RtcLocalTrack {
    track: Arc<TrackLocalStaticSample>,
    kind: TrackKind,
    enabled: AtomicBool,
    stopped: AtomicBool,
}

impl RtcLocalTrack {
    fn new(track: TrackLocalStaticSample, kind: TrackKind) -> Self {
        Self {
            track: Arc::new(track),
            kind,
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
        }
    }

    /// Sample sink for the capture pipeline.
    pub fn sample_track(&self) -> Arc<TrackLocalStaticSample> {
        Arc::clone(&self.track)
    }
}

impl MediaTrack for RtcLocalTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst) && !self.stopped.load(Ordering::SeqCst)
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

struct RtcRemoteTrack {
    track: Arc<TrackRemote>,
    kind: TrackKind,
    stopped: AtomicBool,
}

impl MediaTrack for RtcRemoteTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn is_enabled(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, _enabled: bool) {
        // Remote tracks are controlled by the remote peer.
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        debug!("Remote {:?} track {} stopped", self.kind, self.track.id());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Peer-connection backend over the `webrtc` crate.
pub struct RtcBackend;

impl RtcBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

#[async_trait]
impl CallBackend for RtcBackend {
    async fn acquire_local_media(
        &self,
        want_video: bool,
    ) -> Result<Vec<Arc<dyn MediaTrack>>, MediaError> {
        let audio = TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                ..Default::default()
            },
            "audio".to_owned(),
            "palaver".to_owned(),
        );

        let mut tracks: Vec<Arc<dyn MediaTrack>> =
            vec![Arc::new(RtcLocalTrack::new(audio, TrackKind::Audio))];

        if want_video {
            let video = TrackLocalStaticSample::new(
                RTCRtpCodecCapability {
                    mime_type: MIME_TYPE_VP8.to_owned(),
                    ..Default::default()
                },
                "video".to_owned(),
                "palaver".to_owned(),
            );
            tracks.push(Arc::new(RtcLocalTrack::new(video, TrackKind::Video)));
        }

        Ok(tracks)
    }

    async fn create_peer(
        &self,
        ice_servers: Vec<IceServerConfig>,
        local_tracks: &[Arc<dyn MediaTrack>],
        events: mpsc::Sender<PeerEvent>,
    ) -> Result<Arc<dyn PeerHandle>, PeerError> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers
                .into_iter()
                .map(|server| RTCIceServer {
                    urls: server.urls,
                    username: server.username.unwrap_or_default(),
                    credential: server.credential.unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let pc = Arc::new(api.new_peer_connection(rtc_config).await?);

        for track in local_tracks {
            let Some(local) = track.as_any().downcast_ref::<RtcLocalTrack>() else {
                return Err(PeerError::Backend(
                    "RtcBackend can only attach RtcLocalTrack tracks".to_owned(),
                ));
            };
            pc.add_track(local.sample_track() as Arc<dyn TrackLocal + Send + Sync>)
                .await?;
        }

        let state_tx = events.clone();
        pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            let tx = state_tx.clone();
            Box::pin(async move {
                info!("Peer connection state changed: {:?}", state);
                match state {
                    RTCPeerConnectionState::Failed
                    | RTCPeerConnectionState::Disconnected
                    | RTCPeerConnectionState::Closed => {
                        let _ = tx.send(PeerEvent::ConnectionClosed).await;
                    }
                    _ => {}
                }
            })
        }));

        let ice_tx = events.clone();
        pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            Box::pin(async move {
                let Some(candidate) = candidate else { return };
                let Ok(init) = candidate.to_json() else {
                    warn!("Failed to serialize generated ICE candidate");
                    return;
                };
                let _ = tx
                    .send(PeerEvent::CandidateGenerated(IceCandidateInit {
                        candidate: init.candidate,
                        sdp_mid: init.sdp_mid,
                        sdp_m_line_index: init.sdp_mline_index,
                    }))
                    .await;
            })
        }));

        let track_tx = events;
        pc.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();
                Box::pin(async move {
                    let kind = match track.kind() {
                        RTPCodecType::Video => TrackKind::Video,
                        _ => TrackKind::Audio,
                    };
                    debug!("Remote {:?} track received: {}", kind, track.id());
                    let remote = Arc::new(RtcRemoteTrack {
                        track,
                        kind,
                        stopped: AtomicBool::new(false),
                    });
                    let _ = tx.send(PeerEvent::TrackReceived(remote)).await;
                })
            },
        ));

        Ok(Arc::new(RtcPeer { pc }))
    }
}

struct RtcPeer {
    pc: Arc<RTCPeerConnection>,
}

#[async_trait]
impl PeerHandle for RtcPeer {
    async fn create_offer(&self) -> Result<SessionDescription, PeerError> {
        let offer = self.pc.create_offer(None).await?;
        self.pc.set_local_description(offer.clone()).await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription, PeerError> {
        let answer = self.pc.create_answer(None).await?;
        self.pc.set_local_description(answer.clone()).await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), PeerError> {
        let desc = match desc.kind {
            SdpKind::Offer => RTCSessionDescription::offer(desc.sdp)?,
            SdpKind::Answer => RTCSessionDescription::answer(desc.sdp)?,
        };
        self.pc.set_remote_description(desc).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidateInit) -> Result<(), PeerError> {
        self.pc
            .add_ice_candidate(RTCIceCandidateInit {
                candidate: candidate.candidate,
                sdp_mid: candidate.sdp_mid,
                sdp_mline_index: candidate.sdp_m_line_index,
                username_fragment: None,
            })
            .await?;
        Ok(())
    }

    async fn close(&self) {
        if let Err(e) = self.pc.close().await {
            debug!("Closing peer connection reported: {}", e);
        }
    }
}
