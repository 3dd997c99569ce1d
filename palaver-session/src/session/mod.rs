mod command;
mod event;

pub use command::SessionCommand;
pub use event::{CallFailure, SessionEvent};

pub(crate) use event::{EngineEvent, EngineEventKind};

use crate::backend::{CallBackend, MediaTrack, PeerEvent};
use crate::call::{CallRole, CallSession, CallState};
use crate::channel::{ChannelEvent, ChannelSender};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::mux::{self, Inbound};
use palaver_core::{
    ChatMessage, Envelope, IceCandidateInit, Identity, MessageLog, SdpKind, SessionDescription,
    SignalAction, SignalPayload,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Point-in-time view of the session for rendering and assertions.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub messages: Vec<ChatMessage>,
    pub call_state: CallState,
    pub muted: bool,
    pub video_enabled: bool,
    pub local_tracks: usize,
    pub remote_tracks: usize,
    pub queued_candidates: usize,
}

/// Control surface handed to the room view.
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionHandle {
    pub async fn command(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Terminated)
    }

    pub async fn send_chat(&self, message: impl Into<String>) -> Result<(), SessionError> {
        self.command(SessionCommand::SendChat(message.into())).await
    }

    pub async fn start_call(&self) -> Result<(), SessionError> {
        self.command(SessionCommand::StartCall).await
    }

    pub async fn end_call(&self) -> Result<(), SessionError> {
        self.command(SessionCommand::EndCall).await
    }

    pub async fn toggle_mute(&self) -> Result<(), SessionError> {
        self.command(SessionCommand::ToggleMute).await
    }

    pub async fn toggle_video(&self) -> Result<(), SessionError> {
        self.command(SessionCommand::ToggleVideo).await
    }

    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.command(SessionCommand::Shutdown).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.command(SessionCommand::Snapshot(tx)).await?;
        rx.await.map_err(|_| SessionError::Terminated)
    }

    /// Next observable event; `None` once the session loop has stopped.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }
}

/// The real-time coordinator for one room visit: multiplexes chat and call
/// signaling over the room channel, drives the offer/answer/candidate state
/// machine, and owns the call's media lifecycle. Single-threaded by
/// construction — every mutation happens inside [`run`].
///
/// [`run`]: RoomSession::run
pub struct RoomSession {
    identity: Identity,
    config: SessionConfig,
    backend: Arc<dyn CallBackend>,
    channel: ChannelSender,
    inbound_rx: mpsc::Receiver<ChannelEvent>,
    command_rx: mpsc::Receiver<SessionCommand>,
    engine_tx: mpsc::Sender<EngineEvent>,
    engine_rx: mpsc::Receiver<EngineEvent>,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    log: MessageLog,
    call: CallSession,
    /// Bumped on every call teardown; async completions carrying an older
    /// number belong to a torn-down session and are discarded.
    attempt: u64,
}

impl RoomSession {
    pub fn new(
        identity: Identity,
        config: SessionConfig,
        backend: Arc<dyn CallBackend>,
        channel: ChannelSender,
        inbound_rx: mpsc::Receiver<ChannelEvent>,
        history: Vec<ChatMessage>,
    ) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (engine_tx, engine_rx) = mpsc::channel(256);

        let session = Self {
            identity,
            config,
            backend,
            channel,
            inbound_rx,
            command_rx,
            engine_tx,
            engine_rx,
            event_tx,
            log: MessageLog::seeded(history),
            call: CallSession::new(),
            attempt: 0,
        };
        let handle = SessionHandle {
            commands: command_tx,
            events: event_rx,
        };
        (session, handle)
    }

    pub async fn run(mut self) {
        info!("Room session started for {}", self.identity.username);

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SessionCommand::Shutdown) | None => {
                            self.end_call().await;
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                    }
                }

                evt = self.inbound_rx.recv() => {
                    match evt {
                        Some(ChannelEvent::Frame(text)) => self.handle_frame(&text).await,
                        Some(ChannelEvent::Closed) | None => {
                            warn!("Signaling channel closed");
                            self.end_call().await;
                            let _ = self.event_tx.send(SessionEvent::ChannelClosed);
                            break;
                        }
                    }
                }

                Some(evt) = self.engine_rx.recv() => {
                    self.handle_engine_event(evt).await;
                }
            }
        }

        info!("Room session finished");
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::SendChat(message) => {
                self.channel.send(&Envelope::chat(&self.identity, message));
            }
            SessionCommand::StartCall => self.start_call(),
            SessionCommand::EndCall => self.end_call().await,
            SessionCommand::ToggleMute => {
                let muted = self.call.toggle_mute();
                debug!("Local audio {}", if muted { "muted" } else { "unmuted" });
            }
            SessionCommand::ToggleVideo => {
                let enabled = self.call.toggle_video();
                debug!("Local video {}", if enabled { "enabled" } else { "disabled" });
            }
            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            // Handled by the run loop before dispatch.
            SessionCommand::Shutdown => {}
        }
    }

    async fn handle_frame(&mut self, text: &str) {
        match mux::classify(text, &self.identity) {
            Inbound::Chat(message) => {
                self.log.append(message.clone());
                let _ = self.event_tx.send(SessionEvent::ChatAppended(message));
            }
            Inbound::Signal { action, payload } => self.handle_signal(action, payload).await,
            Inbound::Dropped(reason) => debug!("Frame dropped: {:?}", reason),
        }
    }

    async fn handle_signal(&mut self, action: SignalAction, payload: SignalPayload) {
        match (action, payload) {
            (SignalAction::Offer, SignalPayload::Description(desc))
                if desc.kind == SdpKind::Offer =>
            {
                self.handle_remote_offer(desc);
            }
            (SignalAction::Answer, SignalPayload::Description(desc))
                if desc.kind == SdpKind::Answer =>
            {
                self.handle_remote_answer(desc).await;
            }
            (SignalAction::IceCandidate, SignalPayload::Candidate(candidate)) => {
                self.handle_remote_candidate(candidate).await;
            }
            (action, _) => {
                warn!(
                    "Protocol violation: {:?} envelope with mismatched payload; dropped",
                    action
                );
            }
        }
    }

    fn handle_remote_offer(&mut self, offer: SessionDescription) {
        if self.call.state == CallState::Ended {
            self.call = CallSession::new();
        }
        if self.call.state != CallState::Idle {
            // No glare resolution: a simultaneous or repeated offer is
            // dropped, never applied over a live negotiation.
            warn!(
                "Protocol violation: offer received in state {:?}; dropped",
                self.call.state
            );
            return;
        }

        info!("Incoming call offer");
        self.call.role = Some(CallRole::Callee);
        self.call.pending_remote_offer = Some(offer);
        self.transition(CallState::AwaitingLocalMedia);
        self.spawn_media_acquisition();
    }

    async fn handle_remote_answer(&mut self, answer: SessionDescription) {
        let have_local_offer = self.call.state == CallState::Negotiating
            && self.call.role == Some(CallRole::Caller)
            && self.call.awaiting_answer;
        if !have_local_offer {
            warn!("Protocol violation: answer received without a pending local offer; dropped");
            return;
        }
        let Some(peer) = self.call.peer.clone() else {
            error!("Awaiting an answer with no peer connection");
            return;
        };

        if let Err(e) = peer.set_remote_description(answer).await {
            error!("Failed to apply remote answer: {}", e);
            self.end_call().await;
            return;
        }
        self.call.remote_description_set = true;
        self.call.awaiting_answer = false;
        self.drain_candidates().await;
        self.transition(CallState::Active);
    }

    async fn handle_remote_candidate(&mut self, candidate: IceCandidateInit) {
        if self.call.remote_description_set {
            if let Some(peer) = self.call.peer.clone() {
                if let Err(e) = peer.add_ice_candidate(candidate).await {
                    warn!("Failed to add ICE candidate: {}", e);
                }
                return;
            }
        }
        // Not safe to apply yet (remote description unknown, or the offer
        // itself is still on the wire): hold in arrival order.
        self.call.pending_candidates.push(candidate);
    }

    async fn drain_candidates(&mut self) {
        let Some(peer) = self.call.peer.clone() else {
            return;
        };
        for candidate in self.call.pending_candidates.drain() {
            // Best effort: one stale candidate must not abort the rest.
            if let Err(e) = peer.add_ice_candidate(candidate).await {
                warn!("Failed to add buffered ICE candidate: {}", e);
            }
        }
    }

    async fn handle_engine_event(&mut self, event: EngineEvent) {
        if event.attempt != self.attempt {
            debug!("Discarding completion from superseded call attempt");
            if let EngineEventKind::MediaReady(tracks) = event.kind {
                for track in &tracks {
                    track.stop();
                }
            }
            return;
        }

        match event.kind {
            EngineEventKind::MediaReady(tracks) => self.handle_media_ready(tracks).await,
            EngineEventKind::MediaFailed(e) => {
                warn!("Local media acquisition failed: {}", e);
                self.abort_to_idle(CallFailure::Media(e.to_string()));
            }
            EngineEventKind::Peer(PeerEvent::CandidateGenerated(candidate)) => {
                self.channel.send(&Envelope::signal(
                    &self.identity,
                    SignalAction::IceCandidate,
                    SignalPayload::Candidate(candidate),
                ));
            }
            EngineEventKind::Peer(PeerEvent::TrackReceived(track)) => {
                let kind = track.kind();
                self.call.remote_tracks.push(track);
                let _ = self.event_tx.send(SessionEvent::RemoteTrack(kind));
            }
            EngineEventKind::Peer(PeerEvent::ConnectionClosed) => {
                info!("Peer connection closed");
                self.end_call().await;
            }
        }
    }

    async fn handle_media_ready(&mut self, tracks: Vec<Arc<dyn MediaTrack>>) {
        if self.call.state != CallState::AwaitingLocalMedia {
            debug!("Media ready in state {:?}; discarding", self.call.state);
            for track in &tracks {
                track.stop();
            }
            return;
        }

        self.call.local_tracks = tracks;

        let (peer_tx, peer_rx) = mpsc::channel(64);
        self.forward_peer_events(peer_rx);

        let peer = match self
            .backend
            .create_peer(
                self.config.ice_servers.clone(),
                &self.call.local_tracks,
                peer_tx,
            )
            .await
        {
            Ok(peer) => peer,
            Err(e) => {
                error!("Failed to create peer connection: {}", e);
                self.abort_to_idle(CallFailure::Peer(e.to_string()));
                return;
            }
        };
        self.call.peer = Some(peer);
        self.transition(CallState::Negotiating);

        match self.call.role {
            Some(CallRole::Caller) => self.send_local_offer().await,
            Some(CallRole::Callee) => self.answer_remote_offer().await,
            None => error!("Negotiating without a call role"),
        }
    }

    async fn send_local_offer(&mut self) {
        let Some(peer) = self.call.peer.clone() else {
            return;
        };
        match peer.create_offer().await {
            Ok(offer) => {
                self.call.awaiting_answer = true;
                self.channel.send(&Envelope::signal(
                    &self.identity,
                    SignalAction::Offer,
                    SignalPayload::Description(offer),
                ));
            }
            Err(e) => {
                error!("Failed to create offer: {}", e);
                self.end_call().await;
            }
        }
    }

    async fn answer_remote_offer(&mut self) {
        let Some(peer) = self.call.peer.clone() else {
            return;
        };
        let Some(offer) = self.call.pending_remote_offer.take() else {
            error!("Answering with no stored remote offer");
            self.end_call().await;
            return;
        };

        if let Err(e) = peer.set_remote_description(offer).await {
            error!("Failed to apply remote offer: {}", e);
            self.end_call().await;
            return;
        }
        self.call.remote_description_set = true;
        self.drain_candidates().await;

        match peer.create_answer().await {
            Ok(answer) => {
                self.channel.send(&Envelope::signal(
                    &self.identity,
                    SignalAction::Answer,
                    SignalPayload::Description(answer),
                ));
                self.transition(CallState::Active);
            }
            Err(e) => {
                error!("Failed to create answer: {}", e);
                self.end_call().await;
            }
        }
    }

    fn start_call(&mut self) {
        if self.call.state == CallState::Ended {
            self.call = CallSession::new();
        }
        if self.call.state != CallState::Idle {
            warn!("start-call ignored in state {:?}", self.call.state);
            return;
        }

        self.call.role = Some(CallRole::Caller);
        self.transition(CallState::AwaitingLocalMedia);
        self.spawn_media_acquisition();
    }

    async fn end_call(&mut self) {
        if self.call.state == CallState::Idle {
            // Nothing to tear down; candidates that trickled in ahead of an
            // offer that never came go with it.
            self.call.pending_candidates.clear();
            return;
        }
        if self.call.state == CallState::Ended {
            return;
        }

        self.attempt += 1;
        for track in self.call.local_tracks.drain(..) {
            track.stop();
        }
        for track in self.call.remote_tracks.drain(..) {
            track.stop();
        }
        if let Some(peer) = self.call.peer.take() {
            peer.close().await;
        }
        self.call.pending_candidates.clear();
        self.call.pending_remote_offer = None;
        self.call.remote_description_set = false;
        self.call.awaiting_answer = false;
        self.call.role = None;
        self.transition(CallState::Ended);
    }

    /// Abandon the current attempt before a connection existed and return to
    /// `Idle` — used when media acquisition or peer creation fails.
    fn abort_to_idle(&mut self, failure: CallFailure) {
        self.attempt += 1;
        for track in self
            .call
            .local_tracks
            .iter()
            .chain(self.call.remote_tracks.iter())
        {
            track.stop();
        }
        self.call = CallSession::new();
        let _ = self.event_tx.send(SessionEvent::CallState(CallState::Idle));
        let _ = self.event_tx.send(SessionEvent::CallFailed(failure));
    }

    fn spawn_media_acquisition(&self) {
        let backend = Arc::clone(&self.backend);
        let tx = self.engine_tx.clone();
        let attempt = self.attempt;
        let want_video = self.config.enable_video;

        tokio::spawn(async move {
            let kind = match backend.acquire_local_media(want_video).await {
                Ok(tracks) => EngineEventKind::MediaReady(tracks),
                Err(e) => EngineEventKind::MediaFailed(e),
            };
            let _ = tx.send(EngineEvent { attempt, kind }).await;
        });
    }

    fn forward_peer_events(&self, mut peer_rx: mpsc::Receiver<PeerEvent>) {
        let tx = self.engine_tx.clone();
        let attempt = self.attempt;

        tokio::spawn(async move {
            while let Some(event) = peer_rx.recv().await {
                let event = EngineEvent {
                    attempt,
                    kind: EngineEventKind::Peer(event),
                };
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });
    }

    fn transition(&mut self, next: CallState) {
        if self.call.state == next {
            return;
        }
        if !self.call.state.can_transition_to(next) {
            error!(
                "Invalid call transition {:?} -> {:?}; ignored",
                self.call.state, next
            );
            return;
        }
        debug!("Call state {:?} -> {:?}", self.call.state, next);
        self.call.state = next;
        let _ = self.event_tx.send(SessionEvent::CallState(next));
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            messages: self.log.to_vec(),
            call_state: self.call.state,
            muted: self.call.muted,
            video_enabled: self.call.video_enabled,
            local_tracks: self.call.local_tracks.len(),
            remote_tracks: self.call.remote_tracks.len(),
            queued_candidates: self.call.pending_candidates.len(),
        }
    }
}
