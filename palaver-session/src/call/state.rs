/// Lifecycle of one 1:1 call attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Idle,
    /// Capture of the local audio/video tracks is in flight.
    AwaitingLocalMedia,
    /// A peer connection exists and the offer/answer exchange is running.
    Negotiating,
    Active,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallRole {
    /// We placed the call and are waiting for an answer to our offer.
    Caller,
    /// The remote peer placed the call; we answer their offer.
    Callee,
}

impl CallState {
    /// Valid forward moves of the state machine. `Ended` is reachable from
    /// everywhere so hanging up is always accepted.
    pub fn can_transition_to(self, next: CallState) -> bool {
        use CallState::*;
        matches!(
            (self, next),
            (Idle, AwaitingLocalMedia)
                | (AwaitingLocalMedia, Negotiating)
                | (Negotiating, Active)
                | (_, Ended)
        )
    }
}
