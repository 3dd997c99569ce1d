use palaver_core::IceCandidateInit;
use std::collections::VecDeque;

/// FIFO buffer for remote ICE candidates that arrive before the remote
/// session description is set. Unbounded for the life of one call attempt;
/// cleared when the call ends.
#[derive(Debug, Default)]
pub struct PendingCandidateQueue {
    queue: VecDeque<IceCandidateInit>,
}

impl PendingCandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, candidate: IceCandidateInit) {
        self.queue.push_back(candidate);
    }

    /// Take all buffered candidates in arrival order.
    pub fn drain(&mut self) -> Vec<IceCandidateInit> {
        self.queue.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
