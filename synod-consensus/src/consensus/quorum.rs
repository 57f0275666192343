use serde::{Deserialize, Serialize};
use synod_common::env::consensus::types::quorum;

/// Majority rule over a fixed acceptor set.
///
/// Every process is an acceptor, the proposer included, so `acceptors` is
/// the peer count `N` and the threshold is `⌊N/2⌋ + 1` distinct replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumPolicy {
    pub acceptors: usize,
    pub threshold: usize,
}

impl QuorumPolicy {
    pub fn majority(acceptors: usize) -> Self {
        Self {
            acceptors,
            threshold: quorum(acceptors),
        }
    }

    /// True once `replies` distinct acceptors answered.
    pub fn is_reached(&self, replies: usize) -> bool {
        replies >= self.threshold
    }
}
