//! node.rs
//!
//! Identity of a process taking part in a synod run.
//!
//! Ids are dense integers in `[0, N)`. They index the per-instance peer state
//! table and seed the ballot sequence, so they must stay stable for the whole run.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique, immutable identifier of a process in `[0, N)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessId(pub usize);

impl ProcessId {
    /// Slot of this process in tables sized by the peer count.
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for ProcessId {
    fn from(id: usize) -> Self {
        ProcessId(id)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_p_prefix() {
        assert_eq!(ProcessId(7).to_string(), "p7");
    }

    #[test]
    fn test_ordering_follows_index() {
        let mut ids = vec![ProcessId(3), ProcessId(0), ProcessId(2)];
        ids.sort();
        assert_eq!(ids, vec![ProcessId(0), ProcessId(2), ProcessId(3)]);
    }
}
