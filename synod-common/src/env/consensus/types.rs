use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::env::node::ProcessId;

/// Round identifier. Negative values only appear as the initial
/// `ballot`/`impose_ballot` of an instance, before any round ran.
pub type Ballot = i64;

/// Consensus instance number, chosen by the proposer and starting at 1.
pub type InstanceId = u64;

/// The single bit a synod instance agrees on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Zero,
    One,
}

impl Value {
    /// Draws a uniformly random bit.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) {
            Value::One
        } else {
            Value::Zero
        }
    }
}

impl From<Value> for i32 {
    fn from(v: Value) -> Self {
        match v {
            Value::Zero => 0,
            Value::One => 1,
        }
    }
}

impl std::convert::TryFrom<i32> for Value {
    type Error = ();

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Value::Zero),
            1 => Ok(Value::One),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", i32::from(*self))
    }
}

/// Ballot held by `id` before its first round: `id - N`.
pub fn initial_ballot(id: ProcessId, n: usize) -> Ballot {
    id.index() as Ballot - n as Ballot
}

/// Ballot of process `id` in round `round` (round 0 is the initial ballot).
///
/// Ballots of two different processes never collide because their
/// difference would have to be a non-zero multiple of `n`.
pub fn ballot_for_round(id: ProcessId, n: usize, round: u64) -> Ballot {
    initial_ballot(id, n) + round as Ballot * n as Ballot
}

/// Majority size for `n` acceptors: `⌊n/2⌋ + 1`.
pub fn quorum(n: usize) -> usize {
    n / 2 + 1
}
