use serde::Serialize;
use synod_common::{Ballot, InstanceId, ProcessId, Value};

use crate::consensus::instance::{InstanceState, Phase};

/// Point-in-time view of one instance on one process.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceSnapshot {
    pub instance: InstanceId,
    pub ballot: Ballot,
    pub read_ballot: Ballot,
    pub impose_ballot: Ballot,
    pub estimate: Option<Value>,
    pub proposal: Option<Value>,
    pub phase: Phase,
    pub decided: Option<Value>,
    pub rounds: u64,
}

impl InstanceSnapshot {
    pub fn from_state(instance: InstanceId, state: &InstanceState) -> Self {
        Self {
            instance,
            ballot: state.ballot,
            read_ballot: state.read_ballot,
            impose_ballot: state.impose_ballot,
            estimate: state.estimate,
            proposal: state.proposal,
            phase: state.phase,
            decided: state.decided(),
            rounds: state.rounds,
        }
    }
}

/// Answer to `Message::Inspect`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessStatus {
    pub id: ProcessId,
    pub crashed: bool,
    pub held: bool,
    pub wired: bool,
    pub crash_probability: f64,
    pub instances: Vec<InstanceSnapshot>,
}

impl ProcessStatus {
    pub fn instance(&self, instance: InstanceId) -> Option<&InstanceSnapshot> {
        self.instances.iter().find(|s| s.instance == instance)
    }

    /// Rounds started across every instance.
    pub fn rounds_started(&self) -> u64 {
        self.instances.iter().map(|s| s.rounds).sum()
    }
}
