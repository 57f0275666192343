use std::fmt;

use serde::{Deserialize, Serialize};

use crate::env::consensus::types::{Ballot, InstanceId, Value};
use crate::env::node::ProcessId;

/// Messages exchanged between processes while running a synod instance.
///
/// Every variant names the instance it belongs to, and every variant except
/// `Decide` names the ballot it answers, so a receiver can always tell a
/// stale message from a current one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolMessage {
    /// Phase 1 request from a proposer.
    Read { ballot: Ballot, instance: InstanceId },

    /// Phase 1 answer: the acceptor's last accepted ballot and value.
    Gather {
        sender: ProcessId,
        ballot: Ballot,
        est_ballot: Ballot,
        estimate: Option<Value>,
        instance: InstanceId,
    },

    /// Phase 2 request carrying the value to accept.
    Impose { ballot: Ballot, value: Value, instance: InstanceId },

    /// Phase 2 answer.
    Ack { ballot: Ballot, instance: InstanceId },

    /// Negative answer to a READ or IMPOSE for an outdated ballot.
    Abort { ballot: Ballot, instance: InstanceId },

    /// Final value of an instance.
    Decide { value: Value, instance: InstanceId },
}

impl ProtocolMessage {
    /// Short upper-case tag used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolMessage::Read { .. } => "READ",
            ProtocolMessage::Gather { .. } => "GATHER",
            ProtocolMessage::Impose { .. } => "IMPOSE",
            ProtocolMessage::Ack { .. } => "ACK",
            ProtocolMessage::Abort { .. } => "ABORT",
            ProtocolMessage::Decide { .. } => "DECIDE",
        }
    }
}

impl fmt::Display for ProtocolMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolMessage::Read { ballot, instance }
            | ProtocolMessage::Ack { ballot, instance }
            | ProtocolMessage::Abort { ballot, instance } => {
                write!(f, "{}(ballot={}, instance={})", self.kind(), ballot, instance)
            }
            ProtocolMessage::Gather { sender, ballot, est_ballot, estimate, instance } => {
                let est = estimate.map(|v| v.to_string()).unwrap_or_else(|| "-".into());
                write!(
                    f,
                    "GATHER(from={}, ballot={}, est_ballot={}, est={}, instance={})",
                    sender, ballot, est_ballot, est, instance
                )
            }
            ProtocolMessage::Impose { ballot, value, instance } => {
                write!(f, "IMPOSE(ballot={}, value={}, instance={})", ballot, value, instance)
            }
            ProtocolMessage::Decide { value, instance } => {
                write!(f, "DECIDE(value={}, instance={})", value, instance)
            }
        }
    }
}
