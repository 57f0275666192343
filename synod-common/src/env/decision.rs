use std::fmt;

use serde::{Deserialize, Serialize};

use crate::env::consensus::types::{InstanceId, Value};
use crate::env::node::ProcessId;

/// Notification a process sends to the collector the first time it decides
/// (or adopts a decision for) an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decided {
    /// Wall clock time of the decision, in milliseconds since the UNIX epoch.
    pub timestamp_ms: i64,

    pub instance: InstanceId,

    pub value: Value,

    /// The process that reached or adopted the decision.
    pub process: ProcessId,
}

impl fmt::Display for Decided {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} decided {} on instance {} at {}",
            self.process, self.value, self.instance, self.timestamp_ms
        )
    }
}
