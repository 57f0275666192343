use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use synod_common::{Decided, InstanceId, ProcessId, Result, SynodError, Value};
use synod_consensus::DecisionSink;

enum CollectorMessage {
    Start(i64),
    Decided(Decided),
    Report(oneshot::Sender<Summary>),
}

/// Outcome of one run as seen by the collector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Lowest instance any process decided.
    pub instance: Option<InstanceId>,
    pub value: Option<Value>,
    /// Earliest decision on `instance`, minus the launch time.
    pub latency_ms: Option<i64>,
    /// Decision notifications received, over every instance.
    pub decisions: usize,
    /// Processes that decided `instance`.
    pub deciders: Vec<ProcessId>,
    /// Instances on which two different values were reported.
    pub conflicts: Vec<InstanceId>,
}

impl Summary {
    pub fn decided(&self) -> bool {
        self.instance.is_some()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.instance, self.value) {
            (Some(instance), Some(value)) => {
                match self.latency_ms {
                    Some(ms) => write!(f, "Time taken: {}ms", ms)?,
                    None => write!(f, "Time taken: unknown")?,
                }
                write!(f, " (instance {}, value {}, {} decisions)", instance, value, self.decisions)
            }
            _ => write!(f, "no instance decided"),
        }
    }
}

#[derive(Debug)]
struct InstanceRecord {
    value: Value,
    first_ms: i64,
    deciders: BTreeSet<ProcessId>,
    conflicting: bool,
}

/// Decision bookkeeping, kept apart from the task so it can be driven directly.
#[derive(Debug, Default)]
pub struct Collector {
    start_ms: Option<i64>,
    instances: BTreeMap<InstanceId, InstanceRecord>,
    decisions: usize,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the collector task.
    pub fn spawn() -> (CollectorHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            let mut collector = Collector::new();
            while let Some(message) = rx.recv().await {
                match message {
                    CollectorMessage::Start(at_ms) => collector.start(at_ms),
                    CollectorMessage::Decided(decision) => collector.record(decision),
                    CollectorMessage::Report(reply) => {
                        let summary = collector.summary();
                        info!("{}", summary);
                        let _ = reply.send(summary);
                    }
                }
            }
            debug!("collector stopped");
        });
        (CollectorHandle { tx }, task)
    }

    pub fn start(&mut self, at_ms: i64) {
        self.start_ms = Some(at_ms);
    }

    pub fn record(&mut self, decision: Decided) {
        self.decisions += 1;
        debug!("{}", decision);

        let record = self.instances.entry(decision.instance).or_insert_with(|| InstanceRecord {
            value: decision.value,
            first_ms: decision.timestamp_ms,
            deciders: BTreeSet::new(),
            conflicting: false,
        });
        if record.value != decision.value && !record.conflicting {
            record.conflicting = true;
            error!(
                "agreement violated on instance {}: {} after {} (from {})",
                decision.instance, decision.value, record.value, decision.process
            );
        }
        record.first_ms = record.first_ms.min(decision.timestamp_ms);
        record.deciders.insert(decision.process);
    }

    pub fn summary(&self) -> Summary {
        let lowest = self.instances.iter().next();
        Summary {
            instance: lowest.map(|(k, _)| *k),
            value: lowest.map(|(_, r)| r.value),
            latency_ms: lowest.and_then(|(_, r)| self.start_ms.map(|start| r.first_ms - start)),
            decisions: self.decisions,
            deciders: lowest.map(|(_, r)| r.deciders.iter().copied().collect()).unwrap_or_default(),
            conflicts: self
                .instances
                .iter()
                .filter(|(_, r)| r.conflicting)
                .map(|(k, _)| *k)
                .collect(),
        }
    }
}

/// Address of the collector task; also what processes report decisions to.
#[derive(Debug, Clone)]
pub struct CollectorHandle {
    tx: mpsc::UnboundedSender<CollectorMessage>,
}

impl CollectorHandle {
    /// Records the launch time that latencies are measured from.
    pub fn start(&self, at_ms: i64) -> Result<()> {
        self.tx
            .send(CollectorMessage::Start(at_ms))
            .map_err(|_| SynodError::CollectorClosed)
    }

    pub async fn report(&self) -> Result<Summary> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(CollectorMessage::Report(reply))
            .map_err(|_| SynodError::CollectorClosed)?;
        rx.await.map_err(|_| SynodError::CollectorClosed)
    }
}

impl DecisionSink for CollectorHandle {
    fn decided(&self, decision: Decided) {
        let _ = self.tx.send(CollectorMessage::Decided(decision));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decided(process: usize, instance: InstanceId, value: Value, timestamp_ms: i64) -> Decided {
        Decided { timestamp_ms, instance, value, process: ProcessId(process) }
    }

    #[test]
    fn test_empty_summary() {
        let summary = Collector::new().summary();
        assert!(!summary.decided());
        assert_eq!(summary.to_string(), "no instance decided");
    }

    #[test]
    fn test_lowest_instance_and_earliest_time() {
        let mut collector = Collector::new();
        collector.start(1_000);
        collector.record(decided(2, 3, Value::Zero, 1_010));
        collector.record(decided(0, 1, Value::One, 1_050));
        collector.record(decided(1, 1, Value::One, 1_020));

        let summary = collector.summary();
        assert_eq!(summary.instance, Some(1));
        assert_eq!(summary.value, Some(Value::One));
        assert_eq!(summary.latency_ms, Some(20));
        assert_eq!(summary.decisions, 3);
        assert_eq!(summary.deciders, vec![ProcessId(0), ProcessId(1)]);
        assert!(summary.conflicts.is_empty());
        assert_eq!(summary.to_string(), "Time taken: 20ms (instance 1, value 1, 3 decisions)");
    }

    #[test]
    fn test_conflicting_values_are_flagged() {
        let mut collector = Collector::new();
        collector.record(decided(0, 2, Value::Zero, 5));
        collector.record(decided(1, 2, Value::One, 6));
        collector.record(decided(2, 2, Value::One, 7));
        assert_eq!(collector.summary().conflicts, vec![2]);
    }

    #[test]
    fn test_missing_start_leaves_latency_unknown() {
        let mut collector = Collector::new();
        collector.record(decided(0, 1, Value::Zero, 5));
        assert_eq!(collector.summary().latency_ms, None);
    }

    #[tokio::test]
    async fn test_task_answers_report() {
        let (handle, _task) = Collector::spawn();
        handle.start(100).unwrap();
        handle.decided(decided(4, 1, Value::One, 130));
        let summary = handle.report().await.unwrap();
        assert_eq!(summary.latency_ms, Some(30));
        assert_eq!(summary.deciders, vec![ProcessId(4)]);
    }
}
