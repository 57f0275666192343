use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::sync::Arc;

use rand::{rngs::StdRng, SeedableRng};
use tokio::sync::mpsc::{self, UnboundedReceiver, WeakUnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use synod_common::ProcessId;

use super::{
    gate::CrashGate,
    handle::{DecisionSink, Envelope, Message, ProcessHandle},
    status::{InstanceSnapshot, ProcessStatus},
};
use crate::{config::ProcessConfig, consensus::SynodEngine};

/// Collector and peers, set once by `ActorList` and read-only afterwards.
#[derive(Debug)]
pub(super) struct Wiring {
    pub(super) collector: Arc<dyn DecisionSink>,
    pub(super) neighbors: BTreeMap<ProcessId, ProcessHandle>,
}

/// One participant of the run, acting as proposer and acceptor at once.
#[derive(Debug)]
pub struct Process {
    pub(super) id: ProcessId,
    pub(super) engine: SynodEngine,
    pub(super) gate: CrashGate,
    pub(super) rng: StdRng,
    pub(super) config: ProcessConfig,
    pub(super) wiring: OnceCell<Wiring>,
    /// Own inbox, weak so that the process alone never keeps itself running.
    pub(super) me: WeakUnboundedSender<Envelope>,
}

impl Process {
    /// Starts process `id` of an `n`-process run on the current tokio runtime.
    pub fn spawn(id: ProcessId, n: usize, config: ProcessConfig) -> (ProcessHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let process = Process {
            id,
            engine: SynodEngine::new(id, n),
            gate: CrashGate::new(),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            wiring: OnceCell::new(),
            me: tx.downgrade(),
        };
        let task = tokio::spawn(process.run(rx));
        (ProcessHandle::new(id, tx), task)
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    async fn run(mut self, mut inbox: UnboundedReceiver<Envelope>) {
        debug!("{} started", self.id);
        while let Some(envelope) = inbox.recv().await {
            if !self.handle(envelope) {
                break;
            }
        }
        info!("{} stopped", self.id);
    }

    /// Processes one envelope to completion. Returns false once the loop should end.
    fn handle(&mut self, envelope: Envelope) -> bool {
        let Envelope { from, message } = envelope;
        let result = match message {
            Message::Inspect(reply) => {
                let _ = reply.send(self.status());
                Ok(())
            }
            Message::Stop => return self.on_stop(),
            _ if self.gate.is_crashed() => Ok(()),
            Message::ActorList { collector, neighbors } => self.on_actor_list(collector, neighbors),
            Message::Crash { alpha } => self.on_crash(alpha),
            Message::Hold => self.on_hold(),
            Message::Launch => self.on_launch(),
            Message::RetryDue { instance, ballot } => self.on_retry_due(instance, ballot),
            Message::Protocol(message) => self.on_protocol(from, message),
        };
        if let Err(e) = result {
            warn!("{}: {}", self.id, e);
        }
        true
    }

    pub(super) fn status(&self) -> ProcessStatus {
        ProcessStatus {
            id: self.id,
            crashed: self.gate.is_crashed(),
            held: self.engine.is_held(),
            wired: self.wiring.get().is_some(),
            crash_probability: self.gate.probability(),
            instances: self
                .engine
                .instances()
                .iter()
                .map(|(k, state)| InstanceSnapshot::from_state(*k, state))
                .collect(),
        }
    }
}
