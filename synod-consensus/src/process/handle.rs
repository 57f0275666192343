use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use synod_common::{Ballot, Decided, InstanceId, ProcessId, ProtocolMessage, Result, SynodError};

use super::status::ProcessStatus;

/// Receiver of decision notifications (the collector, or a test probe).
pub trait DecisionSink: Send + Sync + fmt::Debug {
    fn decided(&self, decision: Decided);
}

impl DecisionSink for mpsc::UnboundedSender<Decided> {
    fn decided(&self, decision: Decided) {
        let _ = self.send(decision);
    }
}

/// Everything a process inbox can carry.
#[derive(Debug)]
pub enum Message {
    /// One-time wiring: collector plus every other process.
    ActorList {
        collector: Arc<dyn DecisionSink>,
        neighbors: Vec<ProcessHandle>,
    },
    /// Sets the crash probability checked before each message.
    Crash { alpha: f64 },
    /// Opens a new instance with a random bit.
    Launch,
    /// Stops self-initiated rounds; the process keeps answering.
    Hold,
    Protocol(ProtocolMessage),
    /// Abort-retry timer of `(instance, ballot)` fired.
    RetryDue { instance: InstanceId, ballot: Ballot },
    /// Snapshot request, answered even after a crash.
    Inspect(oneshot::Sender<ProcessStatus>),
    /// Ends the inbox loop.
    Stop,
}

#[derive(Debug)]
pub struct Envelope {
    /// `None` for orchestrator and timer traffic.
    pub from: Option<ProcessId>,
    pub message: Message,
}

/// Cloneable address of a running process.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    id: ProcessId,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl ProcessHandle {
    pub fn new(id: ProcessId, tx: mpsc::UnboundedSender<Envelope>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    /// Enqueues `message`; never waits on the receiver.
    pub fn tell(&self, from: Option<ProcessId>, message: Message) -> Result<()> {
        self.tx
            .send(Envelope { from, message })
            .map_err(|_| SynodError::MailboxClosed(self.id))
    }

    pub fn send_protocol(&self, from: ProcessId, message: ProtocolMessage) -> Result<()> {
        self.tell(Some(from), Message::Protocol(message))
    }

    pub fn wire(&self, collector: Arc<dyn DecisionSink>, neighbors: Vec<ProcessHandle>) -> Result<()> {
        self.tell(None, Message::ActorList { collector, neighbors })
    }

    pub fn crash(&self, alpha: f64) -> Result<()> {
        self.tell(None, Message::Crash { alpha })
    }

    pub fn launch(&self) -> Result<()> {
        self.tell(None, Message::Launch)
    }

    pub fn hold(&self) -> Result<()> {
        self.tell(None, Message::Hold)
    }

    pub fn stop(&self) -> Result<()> {
        self.tell(None, Message::Stop)
    }

    /// Asks the process for a snapshot of its state.
    pub async fn inspect(&self) -> Result<ProcessStatus> {
        let (reply, rx) = oneshot::channel();
        self.tell(None, Message::Inspect(reply))?;
        rx.await.map_err(|_| SynodError::MailboxClosed(self.id))
    }
}
