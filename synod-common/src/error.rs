use thiserror::Error;

use crate::env::node::ProcessId;

/// Failures around the protocol: wiring, configuration and I/O.
///
/// Stale rounds, stale replies, unknown instances and duplicate decisions are
/// ordinary protocol traffic and never surface as a `SynodError`.
#[derive(Debug, Error)]
pub enum SynodError {
    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Process {0} has not received its peer list yet")]
    NotWired(ProcessId),

    #[error("Process {0} already received its peer list")]
    AlreadyWired(ProcessId),

    #[error("Process {0} already received its crash probability")]
    AlreadyArmed(ProcessId),

    #[error("Peer {0} not found")]
    UnknownPeer(ProcessId),

    #[error("Mailbox of {0} is closed")]
    MailboxClosed(ProcessId),

    #[error("Decision collector is gone")]
    CollectorClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SynodError>;
