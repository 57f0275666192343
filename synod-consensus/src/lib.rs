pub mod config;
pub mod consensus;
pub mod process;

pub use config::ProcessConfig;
pub use consensus::quorum::QuorumPolicy;
pub use consensus::{Outbound, SynodEngine};
pub use process::core::Process;
pub use process::handle::{DecisionSink, Envelope, Message, ProcessHandle};
pub use process::status::{InstanceSnapshot, ProcessStatus};
