pub mod consensus;
pub mod decision;
pub mod message;
pub mod node;

pub use consensus::types::{Ballot, InstanceId, Value};
pub use decision::Decided;
pub use message::ProtocolMessage;
pub use node::ProcessId;
