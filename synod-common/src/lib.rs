pub mod env;
pub mod error;
pub mod utils;

pub use env::{Ballot, Decided, InstanceId, ProcessId, ProtocolMessage, Value};
pub use error::{Result, SynodError};
