pub mod cli;
pub mod config;
pub mod runtime;
pub mod setup;

pub use config::RunConfig;
pub use runtime::collector::{Collector, CollectorHandle, Summary};
pub use runtime::orchestrator::{run, Cluster, Orchestrator};
