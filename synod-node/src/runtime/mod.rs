pub mod collector;
pub mod orchestrator;
pub mod sweep;
