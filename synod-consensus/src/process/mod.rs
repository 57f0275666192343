//! process
//!
//! The addressable unit of a synod run: one tokio task per process draining
//! a private inbox, one message at a time. All consensus state is owned by
//! that task, so nothing here needs a lock.

pub mod core;
pub mod gate;
pub mod handle;
mod protocol;
pub mod retry;
mod setup;
mod shutdown;
pub mod status;
