//! consensus.rs
//!
//! Synod (single-decree Paxos) over a single bit, per instance.
//!
//! A proposer runs READ → GATHER → IMPOSE → ACK rounds with strictly
//! increasing, globally unique ballots; any acceptor that already promised or
//! accepted a newer ballot answers ABORT, which sends the proposer back to a
//! fresh round after a short delay. A majority of ACKs decides the instance.
//!
//! The engine is pure bookkeeping. Delivery, timers and crash injection live
//! in [`crate::process`].

mod engine;
pub mod instance;
pub mod quorum;

pub use engine::{Outbound, SynodEngine};
