//! utils.rs
//!
//! Small helpers shared by the synod crates: wall clock access and seed handling.

pub mod seed;
pub mod time;
