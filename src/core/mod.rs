//! Core hashing pipeline
//!
//! Bounded task scheduling, outcome reconciliation and the run orchestration
//! for calculate and check modes.

mod gate;
mod report;
mod runner;
mod scheduler;

pub use gate::*;
pub use report::*;
pub use runner::*;
pub use scheduler::*;
