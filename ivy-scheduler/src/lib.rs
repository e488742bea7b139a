//! Per-entity dispatch and priority scheduling for the ivy proof
//! orchestrator (spec.md §4.8).

mod dispatch;
mod error;
mod queue;
mod sentinel;

pub use dispatch::{DispatchRequest, Scheduler, UsefulnessOracle};
pub use error::SchedulerError;
pub use queue::{DispatchQueue, PriorityKey};
pub use sentinel::{Sentinel, SentinelController};
