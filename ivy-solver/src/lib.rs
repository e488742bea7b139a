//! Driving external solver subprocesses (spec.md §4.7).
//!
//! A [`SolverInvocation`] + [`ProofInputSpec`] pair is run under
//! [`run_solver_task`], which acquires a [`JobLease`] permit, writes the
//! `.sby`-style input file, spawns the subprocess, and parses its exit
//! artefact into a [`ProofStatusEvent`]. The scheduler owns task lifetime;
//! this crate only knows how to run one task to completion or cooperative
//! cancellation.

mod cancel;
mod error;
mod lease;
mod result;
mod task;

pub use cancel::{CancelHandle, CancelSignal, CancelToken};
pub use error::SolverError;
pub use lease::JobLease;
pub use result::{read_result_status, ProofInputSpec};
pub use task::{run_solver_task, ProofStatusEvent, SolverInvocation};
