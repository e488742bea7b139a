//! Driving one external solver subprocess end to end (spec.md §4.7).

use std::path::PathBuf;
use std::process::Stdio;

use ivy_graph::{Status, Task};
use tokio::process::Command;

use crate::cancel::{CancelSignal, CancelToken};
use crate::error::SolverError;
use crate::lease::JobLease;
use crate::result::{read_result_status, ProofInputSpec};

/// The event a solver task produces when it settles, one way or another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofStatusEvent {
    pub task: Task,
    pub status: Status,
    /// Set when this event was produced by a cancellation whose
    /// `already_solved` flag was set: the entity already has a final
    /// status from elsewhere, so a require mismatch persisting this
    /// event's own status is expected rather than a bug.
    pub already_solved: bool,
}

/// An entity name + solver string, split into a program and its
/// arguments. The scheduler performs the `"default"` substitution and
/// `shlex` splitting before handing a task over (spec.md §4.8 step 2).
#[derive(Debug, Clone)]
pub struct SolverInvocation {
    pub program: String,
    pub args: Vec<String>,
}

/// Drives one proof attempt through `created -> running ->
/// {pass,fail,unknown,error,pending,abandoned}`. `on_running` fires once,
/// right after the job-server lease is acquired and before the subprocess
/// spawns, so the scheduler can persist the `scheduled -> running`
/// transition at the right moment. Grounded on `reqactor::actor_inner`'s
/// shape of an async unit of work that acquires a semaphore permit and
/// holds it across a suspension point, generalized from an in-process
/// prover call to an external `tokio::process::Command`.
pub async fn run_solver_task(
    task: Task,
    invocation: SolverInvocation,
    input: ProofInputSpec,
    task_dir: PathBuf,
    lease: JobLease,
    mut cancel: CancelToken,
    on_running: impl FnOnce(),
) -> ProofStatusEvent {
    if let Some(signal) = cancel.signal() {
        return settle(task, signal);
    }

    let permit = tokio::select! {
        permit = lease.acquire() => permit,
        signal = cancel.cancelled() => return settle(task, signal),
    };
    on_running();

    if let Err(e) = write_input_file(&task_dir, &input) {
        tracing::warn!(%task, error = %e, "failed to write solver input file");
        drop(permit);
        return ProofStatusEvent {
            task,
            status: Status::Error,
            already_solved: false,
        };
    }

    let mut command = Command::new(&invocation.program);
    command
        .args(&invocation.args)
        .current_dir(&task_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = match command.spawn().map_err(|e| SolverError::Spawn(invocation.program.clone(), e)) {
        Ok(child) => child,
        Err(e) => {
            tracing::warn!(%task, error = %e, "failed to spawn solver process");
            drop(permit);
            return ProofStatusEvent {
                task,
                status: Status::Error,
                already_solved: false,
            };
        }
    };

    tracing::debug!(%task, program = %invocation.program, "solver process running");

    let outcome = tokio::select! {
        exit = child.wait() => Outcome::Exited(exit.map_err(SolverError::Wait)),
        signal = cancel.cancelled() => Outcome::Cancelled(signal),
    };
    drop(permit);

    match outcome {
        Outcome::Exited(Ok(_)) => {
            let status = read_result_status(&task_dir);
            tracing::debug!(%task, %status, "solver process exited");
            ProofStatusEvent {
                task,
                status,
                already_solved: false,
            }
        }
        Outcome::Exited(Err(e)) => {
            tracing::warn!(%task, error = %e, "solver process wait failed");
            ProofStatusEvent {
                task,
                status: Status::Error,
                already_solved: false,
            }
        }
        Outcome::Cancelled(signal) => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            settle(task, signal)
        }
    }
}

enum Outcome {
    Exited(Result<std::process::ExitStatus, SolverError>),
    Cancelled(CancelSignal),
}

fn settle(task: Task, signal: CancelSignal) -> ProofStatusEvent {
    let status = if signal.abandoned {
        Status::Abandoned
    } else {
        Status::Pending
    };
    ProofStatusEvent {
        task,
        status,
        already_solved: signal.already_solved,
    }
}

fn write_input_file(task_dir: &std::path::Path, input: &ProofInputSpec) -> Result<(), SolverError> {
    std::fs::create_dir_all(task_dir).map_err(|e| SolverError::WriteInput(task_dir.to_path_buf(), e))?;
    let path = task_dir.join("input.sby");
    std::fs::write(&path, input.render()).map_err(|e| SolverError::WriteInput(path, e))
}
