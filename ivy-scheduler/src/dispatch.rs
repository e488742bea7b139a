//! The scheduler proper (spec.md §4.8).
//!
//! Grounded on `reqactor::actor::Actor::serve_in_background`'s shape: a
//! background pump pops the next-ready unit of work, acquires a
//! concurrency permit, and `tokio::spawn`s it, while the public API just
//! pushes work into a queue and a notifier wakes the pump. Generalized
//! from a flat FIFO-per-priority-tier queue to the open-ended
//! `(entity_priority, -solve_order_index, -dependency_order)` triple of
//! [`crate::queue::DispatchQueue`], and from one shared request queue to
//! one dispatch-set per entity (`positive_priority_tasks`,
//! `negative_priority_tasks`, `tasks`) plus the priority sentinel.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use ivy_graph::{Name, Status, Task};
use ivy_solver::{
    run_solver_task, CancelHandle, CancelSignal, CancelToken, JobLease, ProofInputSpec,
    ProofStatusEvent, SolverInvocation,
};
use ivy_store::StatusStore;
use tokio::sync::{mpsc, Notify};

use crate::error::SchedulerError;
use crate::queue::{DispatchQueue, PriorityKey};
use crate::sentinel::{Sentinel, SentinelController};

/// What the caller (orchestration loop) must supply to decide which
/// pending/scheduled/running tasks are no longer useful, per a fresh
/// `reduced_status()` + propagation + back-propagation pass (spec.md
/// §4.4/§4.5). The scheduler owns only the debounce and cancellation
/// side of the usefulness recompute; the graph work lives with the
/// entity model and status graph.
#[async_trait::async_trait]
pub trait UsefulnessOracle: Send + Sync {
    async fn unreachable_non_useful(&self) -> Vec<Name>;
}

/// A task ready to dispatch: its identity, priority inputs, and the
/// already-built solver input.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub task: Task,
    pub entity_priority: i64,
    pub solve_order_index: usize,
    pub dependency_order: usize,
    pub input: ProofInputSpec,
}

struct PendingDispatch {
    invocation: SolverInvocation,
    input: ProofInputSpec,
    cancel_token: CancelToken,
    wait_on: Option<Sentinel>,
}

struct RunningEntry {
    cancel: CancelHandle,
    is_positive: bool,
}

#[derive(Default)]
struct DispatchState {
    positive: HashMap<Name, Vec<Task>>,
    negative: HashMap<Name, Vec<Task>>,
    running: HashMap<Name, HashMap<Task, RunningEntry>>,
    sentinel_controllers: HashMap<Name, SentinelController>,
    sentinels: HashMap<Name, Sentinel>,
    status_ticks: u64,
}

struct Inner {
    store: Arc<StatusStore>,
    lease: JobLease,
    default_solver: String,
    tasks_dir: PathBuf,
    oracle: Arc<dyn UsefulnessOracle>,
    queue: Mutex<DispatchQueue>,
    pending: Mutex<HashMap<Task, PendingDispatch>>,
    dispatch: Mutex<DispatchState>,
    notify: Notify,
    events_tx: mpsc::UnboundedSender<ProofStatusEvent>,
}

/// Per-entity dispatch sets, priority scheduling, and event handling
/// (spec.md §4.8). One `Scheduler` per process run.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(
        store: Arc<StatusStore>,
        lease: JobLease,
        default_solver: String,
        tasks_dir: PathBuf,
        oracle: Arc<dyn UsefulnessOracle>,
    ) -> (Self, mpsc::UnboundedReceiver<ProofStatusEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            store,
            lease,
            default_solver,
            tasks_dir,
            oracle,
            queue: Mutex::new(DispatchQueue::new()),
            pending: Mutex::new(HashMap::new()),
            dispatch: Mutex::new(DispatchState::default()),
            notify: Notify::new(),
            events_tx,
        });
        spawn_pump(inner.clone());
        (Self { inner }, events_rx)
    }

    /// Dispatches one proof task: resolves the `"default"` solver,
    /// splits off solver-specific arguments, registers it in the
    /// entity's dispatch sets (creating the priority sentinel if both
    /// priority classes are now non-empty), and queues it for the pump
    /// in priority order. `task.solver` is the entity model's declared
    /// solver string (possibly the literal `"default"` placeholder) and
    /// stays untouched: it is the identity the status store, priority
    /// lookups, and reports all key on. Only the resolved invocation
    /// (the actual program to run) substitutes `"default"` for the
    /// configured default solver.
    pub fn dispatch_proof_task(&self, request: DispatchRequest) {
        let DispatchRequest {
            task,
            entity_priority,
            solve_order_index,
            dependency_order,
            input,
        } = request;

        let resolved = if task.solver == "default" {
            self.inner.default_solver.as_str()
        } else {
            task.solver.as_str()
        };
        let (program, args) = split_solver_command(resolved);

        let is_positive = entity_priority > 0;
        let (cancel_handle, cancel_token) = CancelHandle::new();

        let mut retroactive = None;
        let wait_on = {
            let mut state = self.inner.dispatch.lock().expect("scheduler state poisoned");
            state
                .running
                .entry(task.name.clone())
                .or_default()
                .insert(
                    task.clone(),
                    RunningEntry {
                        cancel: cancel_handle,
                        is_positive,
                    },
                );
            if is_positive {
                retroactive = register_positive(&mut state, &task.name, &task);
                None
            } else {
                register_negative(&mut state, &task.name, &task)
            }
        };

        // The first positive-priority task registered while negatives
        // already exist creates the sentinel after those negatives were
        // already dispatched with `wait_on: None`; wire them to it now,
        // mirroring the original scheduler's retroactive `depends_on`.
        if let Some((sentinel, already_dispatched_negatives)) = retroactive {
            let mut pending = self.inner.pending.lock().expect("scheduler pending poisoned");
            for negative_task in already_dispatched_negatives {
                if let Some(entry) = pending.get_mut(&negative_task) {
                    entry.wait_on = Some(sentinel.clone());
                }
            }
        }

        {
            let mut pending = self.inner.pending.lock().expect("scheduler pending poisoned");
            pending.insert(
                task.clone(),
                PendingDispatch {
                    invocation: SolverInvocation { program, args },
                    input,
                    cancel_token,
                    wait_on,
                },
            );
        }

        {
            let mut queue = self.inner.queue.lock().expect("scheduler queue poisoned");
            queue.push(
                task,
                PriorityKey::new(entity_priority, solve_order_index, dependency_order),
            );
        }
        self.inner.notify.notify_one();
    }

    /// Cancels every still-unfinished task under `tasks[name]` and
    /// discards the entity's dispatch sets.
    pub fn cancel_proof_tasks(&self, name: &Name, already_solved: bool, abandoned: bool) {
        let mut state = self.inner.dispatch.lock().expect("scheduler state poisoned");
        if let Some(bucket) = state.running.remove(name) {
            let signal = CancelSignal {
                already_solved,
                abandoned,
            };
            for (_, entry) in bucket {
                entry.cancel.cancel(signal);
            }
        }
        state.positive.remove(name);
        state.negative.remove(name);
        state.sentinel_controllers.remove(name);
        state.sentinels.remove(name);
    }

    /// Applies a `ProofStatusEvent` from a solver task: persists the
    /// status transition with the require set spec.md §4.8 lists, and on
    /// `pass`/`fail` cancels the entity's other tasks and schedules a
    /// debounced usefulness recompute. `already_solved` does not suppress
    /// the write — a sibling that loses the race still needs its own row
    /// to read `abandoned` rather than sit at `scheduled` forever.
    pub fn handle_event(&self, event: ProofStatusEvent) -> Result<(), SchedulerError> {
        if event.status == Status::Running {
            if let Some(previous) = self
                .inner
                .store
                .change_status(&event.task, Status::Running, Some(&[Status::Scheduled]))?
            {
                tracing::warn!(task = %event.task, from = %previous, "unexpected transition to running, ignoring");
            }
            return Ok(());
        }

        let require: &[Status] = match event.status {
            Status::Abandoned | Status::Pending => {
                &[Status::Pending, Status::Scheduled, Status::Running]
            }
            _ => &[Status::Running],
        };
        if let Some(previous) = self
            .inner
            .store
            .change_status(&event.task, event.status, Some(require))?
        {
            if !event.already_solved {
                tracing::warn!(task = %event.task, from = %previous, to = %event.status, "unexpected status transition, ignoring");
            }
        }

        self.finish_task(&event.task);

        if matches!(event.status, Status::Pass | Status::Fail) {
            // The entity is settled for good, so its other solvers are not
            // "still worth retrying" (`pending`) but permanently given up
            // on (`abandoned`).
            self.cancel_proof_tasks(&event.task.name, true, true);
            self.schedule_usefulness_recompute();
        }

        Ok(())
    }

    fn finish_task(&self, task: &Task) {
        let mut state = self.inner.dispatch.lock().expect("scheduler state poisoned");
        let is_positive = state
            .running
            .get_mut(&task.name)
            .and_then(|bucket| bucket.remove(task))
            .map(|entry| entry.is_positive)
            .unwrap_or(false);
        if state.running.get(&task.name).is_some_and(|b| b.is_empty()) {
            state.running.remove(&task.name);
        }
        if is_positive {
            if let Some(ctrl) = state.sentinel_controllers.get_mut(&task.name) {
                ctrl.resolve_one();
            }
        }
    }

    fn schedule_usefulness_recompute(&self) {
        let inner = self.inner.clone();
        let snapshot = {
            let state = inner.dispatch.lock().expect("scheduler state poisoned");
            state.status_ticks
        };
        tokio::spawn(async move {
            let proceed = {
                let mut state = inner.dispatch.lock().expect("scheduler state poisoned");
                if state.status_ticks != snapshot {
                    false
                } else {
                    state.status_ticks += 1;
                    true
                }
            };
            if !proceed {
                return;
            }
            let stale = inner.oracle.unreachable_non_useful().await;
            for name in stale {
                cancel_via_inner(&inner, &name, false, true);
            }
        });
    }
}

fn cancel_via_inner(inner: &Inner, name: &Name, already_solved: bool, abandoned: bool) {
    let mut state = inner.dispatch.lock().expect("scheduler state poisoned");
    if let Some(bucket) = state.running.remove(name) {
        let signal = CancelSignal {
            already_solved,
            abandoned,
        };
        for (_, entry) in bucket {
            entry.cancel.cancel(signal);
        }
    }
    state.positive.remove(name);
    state.negative.remove(name);
    state.sentinel_controllers.remove(name);
    state.sentinels.remove(name);
}

/// Registers a positive-priority task, returning `Some((sentinel,
/// negatives))` when this call just created the sentinel for `name` (the
/// first positive to appear while negatives were already dispatched
/// ungated): the caller must then retroactively wire each already-pending
/// negative task to that sentinel.
fn register_positive(state: &mut DispatchState, name: &Name, task: &Task) -> Option<(Sentinel, Vec<Task>)> {
    let mut created = None;
    if !state.negative.get(name).is_none_or(|v| v.is_empty()) {
        if !state.positive.get(name).is_none_or(|v| v.is_empty()) {
            if let Some(ctrl) = state.sentinel_controllers.get_mut(name) {
                ctrl.add_dependency();
            }
        } else {
            let (ctrl, sentinel) = SentinelController::new(1);
            state.sentinel_controllers.insert(name.clone(), ctrl);
            state.sentinels.insert(name.clone(), sentinel.clone());
            let already_dispatched_negatives = state.negative.get(name).cloned().unwrap_or_default();
            created = Some((sentinel, already_dispatched_negatives));
        }
    }
    state.positive.entry(name.clone()).or_default().push(task.clone());
    created
}

fn register_negative(state: &mut DispatchState, name: &Name, task: &Task) -> Option<Sentinel> {
    let wait_on = if !state.positive.get(name).is_none_or(|v| v.is_empty()) {
        if state.negative.get(name).is_none_or(|v| v.is_empty()) {
            let positives_count = state.positive.get(name).map_or(0, |v| v.len());
            let (ctrl, sentinel) = SentinelController::new(positives_count);
            state.sentinel_controllers.insert(name.clone(), ctrl);
            state.sentinels.insert(name.clone(), sentinel.clone());
            Some(sentinel)
        } else {
            state.sentinels.get(name).cloned()
        }
    } else {
        None
    };
    state.negative.entry(name.clone()).or_default().push(task.clone());
    wait_on
}

fn split_solver_command(solver: &str) -> (String, Vec<String>) {
    let mut parts = shlex::split(solver).unwrap_or_default();
    if parts.is_empty() {
        return (solver.to_string(), Vec::new());
    }
    let program = parts.remove(0);
    (program, parts)
}

fn sanitize_component(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

fn spawn_pump(inner: Arc<Inner>) {
    tokio::spawn(async move {
        loop {
            let task = {
                let mut queue = inner.queue.lock().expect("scheduler queue poisoned");
                queue.pop()
            };
            let task = match task {
                Some(task) => task,
                None => {
                    inner.notify.notified().await;
                    continue;
                }
            };

            let pending = {
                let mut pendings = inner.pending.lock().expect("scheduler pending poisoned");
                pendings.remove(&task)
            };
            let pending = match pending {
                Some(pending) => pending,
                None => continue,
            };

            let lease = inner.lease.clone();
            // Keyed on the task's own solver string (sanitized), not the
            // resolved program: two solvers that happen to invoke the same
            // binary with different arguments (`sby smtbmc` vs `sby z3`)
            // still need distinct working directories under the same entity.
            let task_dir = inner
                .tasks_dir
                .join(task.name.filename())
                .join(sanitize_component(&task.solver));
            let events_tx = inner.events_tx.clone();

            tokio::spawn(async move {
                if let Some(sentinel) = pending.wait_on {
                    sentinel.wait().await;
                }
                let events_for_running = events_tx.clone();
                let task_for_running = task.clone();
                let on_running = move || {
                    let _ = events_for_running.send(ProofStatusEvent {
                        task: task_for_running.clone(),
                        status: Status::Running,
                        already_solved: false,
                    });
                };
                let event = run_solver_task(
                    task,
                    pending.invocation,
                    pending.input,
                    task_dir,
                    lease,
                    pending.cancel_token,
                    on_running,
                )
                .await;
                let _ = events_tx.send(event);
            });
        }
    });
}
