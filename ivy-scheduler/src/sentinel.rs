//! The positive/negative priority sentinel (spec.md §4.8).
//!
//! Grounded directly on the original scheduler's dependency-graph
//! sentinel (`examples/original_source/src/yosys_ivy/solver/__init__.py`'s
//! `dispatch_proof_task`): a sentinel task is created the first time both
//! priority classes are non-empty for an entity, every positive-priority
//! task becomes one of its dependencies, and every negative-priority task
//! depends on it in turn. `SentinelController` is mutated only by the
//! scheduler's single dispatch-state lock; the `Sentinel` handle it hands
//! out is `Clone` and safe to await from inside a spawned task.

use tokio::sync::watch;

#[derive(Debug)]
pub struct SentinelController {
    remaining: usize,
    tx: watch::Sender<bool>,
}

impl SentinelController {
    /// `initial_positive_count` is the number of positive-priority tasks
    /// already dispatched for this entity at the moment both classes
    /// became non-empty; the sentinel depends on all of them.
    pub fn new(initial_positive_count: usize) -> (Self, Sentinel) {
        let (tx, rx) = watch::channel(initial_positive_count == 0);
        (
            Self {
                remaining: initial_positive_count,
                tx,
            },
            Sentinel { rx },
        )
    }

    /// Registers one more positive-priority task the sentinel must wait on.
    pub fn add_dependency(&mut self) {
        self.remaining += 1;
        let _ = self.tx.send(false);
    }

    /// Call when a positive-priority task under this sentinel finishes,
    /// whether it settled or was cancelled.
    pub fn resolve_one(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            let _ = self.tx.send(true);
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sentinel {
    rx: watch::Receiver<bool>,
}

impl Sentinel {
    /// Suspends until every positive-priority task the sentinel depends
    /// on has finished.
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        if *rx.borrow() {
            return;
        }
        let _ = rx.wait_for(|ready| *ready).await;
    }
}
