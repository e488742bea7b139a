//! The job-server lease: a counting semaphore bounding how many solver
//! subprocesses may run concurrently (spec.md §5, the `-j N` flag).

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Clone, Debug)]
pub struct JobLease {
    semaphore: Arc<Semaphore>,
}

impl JobLease {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity.max(1))),
        }
    }

    /// Suspends until a slot is free, then returns a permit that releases
    /// the slot when dropped. This is the task's lease-await suspension
    /// point (spec.md §4.7).
    pub async fn acquire(&self) -> LeasePermit {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("job-server semaphore is never closed");
        LeasePermit { _permit: permit }
    }
}

pub struct LeasePermit {
    _permit: OwnedSemaphorePermit,
}
