#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("status store error: {0}")]
    Store(#[from] ivy_store::StoreError),

    #[error("solver command {0:?} has no program")]
    EmptySolverCommand(String),
}
