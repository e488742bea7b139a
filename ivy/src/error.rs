//! Top-level error type for the orchestrator binary. Each variant wraps a
//! lower crate's local error, matching the way `raiko2`'s binary collects
//! `HostError`/`TaskManagerError` into one enum at the outer layer before
//! `main` maps it to an exit code.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum IvyError {
    #[error(transparent)]
    Config(#[from] ivy_config::ConfigError),

    #[error(transparent)]
    Store(#[from] ivy_store::StoreError),

    #[error(transparent)]
    Scheduler(#[from] ivy_scheduler::SchedulerError),

    #[error("failed to read {0}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("failed to parse JSON export {0}: {1}")]
    Json(PathBuf, serde_json::Error),

    #[error("work directory {0:?} already exists, use '-f' to overwrite")]
    WorkDirExists(PathBuf),

    #[error("work directory {0:?} is not initialized, run the 'setup' command first")]
    WorkDirNotInitialized(PathBuf),

    #[error(
        "JSON export not found at {0:?}; run the external synthesis step (yosys -ivy-json-export) first"
    )]
    MissingJsonExport(PathBuf),

    #[error("proof task {0:?} not found")]
    ProofNotFound(String),

    #[error("entity {0} references unknown name {1} from {2}")]
    UnknownReference(String, String, &'static str),
}
