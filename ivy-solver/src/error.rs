#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("failed to write solver input file {0}: {1}")]
    WriteInput(std::path::PathBuf, std::io::Error),

    #[error("failed to spawn solver process {0:?}: {1}")]
    Spawn(String, std::io::Error),

    #[error("failed waiting on solver process: {0}")]
    Wait(std::io::Error),
}
