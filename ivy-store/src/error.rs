#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("status store error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}
