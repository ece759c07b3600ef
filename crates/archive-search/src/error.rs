#[derive(Debug, thiserror::Error)]
pub enum SearchSyncError {
    #[error("search backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("search backend returned {status}: {message}")]
    Backend { status: u16, message: String },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
