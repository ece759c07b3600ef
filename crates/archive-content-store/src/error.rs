#[derive(thiserror::Error, Debug)]
pub enum ContentStoreError {
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("object store error: {0}")]
    ObjectStore(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("object already exists: {0}")]
    AlreadyExists(String),
}
