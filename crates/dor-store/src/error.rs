use thiserror::Error;

/// Errors from content collaborator operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested location key has no content.
    #[error("no content at location key: {0}")]
    NotFound(String),

    /// A URL could not be fetched.
    #[error("failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    /// The staging area rejected a deposit.
    #[error("staging failed: {0}")]
    StagingFailed(String),

    /// I/O error from an underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for collaborator operations.
pub type StoreResult<T> = Result<T, StoreError>;
