use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueryError>;

/// Error kinds surfaced by the query engine (intent, retrieval, scoring,
/// synthesis, feedback, sessions).
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("storage error: {0}")]
    Storage(#[from] librarian_storage::StorageError),

    #[error("core error: {0}")]
    Core(#[from] librarian_core::CoreError),

    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("unverified by trace: {0}")]
    UnverifiedByTrace(String),

    #[error("context session limit exceeded: {0}")]
    SessionLimitExceeded(String),

    #[error("context session pack cap exceeded: {0}")]
    SessionPackCapExceeded(String),

    #[error("context session not found: {0}")]
    SessionNotFound(String),

    #[error("context session invalid question: {0}")]
    SessionInvalidQuestion(String),

    #[error("timeout: {0}")]
    Timeout(String),
}
