use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Error kinds surfaced by the core (generator, governor, ports, evidence).
///
/// Only transient provider errors are retried locally; everything else is
/// surfaced to the caller.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("budget exhausted: tightest constraint was {constraint}")]
    BudgetExhausted { constraint: String },

    #[error("timeout in phase {phase}: {message}")]
    Timeout { phase: String, message: String },

    #[error("unverified by trace: {0}")]
    UnverifiedByTrace(String),

    #[error("partial generation: {0} of {1} sections completed")]
    PartialGeneration(usize, usize),

    #[error("invalid signature for {0}: {1}")]
    Parse(String, String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    pub fn provider_unavailable(name: impl Into<String>) -> Self {
        Self::ProviderUnavailable(name.into())
    }
}
