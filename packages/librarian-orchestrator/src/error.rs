use thiserror::Error;

use crate::job::StageId;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// An LLM or embedding port was required but unavailable. Not
    /// recoverable locally; propagated as-is.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("storage error: {0}")]
    Storage(#[from] librarian_storage::StorageError),

    /// Covers budget exhaustion, partial generation and every other
    /// generator-level failure; the governor and generators already raise
    /// these as `CoreError`, so the orchestrator forwards rather than
    /// re-declaring them.
    #[error("core error: {0}")]
    Core(#[from] librarian_core::CoreError),

    /// A stage's deadline was exceeded; any results already produced by
    /// that stage are preserved where possible.
    #[error("timeout: {0}")]
    Timeout(String),

    /// A stage failed outright, carrying the stage that actually raised it
    /// so callers never have to reconstruct it from message text.
    #[error("stage {stage} failed: {message}")]
    StageExecutionFailed { stage: StageId, message: String },

    #[error("invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("stage not found: {0}")]
    StageNotFound(String),

    #[error("checkpoint not found: {0}")]
    CheckpointNotFound(String),

    #[error("dag cycle detected")]
    DagCycleDetected,

    #[error("missing dependency: {0}")]
    MissingDependency(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bincode error: {0}")]
    Bincode(#[from] Box<bincode::ErrorKind>),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl OrchestratorError {
    pub fn serialization<E: std::fmt::Display>(e: E) -> Self {
        Self::Serialization(e.to_string())
    }

    pub fn parse<E: std::fmt::Display>(e: E) -> Self {
        Self::Parse(e.to_string())
    }

    pub fn config<E: std::fmt::Display>(e: E) -> Self {
        Self::Config(e.to_string())
    }

    /// The stage a `StageExecutionFailed` error was raised from, if this
    /// error carries one.
    pub fn failed_stage(&self) -> Option<StageId> {
        match self {
            OrchestratorError::StageExecutionFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Whether local, bounded retry is worth attempting. Per the error
/// handling policy, only transient provider errors get a second try;
/// everything else is surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Retryability {
    Retryable,
    Permanent,
}

impl Retryability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Retryability::Retryable => "retryable",
            Retryability::Permanent => "permanent",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "retryable" => Ok(Retryability::Retryable),
            "permanent" => Ok(Retryability::Permanent),
            _ => Err(OrchestratorError::parse(format!("invalid retryability: {s}"))),
        }
    }

    /// Classifies an orchestrator error by the error-handling policy:
    /// provider unavailability, timeouts and storage hiccups get a bounded
    /// retry; everything else (budget exhaustion, bad input, stage logic
    /// failures) is permanent.
    pub fn classify(error: &OrchestratorError) -> Self {
        match error {
            OrchestratorError::ProviderUnavailable(_) | OrchestratorError::Timeout(_) | OrchestratorError::Storage(_) | OrchestratorError::Database(_) => {
                Retryability::Retryable
            }
            OrchestratorError::Core(core) => match core {
                librarian_core::CoreError::ProviderUnavailable(_) | librarian_core::CoreError::Timeout { .. } => Retryability::Retryable,
                _ => Retryability::Permanent,
            },
            _ => Retryability::Permanent,
        }
    }
}

impl std::fmt::Display for Retryability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_roundtrips_through_its_string_form() {
        for r in [Retryability::Retryable, Retryability::Permanent] {
            assert_eq!(Retryability::from_str(r.as_str()).unwrap(), r);
        }
    }

    #[test]
    fn invalid_retryability_string_is_rejected() {
        assert!(Retryability::from_str("unknown").is_err());
    }

    #[test]
    fn provider_unavailable_and_timeout_are_retryable() {
        assert_eq!(Retryability::classify(&OrchestratorError::ProviderUnavailable("llm".to_string())), Retryability::Retryable);
        assert_eq!(Retryability::classify(&OrchestratorError::Timeout("embed".to_string())), Retryability::Retryable);
    }

    #[test]
    fn parse_failures_are_permanent() {
        assert_eq!(Retryability::classify(&OrchestratorError::Parse("bad syntax".to_string())), Retryability::Permanent);
    }

    #[test]
    fn budget_exhaustion_forwarded_from_core_is_permanent_but_a_core_provider_outage_is_retryable() {
        let budget = OrchestratorError::Core(librarian_core::CoreError::BudgetExhausted { constraint: "tokens".to_string() });
        assert_eq!(Retryability::classify(&budget), Retryability::Permanent);

        let outage = OrchestratorError::Core(librarian_core::CoreError::ProviderUnavailable("llm".to_string()));
        assert_eq!(Retryability::classify(&outage), Retryability::Retryable);
    }

    #[test]
    fn stage_execution_failed_carries_its_stage() {
        let err = OrchestratorError::StageExecutionFailed { stage: StageId::Embed, message: "boom".to_string() };
        assert_eq!(err.failed_stage(), Some(StageId::Embed));
        assert_eq!(OrchestratorError::DagCycleDetected.failed_stage(), None);
    }
}
