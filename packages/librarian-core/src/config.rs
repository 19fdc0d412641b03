//! Runtime configuration assembled from environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::governor::{detect_concurrency, BudgetLimits};

/// Configuration preset: a complete default governor profile for a common
/// use case, overridable field-by-field via environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Minimal budget, cheap model bias: quick local iteration.
    Fast,
    /// Balanced budget: the default for interactive use.
    Balanced,
    /// Generous budget, full coverage: CI or a one-off deep audit.
    Thorough,
}

impl Preset {
    pub fn budget_limits(&self) -> BudgetLimits {
        match self {
            Preset::Fast => BudgetLimits {
                tokens_per_file: 2_000,
                tokens_per_phase: 50_000,
                tokens_per_run: 500_000,
                files_per_phase: 5_000,
                wall_time: Duration::from_secs(5 * 60),
                max_retries: 2,
            },
            Preset::Balanced => BudgetLimits {
                tokens_per_file: 8_000,
                tokens_per_phase: 200_000,
                tokens_per_run: 2_000_000,
                files_per_phase: 20_000,
                wall_time: Duration::from_secs(30 * 60),
                max_retries: 3,
            },
            Preset::Thorough => BudgetLimits {
                tokens_per_file: 30_000,
                tokens_per_phase: 1_000_000,
                tokens_per_run: 10_000_000,
                files_per_phase: 100_000,
                wall_time: Duration::from_secs(4 * 60 * 60),
                max_retries: 5,
            },
        }
    }

    pub fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "fast" => Ok(Preset::Fast),
            "balanced" => Ok(Preset::Balanced),
            "thorough" => Ok(Preset::Thorough),
            other => Err(CoreError::Config(format!("unknown preset '{other}'"))),
        }
    }
}

/// Assembled configuration for a bootstrap or query run.
#[derive(Debug, Clone)]
pub struct LibrarianConfig {
    pub llm_provider: String,
    pub llm_model_id: String,
    pub embedding_model_id: String,
    pub preset: Preset,
    pub budget_limits: BudgetLimits,
    pub worker_count: usize,
    pub disable_synthesis: bool,
}

impl LibrarianConfig {
    /// Build from environment variables, defaulting unset values to the
    /// balanced preset running against an auto-detected worker count.
    pub fn from_env() -> Result<Self> {
        let preset = match std::env::var("LIBRARIAN_PRESET") {
            Ok(value) => Preset::from_str(&value)?,
            Err(_) => Preset::Balanced,
        };

        let worker_count = std::env::var("LIBRARIAN_WORKERS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_else(detect_concurrency);

        Ok(Self {
            llm_provider: std::env::var("LIBRARIAN_LLM_PROVIDER").unwrap_or_else(|_| "anthropic".to_string()),
            llm_model_id: std::env::var("LIBRARIAN_LLM_MODEL").unwrap_or_else(|_| "claude-sonnet".to_string()),
            embedding_model_id: std::env::var("LIBRARIAN_EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            budget_limits: preset.budget_limits(),
            preset,
            worker_count,
            disable_synthesis: std::env::var("LIBRARIAN_QUERY_DISABLE_SYNTHESIS").is_ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_parsing_is_case_insensitive() {
        assert_eq!(Preset::from_str("FAST").unwrap(), Preset::Fast);
        assert_eq!(Preset::from_str("Balanced").unwrap(), Preset::Balanced);
    }

    #[test]
    fn unknown_preset_errs() {
        assert!(Preset::from_str("extreme").is_err());
    }

    #[test]
    fn thorough_budget_exceeds_fast() {
        let fast = Preset::Fast.budget_limits();
        let thorough = Preset::Thorough.budget_limits();
        assert!(thorough.tokens_per_run > fast.tokens_per_run);
    }
}
