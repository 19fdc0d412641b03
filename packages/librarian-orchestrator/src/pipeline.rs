use crate::checkpoint::CheckpointManager;
use crate::dag::CacheKeyManager;
use crate::error::Result;
use crate::job::StageId;
use async_trait::async_trait;
use librarian_core::governor::Governor;
use librarian_core::ports::{ChatPort, EmbedPort, GitHistory, ParserRegistry};
use librarian_storage::domain::LibrarianStore;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Shared dependencies and per-job identity passed to every stage handler.
#[derive(Clone)]
pub struct StageContext {
    pub job_id: Uuid,
    pub workspace_id: String,
    pub run_id: String,
    pub cache_keys: CacheKeyManager,
    pub checkpoint_mgr: Arc<CheckpointManager>,
    /// Changed files, when the run is an incremental bootstrap.
    pub changed_files: Option<HashSet<PathBuf>>,
    pub previous_run_id: Option<String>,

    pub store: Arc<dyn LibrarianStore>,
    pub parser_registry: Arc<dyn ParserRegistry>,
    pub chat: Arc<dyn ChatPort>,
    pub embed: Arc<dyn EmbedPort>,
    pub git: Arc<dyn GitHistory>,
    pub governor: Governor,
}

/// Tunable knobs for a stage's internal batching/concurrency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    pub parallel_workers: usize,
    pub batch_size: usize,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            parallel_workers: num_cpus::get() * 3 / 4,
            batch_size: 100,
        }
    }
}

pub struct StageInput {
    /// Every file in the workspace (full bootstrap) or just the affected
    /// subset (incremental bootstrap).
    pub files: Vec<PathBuf>,
    /// Serialized outputs from dependency stages, keyed by cache key.
    pub cache: HashMap<String, Vec<u8>>,
    pub config: StageConfig,
    pub incremental: bool,
    pub changed_files: Option<HashSet<PathBuf>>,
}

pub struct StageOutput {
    pub cache_data: Vec<u8>,
    pub metrics: StageMetrics,
}

/// Per-stage counters surfaced in the run report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageMetrics {
    pub files_processed: usize,
    pub entities_generated: usize,
    pub partial_count: usize,
    pub duration_ms: u64,
    pub errors: Vec<String>,
}

/// One of the six bootstrap steps: provider probe, file enumeration, parse
/// & insert, embed, generate knowledge, report.
#[async_trait]
pub trait StageHandler: Send + Sync {
    fn stage_id(&self) -> StageId;

    /// Whether this stage's cached output is still valid and execution can
    /// be skipped entirely (e.g. every input file's content hash matches
    /// the last checkpoint).
    async fn can_skip(&self, _ctx: &StageContext) -> bool {
        false
    }

    async fn execute(&self, input: StageInput, ctx: &mut StageContext) -> Result<StageOutput>;

    fn required_cache_keys(&self, _ctx: &StageContext) -> Vec<String> {
        vec![]
    }

    fn output_cache_key(&self, ctx: &StageContext) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use librarian_core::ports::{EchoChatPort, HashEmbedPort, StaticParserRegistry};
    use librarian_storage::SqliteLibrarianStore;

    #[test]
    fn stage_config_default_has_positive_workers() {
        let config = StageConfig::default();
        assert!(config.parallel_workers > 0);
        assert_eq!(config.batch_size, 100);
    }

    #[test]
    fn stage_metrics_default_is_zeroed() {
        let metrics = StageMetrics::default();
        assert_eq!(metrics.files_processed, 0);
        assert_eq!(metrics.entities_generated, 0);
        assert_eq!(metrics.errors.len(), 0);
    }

    struct NullGit;
    impl GitHistory for NullGit {
        fn churn(&self, _path: &str) -> librarian_core::Result<librarian_core::ports::ChurnMetrics> {
            Ok(Default::default())
        }
        fn contributors(&self, _path: &str) -> librarian_core::Result<Vec<librarian_core::ports::AuthorContribution>> {
            Ok(Vec::new())
        }
        fn cochanged_files(&self, _path: &str) -> librarian_core::Result<Vec<(String, u32)>> {
            Ok(Vec::new())
        }
    }

    struct MockStage {
        id: StageId,
    }

    #[async_trait]
    impl StageHandler for MockStage {
        fn stage_id(&self) -> StageId {
            self.id
        }

        async fn execute(&self, input: StageInput, _ctx: &mut StageContext) -> Result<StageOutput> {
            Ok(StageOutput {
                cache_data: vec![1, 2, 3],
                metrics: StageMetrics {
                    files_processed: input.files.len(),
                    entities_generated: 10,
                    partial_count: 1,
                    duration_ms: 100,
                    errors: vec![],
                },
            })
        }

        fn output_cache_key(&self, ctx: &StageContext) -> String {
            ctx.cache_keys.key_for_stage(self.id)
        }
    }

    async fn test_ctx() -> StageContext {
        let store = Arc::new(SqliteLibrarianStore::in_memory().await.unwrap());
        StageContext {
            job_id: Uuid::new_v4(),
            workspace_id: "ws1".to_string(),
            run_id: "run1".to_string(),
            cache_keys: CacheKeyManager::new("ws1".to_string(), "run1".to_string()),
            checkpoint_mgr: Arc::new(CheckpointManager::new_in_memory()),
            changed_files: None,
            previous_run_id: None,
            store,
            parser_registry: Arc::new(StaticParserRegistry),
            chat: Arc::new(EchoChatPort),
            embed: Arc::new(HashEmbedPort),
            git: Arc::new(NullGit),
            governor: Governor::new(librarian_core::governor::BudgetLimits::unlimited()),
        }
    }

    #[tokio::test]
    async fn mock_stage_reports_files_processed_and_entities_generated() {
        let stage = MockStage { id: StageId::ParseAndInsert };
        let mut ctx = test_ctx().await;

        let input = StageInput {
            files: vec![PathBuf::from("a.py")],
            cache: HashMap::new(),
            config: StageConfig::default(),
            incremental: false,
            changed_files: None,
        };

        let output = stage.execute(input, &mut ctx).await.unwrap();
        assert_eq!(output.metrics.files_processed, 1);
        assert_eq!(output.metrics.entities_generated, 10);
        assert_eq!(output.cache_data, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn stage_output_cache_key_is_scoped_by_stage_and_run() {
        let stage = MockStage { id: StageId::ParseAndInsert };
        let ctx = test_ctx().await;
        assert_eq!(stage.output_cache_key(&ctx), "parse_and_insert:ws1:run1");
    }
}
