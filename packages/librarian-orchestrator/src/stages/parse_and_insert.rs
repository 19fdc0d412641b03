use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::Result;
use crate::job::StageId;
use crate::pipeline::{StageContext, StageHandler, StageInput, StageMetrics, StageOutput};
use librarian_core::model::{content_hash, File};
use librarian_core::ports::Language;
use librarian_storage::domain::FileReplacement;

/// Parses every file queued by file enumeration and replaces its functions,
/// modules and outgoing edges in storage, one transaction per file.
pub struct ParseAndInsertStage;

#[async_trait]
impl StageHandler for ParseAndInsertStage {
    fn stage_id(&self) -> StageId {
        StageId::ParseAndInsert
    }

    fn required_cache_keys(&self, ctx: &StageContext) -> Vec<String> {
        vec![ctx.cache_keys.key_for_stage(StageId::FileEnumeration)]
    }

    async fn execute(&self, input: StageInput, ctx: &mut StageContext) -> Result<StageOutput> {
        let enumeration_key = ctx.cache_keys.key_for_stage(StageId::FileEnumeration);
        let to_index: Vec<PathBuf> = match input.cache.get(&enumeration_key) {
            Some(bytes) => bincode::deserialize(bytes).map_err(crate::error::OrchestratorError::Bincode)?,
            None => input.files.clone(),
        };

        let mut entities_generated = 0;
        let mut errors = Vec::new();
        let mut indexed_paths = Vec::new();

        for path in &to_index {
            let content = match std::fs::read_to_string(path) {
                Ok(c) => c,
                Err(e) => {
                    errors.push(format!("{}: {e}", path.display()));
                    continue;
                }
            };

            let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            let language = Language::from_extension(extension);
            if !ctx.parser_registry.supports(language) {
                continue;
            }

            let path_str = path.to_string_lossy().to_string();
            let hash = content_hash(&[&content]);
            let file = File::new(&path_str, &hash, format!("{language:?}").to_lowercase());

            let parsed = match ctx.parser_registry.parse(&file, &content).await {
                Ok(p) => p,
                Err(e) => {
                    errors.push(format!("{}: {e}", path.display()));
                    continue;
                }
            };

            entities_generated += parsed.functions.len() + parsed.modules.len();

            ctx.store
                .replace_file(FileReplacement { file, functions: parsed.functions, modules: parsed.modules, edges: parsed.edges })
                .await?;

            indexed_paths.push(path_str);
        }

        let cache_data = bincode::serialize(&indexed_paths).map_err(crate::error::OrchestratorError::Bincode)?;

        Ok(StageOutput {
            cache_data,
            metrics: StageMetrics {
                files_processed: to_index.len(),
                entities_generated,
                partial_count: 0,
                duration_ms: 0,
                errors,
            },
        })
    }

    fn output_cache_key(&self, ctx: &StageContext) -> String {
        ctx.cache_keys.key_for_stage(self.stage_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::CheckpointManager;
    use crate::dag::CacheKeyManager;
    use librarian_core::governor::{BudgetLimits, Governor};
    use librarian_core::ports::{EchoChatPort, GitHistory, HashEmbedPort, StaticParserRegistry};
    use librarian_storage::SqliteLibrarianStore;
    use std::collections::HashMap;
    use std::sync::Arc;
    use uuid::Uuid;

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

    async fn test_ctx() -> StageContext {
        StageContext {
            job_id: Uuid::new_v4(),
            workspace_id: "ws1".to_string(),
            run_id: "run1".to_string(),
            cache_keys: CacheKeyManager::new("ws1".to_string(), "run1".to_string()),
            checkpoint_mgr: Arc::new(CheckpointManager::new_in_memory()),
            changed_files: None,
            previous_run_id: None,
            store: Arc::new(SqliteLibrarianStore::in_memory().await.unwrap()),
            parser_registry: Arc::new(StaticParserRegistry),
            chat: Arc::new(EchoChatPort),
            embed: Arc::new(HashEmbedPort),
            git: Arc::new(NullGit),
            governor: Governor::new(BudgetLimits::unlimited()),
        }
    }

    #[tokio::test]
    async fn parsing_a_file_inserts_its_function_into_storage() {
        let dir = std::env::temp_dir().join(format!("librarian-parse-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let file_path = dir.join("a.py");
        std::fs::write(&file_path, "def foo():\n    pass\n").unwrap();

        let stage = ParseAndInsertStage;
        let mut ctx = test_ctx().await;
        let input = StageInput {
            files: vec![file_path.clone()],
            cache: HashMap::new(),
            config: Default::default(),
            incremental: false,
            changed_files: None,
        };

        let output = stage.execute(input, &mut ctx).await.unwrap();

        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(output.metrics.entities_generated, 1);
        let stored = ctx.store.functions_in_file(&file_path.to_string_lossy()).await.unwrap();
        assert_eq!(stored.len(), 1);
    }
}
