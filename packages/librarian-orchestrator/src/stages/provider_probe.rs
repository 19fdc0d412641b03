use async_trait::async_trait;
use tracing::warn;

use crate::error::{OrchestratorError, Result};
use crate::job::StageId;
use crate::pipeline::{StageContext, StageHandler, StageInput, StageMetrics, StageOutput};
use librarian_core::ports::{ChatMessage, ChatRequest, EmbedRequest};

/// Confirms the chat and embedding providers are reachable before the run
/// commits to a full parse pass. A dead provider here fails the job
/// immediately instead of after file enumeration has already run.
pub struct ProviderProbeStage;

#[async_trait]
impl StageHandler for ProviderProbeStage {
    fn stage_id(&self) -> StageId {
        StageId::ProviderProbe
    }

    async fn execute(&self, _input: StageInput, ctx: &mut StageContext) -> Result<StageOutput> {
        let chat_request = ChatRequest {
            provider: "probe".to_string(),
            model_id: "probe".to_string(),
            messages: vec![ChatMessage::user("ping")],
            max_tokens: 4,
        };
        ctx.chat.chat(chat_request).await.map_err(|e| {
            warn!(%e, "chat provider probe failed");
            OrchestratorError::ProviderUnavailable(format!("chat: {e}"))
        })?;

        let embed_request = EmbedRequest { model_id: "probe".to_string(), texts: vec!["ping".to_string()] };
        ctx.embed.embed(embed_request).await.map_err(|e| {
            warn!(%e, "embed provider probe failed");
            OrchestratorError::ProviderUnavailable(format!("embed: {e}"))
        })?;

        Ok(StageOutput {
            cache_data: vec![1],
            metrics: StageMetrics { files_processed: 0, entities_generated: 0, partial_count: 0, duration_ms: 0, errors: vec![] },
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
    use librarian_core::ports::{EchoChatPort, GitHistory, HashEmbedPort, StaticParserRegistry, UnavailableChatPort};
    use librarian_storage::SqliteLibrarianStore;
    use std::collections::HashMap;
    use std::path::PathBuf;
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

    async fn ctx_with_chat(chat: Arc<dyn librarian_core::ports::ChatPort>) -> StageContext {
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
            chat,
            embed: Arc::new(HashEmbedPort),
            git: Arc::new(NullGit),
            governor: Governor::new(BudgetLimits::unlimited()),
        }
    }

    fn empty_input() -> StageInput {
        StageInput {
            files: vec![PathBuf::new(); 0],
            cache: HashMap::new(),
            config: Default::default(),
            incremental: false,
            changed_files: None,
        }
    }

    #[tokio::test]
    async fn probe_succeeds_when_both_providers_answer() {
        let stage = ProviderProbeStage;
        let mut ctx = ctx_with_chat(Arc::new(EchoChatPort)).await;
        let result = stage.execute(empty_input(), &mut ctx).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn probe_fails_fast_when_the_chat_provider_is_unavailable() {
        let stage = ProviderProbeStage;
        let mut ctx = ctx_with_chat(Arc::new(UnavailableChatPort)).await;
        let result = stage.execute(empty_input(), &mut ctx).await;
        assert!(result.is_err());
    }
}
