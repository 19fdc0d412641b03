use async_trait::async_trait;

use crate::error::Result;
use crate::job::StageId;
use crate::pipeline::{StageContext, StageHandler, StageInput, StageMetrics, StageOutput};
use librarian_core::model::{EntityKind, UniversalKnowledgeRecord};
use librarian_core::ports::EmbedRequest;

/// Batch-embeds every function signature and module summary touched by
/// parse & insert, persisting the vector onto that entity's knowledge
/// record ahead of full generation.
pub struct EmbedStage;

#[async_trait]
impl StageHandler for EmbedStage {
    fn stage_id(&self) -> StageId {
        StageId::Embed
    }

    fn required_cache_keys(&self, ctx: &StageContext) -> Vec<String> {
        vec![ctx.cache_keys.key_for_stage(StageId::ParseAndInsert)]
    }

    async fn execute(&self, input: StageInput, ctx: &mut StageContext) -> Result<StageOutput> {
        let insert_key = ctx.cache_keys.key_for_stage(StageId::ParseAndInsert);
        let indexed_paths: Vec<String> = match input.cache.get(&insert_key) {
            Some(bytes) => bincode::deserialize(bytes).map_err(crate::error::OrchestratorError::Bincode)?,
            None => Vec::new(),
        };

        let mut entity_ids = Vec::new();
        let mut entity_hashes = Vec::new();
        let mut entity_kinds = Vec::new();
        let mut texts = Vec::new();

        for path in &indexed_paths {
            for function in ctx.store.functions_in_file(path).await? {
                entity_ids.push(function.id.clone());
                entity_hashes.push(function.hash.clone());
                entity_kinds.push(EntityKind::Function);
                texts.push(format!("{} {}", function.name, function.signature));
            }

            if let Ok(module) = ctx.store.get_module_by_path(path).await {
                let exports = module.exports.iter().cloned().collect::<Vec<_>>().join(", ");
                entity_ids.push(module.id.clone());
                entity_hashes.push(module.identity_hash());
                entity_kinds.push(EntityKind::Module);
                texts.push(format!("{} exports {}", module.path, exports));
            }
        }

        let mut entities_generated = 0;
        let mut errors = Vec::new();

        if !texts.is_empty() {
            let response = ctx
                .embed
                .embed(EmbedRequest { model_id: "bootstrap-embed".to_string(), texts })
                .await;

            match response {
                Ok(response) => {
                    for (((entity_id, hash), kind), vector) in
                        entity_ids.into_iter().zip(entity_hashes).zip(entity_kinds).zip(response.vectors)
                    {
                        let mut record = ctx
                            .store
                            .get_knowledge_record(&entity_id)
                            .await
                            .unwrap_or_else(|_| UniversalKnowledgeRecord::new(&entity_id, kind, &hash));
                        record.embedding = Some(vector);
                        ctx.store.save_knowledge_record(&record).await?;
                        entities_generated += 1;
                    }
                }
                Err(e) => errors.push(format!("embed batch failed: {e}")),
            }
        }

        Ok(StageOutput {
            cache_data: vec![1],
            metrics: StageMetrics {
                files_processed: indexed_paths.len(),
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
