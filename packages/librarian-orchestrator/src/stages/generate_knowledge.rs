use async_trait::async_trait;

use crate::error::Result;
use crate::job::StageId;
use crate::pipeline::{StageContext, StageHandler, StageInput, StageMetrics, StageOutput};
use librarian_core::generator::{GenerationContext, GenerationTarget, Generator};
use librarian_core::model::GenerationOutcome;

/// Runs the full extractor pipeline over every function and module touched
/// by this run, preserving whatever embedding the embed stage already
/// attached since a fresh generation pass discards it.
pub struct GenerateKnowledgeStage;

#[async_trait]
impl StageHandler for GenerateKnowledgeStage {
    fn stage_id(&self) -> StageId {
        StageId::GenerateKnowledge
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

        let generator = Generator::new(Generator::standard_extractors(), librarian_core::defeater::DefeaterRegistry::new(vec![]));
        let generation_ctx = GenerationContext {
            chat: ctx.chat.clone(),
            embed: ctx.embed.clone(),
            git: ctx.git.clone(),
            governor: ctx.governor.clone(),
        };

        let mut targets = Vec::new();
        for path in &indexed_paths {
            for function in ctx.store.functions_in_file(path).await? {
                targets.push(GenerationTarget::Function(function));
            }
            if let Ok(module) = ctx.store.get_module_by_path(path).await {
                targets.push(GenerationTarget::Module(module));
            }
        }

        let mut entities_generated = 0;
        let mut partial_count = 0;
        let mut errors = Vec::new();

        for target in &targets {
            let existing = ctx.store.get_knowledge_record(target.entity_id()).await.ok();
            let mut record = generator.generate(target, &generation_ctx, existing.clone()).await;

            if record.embedding.is_none() {
                record.embedding = existing.and_then(|e| e.embedding);
            }

            match record.outcome {
                GenerationOutcome::Success => entities_generated += 1,
                GenerationOutcome::Partial => partial_count += 1,
                GenerationOutcome::Failure => errors.push(format!("{}: generation failed", target.entity_id())),
            }

            ctx.store.save_knowledge_record(&record).await?;
        }

        Ok(StageOutput {
            cache_data: vec![1],
            metrics: StageMetrics {
                files_processed: indexed_paths.len(),
                entities_generated,
                partial_count,
                duration_ms: 0,
                errors,
            },
        })
    }

    fn output_cache_key(&self, ctx: &StageContext) -> String {
        ctx.cache_keys.key_for_stage(self.stage_id())
    }
}
