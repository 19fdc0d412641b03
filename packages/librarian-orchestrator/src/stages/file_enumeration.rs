use async_trait::async_trait;
use std::path::PathBuf;

use crate::dependency_graph::{compute_affected_files, ReverseDependencyIndex};
use crate::error::Result;
use crate::job::StageId;
use crate::pipeline::{StageContext, StageHandler, StageInput, StageMetrics, StageOutput};
use librarian_core::model::content_hash;
use tracing::info;

/// Hashes every enumerated file's content and records which ones differ
/// from the last indexed hash. On an incremental run the literal changed
/// set is widened through the reverse-import index first, so a file that
/// imports a changed file is reindexed even though its own bytes didn't
/// move.
pub struct FileEnumerationStage;

#[async_trait]
impl StageHandler for FileEnumerationStage {
    fn stage_id(&self) -> StageId {
        StageId::FileEnumeration
    }

    async fn execute(&self, input: StageInput, ctx: &mut StageContext) -> Result<StageOutput> {
        let affected = match &input.changed_files {
            Some(changed) => {
                let mut edges = Vec::new();
                for file in ctx.store.list_files().await.unwrap_or_default() {
                    if let Ok(mut from_file) = ctx.store.edges_from(&file.path).await {
                        edges.append(&mut from_file);
                    }
                }
                let index = ReverseDependencyIndex::from_edges(&edges);
                let widened = compute_affected_files(changed, &index);
                info!(
                    "incremental run: {} changed file(s) widened to {} affected file(s) via the reverse-import index",
                    changed.len(),
                    widened.len()
                );
                Some(widened)
            }
            None => None,
        };

        let mut to_index: Vec<PathBuf> = Vec::new();
        let mut errors = Vec::new();

        for path in &input.files {
            if let Some(affected) = &affected {
                if !affected.contains(path) {
                    continue;
                }
            }

            let content = match std::fs::read_to_string(path) {
                Ok(c) => c,
                Err(e) => {
                    errors.push(format!("{}: {e}", path.display()));
                    continue;
                }
            };
            let hash = content_hash(&[&content]);

            let existing = ctx.store.get_file(&path.to_string_lossy()).await.ok();
            if existing.as_ref().map(|f| f.changed(&hash)).unwrap_or(true) {
                to_index.push(path.clone());
            }
        }

        let cache_data = bincode::serialize(&to_index).map_err(crate::error::OrchestratorError::Bincode)?;

        Ok(StageOutput {
            cache_data,
            metrics: StageMetrics {
                files_processed: input.files.len(),
                entities_generated: 0,
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
