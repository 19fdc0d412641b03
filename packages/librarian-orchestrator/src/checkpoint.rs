use crate::error::Result;
use crate::job::StageId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// A stage's serialized output, recorded so a failed run can resume
/// without redoing already-completed stages. Keyed by `(workspace_id,
/// run_id)` rather than a job id: a retried job gets a fresh id from
/// `JobStateMachine::retry`, but reuses the same workspace/run pair, so
/// resume has to find checkpoints by the identity that's actually stable
/// across attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: Uuid,
    pub workspace_id: String,
    pub run_id: String,
    pub stage: StageId,
    pub cache_key: String,
    pub cache_data: Vec<u8>,
}

impl Checkpoint {
    pub fn new(workspace_id: impl Into<String>, run_id: impl Into<String>, stage: StageId, cache_key: String, cache_data: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            workspace_id: workspace_id.into(),
            run_id: run_id.into(),
            stage,
            cache_key,
            cache_data,
        }
    }
}

/// In-memory checkpoint store, keyed by workspace/run identity and stage.
pub struct CheckpointManager {
    checkpoints: std::sync::Arc<parking_lot::Mutex<Vec<Checkpoint>>>,
}

impl CheckpointManager {
    pub fn new_in_memory() -> Self {
        Self {
            checkpoints: std::sync::Arc::new(parking_lot::Mutex::new(Vec::new())),
        }
    }

    pub async fn save_checkpoint(&self, checkpoint: Checkpoint) -> Result<()> {
        let mut checkpoints = self.checkpoints.lock();

        checkpoints.retain(|cp| {
            !(cp.workspace_id == checkpoint.workspace_id && cp.run_id == checkpoint.run_id && cp.stage == checkpoint.stage)
        });

        checkpoints.push(checkpoint);
        Ok(())
    }

    pub async fn load_checkpoint(&self, cache_key: &str) -> Result<Option<Vec<u8>>> {
        let checkpoints = self.checkpoints.lock();

        Ok(checkpoints
            .iter()
            .find(|cp| cp.cache_key == cache_key)
            .map(|cp| cp.cache_data.clone()))
    }

    /// Stages already checkpointed for this workspace/run, regardless of
    /// which job attempt produced them.
    pub async fn completed_stages(&self, workspace_id: &str, run_id: &str) -> Result<HashSet<StageId>> {
        let checkpoints = self.checkpoints.lock();

        Ok(checkpoints
            .iter()
            .filter(|cp| cp.workspace_id == workspace_id && cp.run_id == run_id)
            .map(|cp| cp.stage)
            .collect())
    }

    pub async fn delete_run_checkpoints(&self, workspace_id: &str, run_id: &str) -> Result<()> {
        let mut checkpoints = self.checkpoints.lock();
        checkpoints.retain(|cp| !(cp.workspace_id == workspace_id && cp.run_id == run_id));
        Ok(())
    }
}
