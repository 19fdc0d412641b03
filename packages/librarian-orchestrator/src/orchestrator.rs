use crate::checkpoint::{Checkpoint, CheckpointManager};
use crate::dag::{CacheKeyManager, PipelineDAG, StageNode};
use crate::error::{OrchestratorError, Result, Retryability};
use crate::job::{Job, JobState, JobStateMachine, StageId};
use crate::pipeline::{StageConfig, StageContext, StageHandler, StageInput, StageOutput};
use librarian_core::governor::Governor;
use librarian_core::ports::{ChatPort, EmbedPort, GitHistory, Language, ParserRegistry};
use librarian_storage::domain::LibrarianStore;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Aggregated metrics across every stage of one run.
#[derive(Debug, Clone, Default)]
pub struct PipelineResult {
    pub files_processed: usize,
    pub entities_generated: usize,
    pub partial_count: usize,
    pub duration_ms: u64,
    pub errors: Vec<String>,
}

impl PipelineResult {
    pub fn merge_metrics(&mut self, metrics: &crate::pipeline::StageMetrics) {
        self.files_processed += metrics.files_processed;
        self.entities_generated += metrics.entities_generated;
        self.partial_count += metrics.partial_count;
        self.duration_ms += metrics.duration_ms;
        self.errors.extend(metrics.errors.clone());
    }
}

/// Ports shared by every stage handler a run will execute.
#[derive(Clone)]
pub struct RunPorts {
    pub store: Arc<dyn LibrarianStore>,
    pub parser_registry: Arc<dyn ParserRegistry>,
    pub chat: Arc<dyn ChatPort>,
    pub embed: Arc<dyn EmbedPort>,
    pub git: Arc<dyn GitHistory>,
    pub governor: Governor,
}

/// Drives the six-stage bootstrap DAG to completion for one job, persisting
/// a checkpoint after every stage so a crash resumes without redoing
/// finished work.
pub struct PipelineOrchestrator {
    dag: Arc<PipelineDAG>,
    checkpoint_mgr: Arc<CheckpointManager>,
    stage_handlers: HashMap<StageId, Arc<dyn StageHandler>>,
    worker_id: String,
}

impl PipelineOrchestrator {
    pub fn new(checkpoint_mgr: Arc<CheckpointManager>) -> Result<Self> {
        let dag = PipelineDAG::default_pipeline()?;

        Ok(Self {
            dag: Arc::new(dag),
            checkpoint_mgr,
            stage_handlers: HashMap::new(),
            worker_id: format!("worker-{}", Uuid::new_v4()),
        })
    }

    pub fn with_dag(dag: PipelineDAG, checkpoint_mgr: Arc<CheckpointManager>) -> Self {
        Self {
            dag: Arc::new(dag),
            checkpoint_mgr,
            stage_handlers: HashMap::new(),
            worker_id: format!("worker-{}", Uuid::new_v4()),
        }
    }

    /// Builds the default pipeline with all six bootstrap handlers already
    /// registered, the configuration every caller outside tests wants.
    pub fn with_default_handlers(checkpoint_mgr: Arc<CheckpointManager>) -> Result<Self> {
        let mut orch = Self::new(checkpoint_mgr)?;
        orch.register_handler(Arc::new(crate::stages::ProviderProbeStage));
        orch.register_handler(Arc::new(crate::stages::FileEnumerationStage));
        orch.register_handler(Arc::new(crate::stages::ParseAndInsertStage));
        orch.register_handler(Arc::new(crate::stages::EmbedStage));
        orch.register_handler(Arc::new(crate::stages::GenerateKnowledgeStage));
        orch.register_handler(Arc::new(crate::stages::ReportStage));
        Ok(orch)
    }

    pub fn register_handler(&mut self, handler: Arc<dyn StageHandler>) {
        self.stage_handlers.insert(handler.stage_id(), handler);
    }

    pub async fn execute_job(
        &self,
        mut job: Job,
        workspace_path: PathBuf,
        ports: RunPorts,
    ) -> Result<(Job, PipelineResult)> {
        let job_id = job.id;
        let start_time = Instant::now();

        info!("starting job {} for workspace {} (run: {})", job_id, job.workspace_id, job.run_id);

        let plan = self.dag.execution_plan();
        info!("execution plan:\n{}", plan);

        let mut state_machine = JobStateMachine::new(job);
        state_machine.start(self.worker_id.clone(), StageId::ProviderProbe)?;
        job = state_machine.into_job();

        let completed = self.checkpoint_mgr.completed_stages(&job.workspace_id, &job.run_id).await?;
        if !completed.is_empty() {
            info!("resuming from checkpoint - {} stages already completed: {:?}", completed.len(), completed);
        }

        let result = self
            .run_dag(job_id, &job.workspace_id, &job.run_id, &completed, workspace_path, &job, ports)
            .await;

        let elapsed = start_time.elapsed();

        let final_job = match result {
            Ok(mut pipeline_result) => {
                pipeline_result.duration_ms = elapsed.as_millis() as u64;

                info!(
                    "job {} completed - processed {} files, generated {} entities ({} partial) in {}ms",
                    job_id,
                    pipeline_result.files_processed,
                    pipeline_result.entities_generated,
                    pipeline_result.partial_count,
                    pipeline_result.duration_ms
                );

                let mut sm = JobStateMachine::new(job);
                sm.complete(pipeline_result.files_processed)?;
                let completed_job = sm.into_job();

                self.checkpoint_mgr.delete_run_checkpoints(&completed_job.workspace_id, &completed_job.run_id).await?;

                (completed_job, pipeline_result)
            }
            Err(e) => {
                error!("job {} failed: {}", job_id, e);

                let retryability = Retryability::classify(&e);
                let failed_stage = e.failed_stage().unwrap_or(StageId::ProviderProbe);
                let message = e.to_string();

                let mut sm = JobStateMachine::new(job);
                let retry_count = match &sm.job().state {
                    JobState::Failed { retry_count, .. } => *retry_count + 1,
                    _ => 0,
                };

                sm.fail(message, retryability, failed_stage, retry_count)?;
                let failed_job = sm.into_job();

                let empty_result = PipelineResult { duration_ms: elapsed.as_millis() as u64, ..Default::default() };

                return Ok((failed_job, empty_result));
            }
        };

        Ok(final_job)
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_dag(
        &self,
        job_id: Uuid,
        workspace_id: &str,
        run_id: &str,
        completed: &HashSet<StageId>,
        workspace_path: PathBuf,
        job: &Job,
        ports: RunPorts,
    ) -> Result<PipelineResult> {
        let ctx = StageContext {
            job_id,
            workspace_id: workspace_id.to_string(),
            run_id: run_id.to_string(),
            cache_keys: CacheKeyManager::new(workspace_id.to_string(), run_id.to_string()),
            checkpoint_mgr: self.checkpoint_mgr.clone(),
            changed_files: job.changed_files.clone(),
            previous_run_id: job.previous_run_id.clone(),
            store: ports.store,
            parser_registry: ports.parser_registry,
            chat: ports.chat,
            embed: ports.embed,
            git: ports.git,
            governor: ports.governor,
        };

        if job.is_incremental() {
            info!(
                "job {}: incremental run - {} changed files, previous run: {}",
                job_id,
                job.changed_files.as_ref().unwrap().len(),
                job.previous_run_id.as_ref().unwrap()
            );
        } else {
            info!("job {}: full bootstrap run", job_id);
        }

        let mut overall_result = PipelineResult::default();

        for (phase_idx, parallel_group) in self.dag.execution_order().iter().enumerate() {
            info!(
                "job {}: phase {} - {} stages{}",
                job_id,
                phase_idx + 1,
                parallel_group.len(),
                if parallel_group.len() > 1 { " (parallel)" } else { "" }
            );

            let to_execute: Vec<_> = parallel_group.iter().filter(|id| !completed.contains(id)).copied().collect();

            if to_execute.is_empty() {
                info!("job {}: phase {} already completed, skipping", job_id, phase_idx + 1);
                continue;
            }

            let mut tasks = Vec::new();
            for stage_id in &to_execute {
                let stage = self
                    .dag
                    .get_stage(*stage_id)
                    .ok_or_else(|| OrchestratorError::StageNotFound(format!("{:?}", stage_id)))?;

                let handler = self
                    .stage_handlers
                    .get(stage_id)
                    .ok_or_else(|| OrchestratorError::Config(format!("no handler registered for stage {:?}", stage_id)))?
                    .clone();

                let stage_ctx = ctx.clone();
                let stage_node = stage.clone();
                let workspace_path_clone = workspace_path.clone();

                tasks.push(tokio::spawn(async move {
                    Self::execute_stage(handler, stage_node, stage_ctx, workspace_path_clone).await
                }));
            }

            let results = futures::future::join_all(tasks).await;

            for (i, task_result) in results.into_iter().enumerate() {
                let stage_id = to_execute[i];

                match task_result {
                    Ok(Ok(output)) => {
                        let cache_key = ctx.cache_keys.key_for_stage(stage_id);
                        let checkpoint = Checkpoint::new(workspace_id, run_id, stage_id, cache_key, output.cache_data.clone());

                        self.checkpoint_mgr.save_checkpoint(checkpoint).await?;

                        overall_result.merge_metrics(&output.metrics);

                        info!(
                            "job {}: stage {:?} completed - {} files, {} entities in {}ms",
                            job_id, stage_id, output.metrics.files_processed, output.metrics.entities_generated, output.metrics.duration_ms
                        );
                    }
                    Ok(Err(e)) => {
                        error!("job {}: stage {:?} failed: {}", job_id, stage_id, e);
                        return Err(OrchestratorError::StageExecutionFailed { stage: stage_id, message: e.to_string() });
                    }
                    Err(join_err) => {
                        error!("job {}: stage {:?} panicked: {}", job_id, stage_id, join_err);
                        return Err(OrchestratorError::StageExecutionFailed { stage: stage_id, message: format!("panicked: {join_err}") });
                    }
                }
            }
        }

        Ok(overall_result)
    }

    async fn execute_stage(
        handler: Arc<dyn StageHandler>,
        stage_node: StageNode,
        mut ctx: StageContext,
        workspace_path: PathBuf,
    ) -> Result<StageOutput> {
        let stage_id = stage_node.id;
        info!("executing stage: {} ({:?})", stage_node.name, stage_id);

        if handler.can_skip(&ctx).await {
            info!("stage {:?} skipped (cache hit)", stage_id);
            return Ok(StageOutput { cache_data: vec![], metrics: Default::default() });
        }

        let mut cache = HashMap::new();
        for dep_id in &stage_node.dependencies {
            let cache_key = ctx.cache_keys.key_for_stage(*dep_id);
            if let Some(data) = ctx.checkpoint_mgr.load_checkpoint(&cache_key).await? {
                cache.insert(cache_key.clone(), data);
                info!("loaded dependency cache for {:?} ({} bytes)", dep_id, cache[&cache_key].len());
            } else {
                warn!("missing required cache: {} (dependency {:?})", cache_key, dep_id);
                return Err(OrchestratorError::MissingDependency(format!(
                    "cache not found for dependency {:?}: {}",
                    dep_id, cache_key
                )));
            }
        }

        let files = Self::enumerate_files(&workspace_path)?;
        info!("found {} files to process", files.len());

        let input = StageInput {
            files,
            cache,
            config: StageConfig::default(),
            incremental: ctx.changed_files.is_some(),
            changed_files: ctx.changed_files.clone(),
        };

        let timeout = tokio::time::Duration::from_millis(stage_node.timeout_ms);
        let result = tokio::time::timeout(timeout, handler.execute(input, &mut ctx)).await;

        match result {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(OrchestratorError::Timeout(format!("stage {:?} timed out after {}ms", stage_id, stage_node.timeout_ms))),
        }
    }

    /// Walks the workspace, skipping hidden directories, keeping files
    /// whose extension maps to a recognized language.
    fn enumerate_files(workspace_path: &PathBuf) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        if !workspace_path.exists() {
            return Err(OrchestratorError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("workspace path not found: {}", workspace_path.display()),
            )));
        }

        fn visit_dirs(dir: &PathBuf, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
            if dir.is_dir() {
                for entry in std::fs::read_dir(dir)? {
                    let entry = entry?;
                    let path = entry.path();

                    if path.is_dir() {
                        if let Some(name) = path.file_name() {
                            if name.to_string_lossy().starts_with('.') {
                                continue;
                            }
                        }
                        visit_dirs(&path, files)?;
                    } else if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                        if Language::from_extension(ext) != Language::Other {
                            files.push(path);
                        }
                    }
                }
            }
            Ok(())
        }

        visit_dirs(workspace_path, &mut files)?;
        files.sort();
        Ok(files)
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::StageMetrics;
    use async_trait::async_trait;
    use librarian_core::ports::{EchoChatPort, HashEmbedPort, StaticParserRegistry};
    use librarian_storage::SqliteLibrarianStore;

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

    async fn test_ports() -> RunPorts {
        RunPorts {
            store: Arc::new(SqliteLibrarianStore::in_memory().await.unwrap()),
            parser_registry: Arc::new(StaticParserRegistry),
            chat: Arc::new(EchoChatPort),
            embed: Arc::new(HashEmbedPort),
            git: Arc::new(NullGit),
            governor: Governor::new(librarian_core::governor::BudgetLimits::unlimited()),
        }
    }

    struct MockHandler {
        id: StageId,
        should_fail: bool,
    }

    #[async_trait]
    impl StageHandler for MockHandler {
        fn stage_id(&self) -> StageId {
            self.id
        }

        async fn execute(&self, input: StageInput, _ctx: &mut StageContext) -> Result<StageOutput> {
            if self.should_fail {
                return Err(OrchestratorError::StageExecutionFailed { stage: self.id, message: "mock failure".to_string() });
            }

            tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

            Ok(StageOutput {
                cache_data: bincode::serialize(&input.files).unwrap(),
                metrics: StageMetrics {
                    files_processed: input.files.len(),
                    entities_generated: input.files.len() * 2,
                    partial_count: 0,
                    duration_ms: 10,
                    errors: vec![],
                },
            })
        }

        fn output_cache_key(&self, ctx: &StageContext) -> String {
            ctx.cache_keys.key_for_stage(self.id)
        }
    }

    #[test]
    fn orchestrator_builds_with_the_default_pipeline() {
        let checkpoint_mgr = Arc::new(CheckpointManager::new_in_memory());
        let orch = PipelineOrchestrator::new(checkpoint_mgr);
        assert!(orch.is_ok());
    }

    #[test]
    fn default_handlers_cover_every_stage_in_the_dag() {
        let checkpoint_mgr = Arc::new(CheckpointManager::new_in_memory());
        let orch = PipelineOrchestrator::with_default_handlers(checkpoint_mgr).unwrap();
        for stages in orch.dag.execution_order() {
            for stage_id in stages {
                assert!(orch.stage_handlers.contains_key(stage_id));
            }
        }
    }

    #[test]
    fn a_failed_stage_error_carries_its_own_stage_and_retryability() {
        let err = OrchestratorError::StageExecutionFailed { stage: StageId::Embed, message: "provider unavailable".to_string() };
        assert_eq!(err.failed_stage(), Some(StageId::Embed));
        assert_eq!(Retryability::classify(&err), Retryability::Permanent);

        let timeout = OrchestratorError::Timeout("embed".to_string());
        assert_eq!(Retryability::classify(&timeout), Retryability::Retryable);
    }

    #[tokio::test]
    async fn execute_stage_succeeds_against_an_empty_workspace() {
        let handler = Arc::new(MockHandler { id: StageId::ParseAndInsert, should_fail: false });

        let checkpoint_mgr = Arc::new(CheckpointManager::new_in_memory());
        let ports = test_ports().await;
        let ctx = StageContext {
            job_id: Uuid::new_v4(),
            workspace_id: "test".to_string(),
            run_id: "run1".to_string(),
            cache_keys: CacheKeyManager::new("test".to_string(), "run1".to_string()),
            checkpoint_mgr,
            changed_files: None,
            previous_run_id: None,
            store: ports.store,
            parser_registry: ports.parser_registry,
            chat: ports.chat,
            embed: ports.embed,
            git: ports.git,
            governor: ports.governor,
        };

        let stage_node = StageNode::new(StageId::ParseAndInsert, "Test", vec![], false, 5000);

        let workspace_path = std::env::temp_dir().join(format!("librarian-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&workspace_path).unwrap();

        let result = PipelineOrchestrator::execute_stage(handler, stage_node, ctx, workspace_path.clone()).await;

        std::fs::remove_dir_all(&workspace_path).ok();

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn pipeline_result_merge_sums_every_field() {
        let mut result = PipelineResult::default();

        let metrics = StageMetrics {
            files_processed: 10,
            entities_generated: 100,
            partial_count: 3,
            duration_ms: 1000,
            errors: vec!["error1".to_string()],
        };

        result.merge_metrics(&metrics);

        assert_eq!(result.files_processed, 10);
        assert_eq!(result.entities_generated, 100);
        assert_eq!(result.partial_count, 3);
        assert_eq!(result.duration_ms, 1000);
        assert_eq!(result.errors.len(), 1);
    }
}
