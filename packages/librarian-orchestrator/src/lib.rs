//! Job orchestration for the bootstrap pipeline: a DAG of six stages
//! (provider probe, file enumeration, parse & insert, embed, generate
//! knowledge, report) driven by a resumable job state machine with
//! per-stage checkpointing.

pub mod checkpoint;
pub mod dag;
pub mod dependency_graph;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod pipeline;
pub mod stages;

pub use checkpoint::{Checkpoint, CheckpointManager};
pub use dag::{CacheKeyManager, PipelineDAG, StageNode};
pub use dependency_graph::{compute_affected_files, FileId, ReverseDependencyIndex};
pub use error::{OrchestratorError, Result, Retryability};
pub use job::{Job, JobState, JobStateMachine, StageId};
pub use orchestrator::{PipelineOrchestrator, PipelineResult, RunPorts};
pub use pipeline::{StageConfig, StageContext, StageHandler, StageInput, StageMetrics, StageOutput};
pub use stages::{
    EmbedStage, FileEnumerationStage, GenerateKnowledgeStage, ParseAndInsertStage, ProviderProbeStage, ReportStage,
};
