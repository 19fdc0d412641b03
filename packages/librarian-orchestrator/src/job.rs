use crate::error::{OrchestratorError, Result, Retryability};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bootstrap pipeline stage identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageId {
    ProviderProbe,
    FileEnumeration,
    ParseAndInsert,
    Embed,
    GenerateKnowledge,
    Report,
}

impl StageId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::ProviderProbe => "provider_probe",
            StageId::FileEnumeration => "file_enumeration",
            StageId::ParseAndInsert => "parse_and_insert",
            StageId::Embed => "embed",
            StageId::GenerateKnowledge => "generate_knowledge",
            StageId::Report => "report",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "provider_probe" => Ok(StageId::ProviderProbe),
            "file_enumeration" => Ok(StageId::FileEnumeration),
            "parse_and_insert" => Ok(StageId::ParseAndInsert),
            "embed" => Ok(StageId::Embed),
            "generate_knowledge" => Ok(StageId::GenerateKnowledge),
            "report" => Ok(StageId::Report),
            _ => Err(OrchestratorError::parse(format!("invalid stage id: {s}"))),
        }
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Job state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobState {
    Queued {
        queued_at: DateTime<Utc>,
        priority: i32,
    },
    Running {
        started_at: DateTime<Utc>,
        worker_id: String,
        current_stage: StageId,
    },
    Completed {
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        duration_ms: u64,
        files_processed: usize,
    },
    Failed {
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
        error: String,
        retryability: Retryability,
        failed_stage: StageId,
        retry_count: u32,
        next_retry_at: Option<DateTime<Utc>>,
    },
    Cancelled {
        cancelled_at: DateTime<Utc>,
        reason: String,
    },
}

impl JobState {
    pub fn state_name(&self) -> &'static str {
        match self {
            JobState::Queued { .. } => "queued",
            JobState::Running { .. } => "running",
            JobState::Completed { .. } => "completed",
            JobState::Failed { .. } => "failed",
            JobState::Cancelled { .. } => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed { .. } | JobState::Failed { .. } | JobState::Cancelled { .. }
        )
    }
}

/// A bootstrap run over one workspace.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub workspace_id: String,
    pub run_id: String,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub changed_files: Option<std::collections::HashSet<std::path::PathBuf>>,
    pub previous_run_id: Option<String>,
}

impl Job {
    /// A full-rebuild job.
    pub fn new_queued(workspace_id: String, run_id: String, priority: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            run_id,
            state: JobState::Queued { queued_at: now, priority },
            created_at: now,
            updated_at: now,
            changed_files: None,
            previous_run_id: None,
        }
    }

    /// An incremental job that only reindexes `changed_files` and what depends on them.
    pub fn new_incremental(
        workspace_id: String,
        run_id: String,
        priority: i32,
        changed_files: std::collections::HashSet<std::path::PathBuf>,
        previous_run_id: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            run_id,
            state: JobState::Queued { queued_at: now, priority },
            created_at: now,
            updated_at: now,
            changed_files: Some(changed_files),
            previous_run_id: Some(previous_run_id),
        }
    }

    pub fn is_incremental(&self) -> bool {
        self.changed_files.is_some() && self.previous_run_id.is_some()
    }
}

/// Enforces valid `JobState` transitions.
pub struct JobStateMachine {
    job: Job,
}

impl JobStateMachine {
    pub fn new(job: Job) -> Self {
        Self { job }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn into_job(self) -> Job {
        self.job
    }

    pub fn start(&mut self, worker_id: String, current_stage: StageId) -> Result<()> {
        match &self.job.state {
            JobState::Queued { .. } => {
                let now = Utc::now();
                self.job.state = JobState::Running { started_at: now, worker_id, current_stage };
                self.job.updated_at = now;
                Ok(())
            }
            _ => Err(OrchestratorError::InvalidStateTransition {
                from: self.job.state.state_name().to_string(),
                to: "running".to_string(),
            }),
        }
    }

    pub fn complete(&mut self, files_processed: usize) -> Result<()> {
        match &self.job.state {
            JobState::Running { started_at, .. } => {
                let now = Utc::now();
                let duration_ms = (now - *started_at).num_milliseconds() as u64;

                self.job.state = JobState::Completed {
                    started_at: *started_at,
                    completed_at: now,
                    duration_ms,
                    files_processed,
                };
                self.job.updated_at = now;
                Ok(())
            }
            _ => Err(OrchestratorError::InvalidStateTransition {
                from: self.job.state.state_name().to_string(),
                to: "completed".to_string(),
            }),
        }
    }

    pub fn fail(
        &mut self,
        error: String,
        retryability: Retryability,
        failed_stage: StageId,
        retry_count: u32,
    ) -> Result<()> {
        match &self.job.state {
            JobState::Running { started_at, .. } | JobState::Failed { started_at, .. } => {
                let now = Utc::now();

                let next_retry_at = if retry_count < 3 && retryability == Retryability::Retryable {
                    let backoff_secs = 2u64.pow(retry_count);
                    Some(now + chrono::Duration::seconds(backoff_secs as i64))
                } else {
                    None
                };

                self.job.state = JobState::Failed {
                    started_at: *started_at,
                    failed_at: now,
                    error,
                    retryability,
                    failed_stage,
                    retry_count,
                    next_retry_at,
                };
                self.job.updated_at = now;
                Ok(())
            }
            _ => Err(OrchestratorError::InvalidStateTransition {
                from: self.job.state.state_name().to_string(),
                to: "failed".to_string(),
            }),
        }
    }

    pub fn retry(&mut self) -> Result<()> {
        match &self.job.state {
            JobState::Failed { retry_count, next_retry_at, .. } => {
                if next_retry_at.is_none() {
                    return Err(OrchestratorError::Config("no retry scheduled (max retries exceeded)".to_string()));
                }

                let now = Utc::now();
                self.job.state = JobState::Queued { queued_at: now, priority: *retry_count as i32 };
                self.job.updated_at = now;
                Ok(())
            }
            _ => Err(OrchestratorError::InvalidStateTransition {
                from: self.job.state.state_name().to_string(),
                to: "queued (retry)".to_string(),
            }),
        }
    }

    pub fn cancel(&mut self, reason: String) -> Result<()> {
        if self.job.state.is_terminal() {
            return Err(OrchestratorError::InvalidStateTransition {
                from: self.job.state.state_name().to_string(),
                to: "cancelled".to_string(),
            });
        }

        let now = Utc::now();
        self.job.state = JobState::Cancelled { cancelled_at: now, reason };
        self.job.updated_at = now;
        Ok(())
    }

    pub fn update_stage(&mut self, stage: StageId) -> Result<()> {
        match &mut self.job.state {
            JobState::Running { current_stage, .. } => {
                *current_stage = stage;
                self.job.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(OrchestratorError::InvalidStateTransition {
                from: self.job.state.state_name().to_string(),
                to: "update_stage".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_id_roundtrips_through_its_string_form() {
        for stage in [
            StageId::ProviderProbe,
            StageId::FileEnumeration,
            StageId::ParseAndInsert,
            StageId::Embed,
            StageId::GenerateKnowledge,
            StageId::Report,
        ] {
            let s = stage.as_str();
            assert_eq!(stage, StageId::from_str(s).unwrap());
        }
    }

    #[test]
    fn queued_job_transitions_to_running() {
        let job = Job::new_queued("ws-1".to_string(), "run-1".to_string(), 0);
        let mut sm = JobStateMachine::new(job);
        sm.start("worker-1".to_string(), StageId::ProviderProbe).unwrap();
        assert!(matches!(sm.job().state, JobState::Running { .. }));
    }

    #[test]
    fn running_job_transitions_to_completed() {
        let job = Job::new_queued("ws-1".to_string(), "run-1".to_string(), 0);
        let mut sm = JobStateMachine::new(job);
        sm.start("worker-1".to_string(), StageId::ProviderProbe).unwrap();
        sm.complete(100).unwrap();

        match &sm.job().state {
            JobState::Completed { files_processed, .. } => assert_eq!(*files_processed, 100),
            _ => panic!("expected completed state"),
        }
    }

    #[test]
    fn transient_failure_schedules_a_retry() {
        let job = Job::new_queued("ws-1".to_string(), "run-1".to_string(), 0);
        let mut sm = JobStateMachine::new(job);
        sm.start("worker-1".to_string(), StageId::ProviderProbe).unwrap();
        sm.fail("connection reset".to_string(), Retryability::Retryable, StageId::ProviderProbe, 0).unwrap();

        match &sm.job().state {
            JobState::Failed { next_retry_at, .. } => assert!(next_retry_at.is_some()),
            _ => panic!("expected failed state"),
        }
    }

    #[test]
    fn permanent_failure_schedules_no_retry() {
        let job = Job::new_queued("ws-1".to_string(), "run-1".to_string(), 0);
        let mut sm = JobStateMachine::new(job);
        sm.start("worker-1".to_string(), StageId::ProviderProbe).unwrap();
        sm.fail("malformed source file".to_string(), Retryability::Permanent, StageId::ParseAndInsert, 0).unwrap();

        match &sm.job().state {
            JobState::Failed { next_retry_at, .. } => assert!(next_retry_at.is_none()),
            _ => panic!("expected failed state"),
        }
    }

    #[test]
    fn retry_raises_priority_to_the_retry_count() {
        let job = Job::new_queued("ws-1".to_string(), "run-1".to_string(), 0);
        let mut sm = JobStateMachine::new(job);
        sm.start("worker-1".to_string(), StageId::ProviderProbe).unwrap();
        sm.fail("timeout".to_string(), Retryability::Retryable, StageId::ProviderProbe, 1).unwrap();
        sm.retry().unwrap();

        match &sm.job().state {
            JobState::Queued { priority, .. } => assert_eq!(*priority, 1),
            _ => panic!("expected queued state"),
        }
    }

    #[test]
    fn cannot_cancel_a_completed_job() {
        let job = Job::new_queued("ws-1".to_string(), "run-1".to_string(), 0);
        let mut sm = JobStateMachine::new(job);
        sm.start("worker-1".to_string(), StageId::ProviderProbe).unwrap();
        sm.complete(1).unwrap();
        assert!(sm.cancel("too late".to_string()).is_err());
    }

    #[test]
    fn update_stage_advances_the_running_job() {
        let job = Job::new_queued("ws-1".to_string(), "run-1".to_string(), 0);
        let mut sm = JobStateMachine::new(job);
        sm.start("worker-1".to_string(), StageId::ProviderProbe).unwrap();
        sm.update_stage(StageId::FileEnumeration).unwrap();

        match &sm.job().state {
            JobState::Running { current_stage, .. } => assert_eq!(*current_stage, StageId::FileEnumeration),
            _ => panic!("expected running state"),
        }
    }
}
