//! Budget governor: tracks resource usage against configured limits and
//! reports a strategy the generator/orchestrator should throttle to.
//!
//! Mirrors the orchestrator's stage-metrics/checkpoint pattern — a single
//! `parking_lot::Mutex`-guarded critical section recording counters, with a
//! snapshot (`BudgetReport`) emitted for audit the way `StageMetrics` is
//! emitted per stage.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::model::CURRENT_SCHEMA_VERSION;

/// Configured ceilings for the six tracked counters. `0` on any field means
/// unlimited for that counter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BudgetLimits {
    pub tokens_per_file: u64,
    pub tokens_per_phase: u64,
    pub tokens_per_run: u64,
    pub files_per_phase: u64,
    pub wall_time: Duration,
    pub max_retries: u32,
}

impl BudgetLimits {
    pub fn unlimited() -> Self {
        Self {
            tokens_per_file: 0,
            tokens_per_phase: 0,
            tokens_per_run: 0,
            files_per_phase: 0,
            wall_time: Duration::from_secs(0),
            max_retries: 0,
        }
    }
}

/// Strategy the caller should fall back to given the current budget health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Proceed,
    UseCheaperModel,
    BatchAggressive,
    Prioritize,
    UseCache,
    Defer,
}

impl Strategy {
    fn from_health(health: f64) -> Self {
        if health > 0.7 {
            Strategy::Proceed
        } else if health > 0.5 {
            Strategy::UseCheaperModel
        } else if health > 0.3 {
            Strategy::BatchAggressive
        } else if health > 0.1 {
            Strategy::Prioritize
        } else if health > 0.0 {
            Strategy::UseCache
        } else {
            Strategy::Defer
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    tokens_current_file: u64,
    tokens_current_phase: u64,
    tokens_run: u64,
    files_current_phase: u64,
    retries: u32,
}

struct Inner {
    limits: BudgetLimits,
    counters: Counters,
    started_at: Instant,
}

fn utilization(used: u64, limit: u64) -> f64 {
    if limit == 0 {
        0.0
    } else {
        used as f64 / limit as f64
    }
}

/// Thread-safe budget tracker shared across generator workers.
#[derive(Clone)]
pub struct Governor {
    inner: Arc<Mutex<Inner>>,
}

impl Governor {
    pub fn new(limits: BudgetLimits) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                limits,
                counters: Counters::default(),
                started_at: Instant::now(),
            })),
        }
    }

    /// Record tokens spent on the current file/phase/run. Returns the
    /// resulting strategy; the hard ceiling (`health <= -0.5`) is surfaced
    /// as an error rather than a strategy, since nothing below it is safe
    /// to proceed with.
    pub fn record_tokens(&self, n: u64) -> Result<Strategy> {
        let mut inner = self.inner.lock();
        inner.counters.tokens_current_file += n;
        inner.counters.tokens_current_phase += n;
        inner.counters.tokens_run += n;
        self.evaluate(&inner)
    }

    pub fn record_file_started(&self) -> Result<Strategy> {
        let mut inner = self.inner.lock();
        inner.counters.files_current_phase += 1;
        inner.counters.tokens_current_file = 0;
        self.evaluate(&inner)
    }

    pub fn record_retry(&self) -> Result<Strategy> {
        let mut inner = self.inner.lock();
        inner.counters.retries += 1;
        self.evaluate(&inner)
    }

    pub fn begin_phase(&self) {
        let mut inner = self.inner.lock();
        inner.counters.tokens_current_phase = 0;
        inner.counters.files_current_phase = 0;
    }

    fn evaluate(&self, inner: &Inner) -> Result<Strategy> {
        let utilizations = [
            utilization(inner.counters.tokens_current_file, inner.limits.tokens_per_file),
            utilization(inner.counters.tokens_current_phase, inner.limits.tokens_per_phase),
            utilization(inner.counters.tokens_run, inner.limits.tokens_per_run),
            utilization(inner.counters.files_current_phase, inner.limits.files_per_phase),
            utilization(inner.counters.retries as u64, inner.limits.max_retries as u64),
            if inner.limits.wall_time.as_secs() == 0 {
                0.0
            } else {
                inner.started_at.elapsed().as_secs_f64() / inner.limits.wall_time.as_secs_f64()
            },
        ];
        let tightest = utilizations.iter().cloned().fold(0.0_f64, f64::max);
        let health = 1.0 - tightest;

        if health <= -0.5 {
            return Err(CoreError::BudgetExhausted {
                constraint: tightest_constraint_name(&utilizations),
            });
        }
        Ok(Strategy::from_health(health))
    }

    pub fn report(&self, phase: impl Into<String>) -> BudgetReport {
        let inner = self.inner.lock();
        BudgetReport {
            kind: "GovernorBudgetReport.v1".to_string(),
            schema_version: CURRENT_SCHEMA_VERSION,
            phase: phase.into(),
            tokens_run: inner.counters.tokens_run,
            files_current_phase: inner.counters.files_current_phase,
            retries: inner.counters.retries,
            elapsed_seconds: inner.started_at.elapsed().as_secs_f64(),
        }
    }
}

fn tightest_constraint_name(utilizations: &[f64; 6]) -> String {
    let names = [
        "tokens_per_file",
        "tokens_per_phase",
        "tokens_per_run",
        "files_per_phase",
        "max_retries",
        "wall_time",
    ];
    let (idx, _) = utilizations
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .unwrap();
    names[idx].to_string()
}

/// Detect a sensible worker-pool size: CPU cores minus 2 (never below 1,
/// never above 16), matching the orchestrator's `num_cpus`-derived stage
/// concurrency default.
pub fn detect_concurrency() -> usize {
    num_cpus::get().saturating_sub(2).clamp(1, 16)
}

/// A named bucket for the size of the project being indexed, used to scale
/// default governor limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectSizeBucket {
    Small,
    Medium,
    Large,
    Massive,
}

impl ProjectSizeBucket {
    pub fn from_file_count(file_count: usize) -> Self {
        match file_count {
            0..=100 => ProjectSizeBucket::Small,
            101..=1_000 => ProjectSizeBucket::Medium,
            1_001..=10_000 => ProjectSizeBucket::Large,
            _ => ProjectSizeBucket::Massive,
        }
    }
}

/// Audit-trail snapshot of governor state, written under
/// `state/audits/librarian/governor/<timestamp>/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetReport {
    pub kind: String,
    pub schema_version: u32,
    pub phase: String,
    pub tokens_run: u64,
    pub files_current_phase: u64,
    pub retries: u32,
    pub elapsed_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_limit_means_unlimited() {
        let governor = Governor::new(BudgetLimits::unlimited());
        let strategy = governor.record_tokens(1_000_000).unwrap();
        assert_eq!(strategy, Strategy::Proceed);
    }

    #[test]
    fn strategy_ladder_degrades_with_utilization() {
        let governor = Governor::new(BudgetLimits {
            tokens_per_run: 100,
            ..BudgetLimits::unlimited()
        });
        assert_eq!(governor.record_tokens(10).unwrap(), Strategy::Proceed);
        assert_eq!(governor.record_tokens(20).unwrap(), Strategy::UseCheaperModel);
        assert_eq!(governor.record_tokens(20).unwrap(), Strategy::BatchAggressive);
        assert_eq!(governor.record_tokens(20).unwrap(), Strategy::Prioritize);
        assert_eq!(governor.record_tokens(15).unwrap(), Strategy::UseCache);
    }

    #[test]
    fn breaching_hard_ceiling_errors() {
        let governor = Governor::new(BudgetLimits { tokens_per_run: 100, ..BudgetLimits::unlimited() });
        let result = governor.record_tokens(151);
        assert!(result.is_err());
    }

    #[test]
    fn project_size_bucket_thresholds() {
        assert_eq!(ProjectSizeBucket::from_file_count(5), ProjectSizeBucket::Small);
        assert_eq!(ProjectSizeBucket::from_file_count(500), ProjectSizeBucket::Medium);
        assert_eq!(ProjectSizeBucket::from_file_count(5_000), ProjectSizeBucket::Large);
        assert_eq!(ProjectSizeBucket::from_file_count(50_000), ProjectSizeBucket::Massive);
    }

    #[test]
    fn detect_concurrency_is_bounded() {
        let n = detect_concurrency();
        assert!((1..=16).contains(&n));
    }
}
