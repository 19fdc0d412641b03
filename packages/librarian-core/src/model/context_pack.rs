use serde::{Deserialize, Serialize};

use super::clamp01;

/// Outcome recorded on a pack's last access, including the `stale` state
/// produced by invalidation, which has no counterpart in `FeedbackOutcome`
/// (feedback submissions never claim staleness).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackOutcome {
    Success,
    Failure,
    Partial,
    Unknown,
    Stale,
}

/// A unit of retrieval: a summary plus supporting facts/snippets/files about
/// a target entity, carried with confidence and feedback counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextPack {
    pub pack_id: String,
    pub pack_type: String,
    pub target_id: String,
    pub summary: String,
    pub key_facts: Vec<String>,
    pub code_snippets: Vec<String>,
    pub related_files: Vec<String>,
    pub confidence: f64,
    pub access_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub last_outcome: Option<PackOutcome>,
    pub version: u32,
    pub invalidation_triggers: Vec<String>,
}

impl ContextPack {
    pub fn new(
        pack_id: impl Into<String>,
        pack_type: impl Into<String>,
        target_id: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            pack_id: pack_id.into(),
            pack_type: pack_type.into(),
            target_id: target_id.into(),
            summary: summary.into(),
            key_facts: Vec::new(),
            code_snippets: Vec::new(),
            related_files: Vec::new(),
            confidence: 0.5,
            access_count: 0,
            success_count: 0,
            failure_count: 0,
            last_outcome: None,
            version: 1,
            invalidation_triggers: Vec::new(),
        }
    }

    /// `successCount + failureCount ≤ accessCount`.
    pub fn invariant_holds(&self) -> bool {
        self.success_count + self.failure_count <= self.access_count
    }

    /// Atomic access-count bump performed once per query return.
    pub fn record_access(&mut self) {
        self.access_count += 1;
    }

    pub fn set_confidence(&mut self, confidence: f64) {
        self.confidence = clamp01(confidence);
    }

    /// Invalidate the pack when one of `invalidation_triggers` changed:
    /// confidence resets to 0 and `last_outcome` becomes `Stale`.
    pub fn invalidate(&mut self) {
        self.confidence = 0.0;
        self.last_outcome = Some(PackOutcome::Stale);
    }

    pub fn invalidated_by(&self, changed_file: &str) -> bool {
        self.invalidation_triggers.iter().any(|f| f == changed_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_pack_satisfies_invariant() {
        let pack = ContextPack::new("p1", "function_summary", "fn1", "does x");
        assert!(pack.invariant_holds());
        assert!((0.0..=1.0).contains(&pack.confidence));
    }

    #[test]
    fn invalidate_zeroes_confidence_and_marks_stale() {
        let mut pack = ContextPack::new("p1", "function_summary", "fn1", "does x");
        pack.set_confidence(0.9);
        pack.invalidate();
        assert_eq!(pack.confidence, 0.0);
        assert_eq!(pack.last_outcome, Some(PackOutcome::Stale));
    }

    #[test]
    fn invalidated_by_checks_trigger_membership() {
        let mut pack = ContextPack::new("p1", "function_summary", "fn1", "does x");
        pack.invalidation_triggers.push("a.py".to_string());
        assert!(pack.invalidated_by("a.py"));
        assert!(!pack.invalidated_by("b.py"));
    }

    #[test]
    fn record_access_increments_counter() {
        let mut pack = ContextPack::new("p1", "function_summary", "fn1", "does x");
        pack.record_access();
        pack.record_access();
        assert_eq!(pack.access_count, 2);
    }
}
