use serde::{Deserialize, Serialize};

/// Outcome a query session attaches to a context pack it used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackOutcome {
    Success,
    Failure,
    Partial,
    Unknown,
}

impl FeedbackOutcome {
    /// Confidence delta this outcome applies to the pack it targets.
    pub fn confidence_delta(&self) -> f64 {
        match self {
            FeedbackOutcome::Success => 0.05,
            FeedbackOutcome::Partial => 0.0,
            FeedbackOutcome::Failure => -0.10,
            FeedbackOutcome::Unknown => 0.0,
        }
    }
}

/// A single feedback submission tying a query to the pack it consumed.
///
/// Ownership follows the pack: deleting a pack deletes the feedback records
/// that reference it, never the reverse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub query_id: String,
    pub pack_id: String,
    pub outcome: FeedbackOutcome,
    pub delta: f64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub agent_id: Option<String>,
}

impl FeedbackRecord {
    pub fn new(query_id: impl Into<String>, pack_id: impl Into<String>, outcome: FeedbackOutcome) -> Self {
        Self {
            query_id: query_id.into(),
            pack_id: pack_id.into(),
            delta: outcome.confidence_delta(),
            outcome,
            timestamp: chrono::Utc::now(),
            agent_id: None,
        }
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_and_failure_deltas_are_asymmetric() {
        assert!(FeedbackOutcome::Success.confidence_delta() > 0.0);
        assert!(FeedbackOutcome::Failure.confidence_delta() < 0.0);
        assert!(
            FeedbackOutcome::Failure.confidence_delta().abs()
                > FeedbackOutcome::Success.confidence_delta()
        );
    }

    #[test]
    fn new_record_captures_the_outcome_delta() {
        let record = FeedbackRecord::new("q1", "p1", FeedbackOutcome::Success);
        assert_eq!(record.delta, 0.05);
        assert!(record.agent_id.is_none());
    }

    #[test]
    fn with_agent_sets_attribution() {
        let record = FeedbackRecord::new("q1", "p1", FeedbackOutcome::Partial).with_agent("agent-7");
        assert_eq!(record.agent_id.as_deref(), Some("agent-7"));
    }
}
