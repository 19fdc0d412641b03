//! Feedback bookkeeping: outcome deltas and per-pack relevance ratings,
//! applied transactionally per (queryId, packId).

use librarian_core::model::{FeedbackOutcome, FeedbackRecord};
use librarian_storage::domain::LibrarianStore;

use crate::error::Result;

/// A relevance rating a caller attaches to one pack, independent of the
/// query-level outcome.
pub fn relevance_delta(relevant: bool) -> f64 {
    if relevant {
        0.03
    } else {
        -0.05
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Adjustment {
    pub pack_id: String,
    pub delta: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmitFeedbackResult {
    pub adjustments_applied: usize,
    pub adjustments: Vec<Adjustment>,
}

/// Applies one outcome to every listed pack: clamps confidence, bumps the
/// matching counter, records the transaction, one pack at a time so a
/// failure partway through still leaves already-applied packs consistent.
pub async fn submit_outcome(
    store: &dyn LibrarianStore,
    query_id: &str,
    pack_ids: &[String],
    outcome: FeedbackOutcome,
) -> Result<SubmitFeedbackResult> {
    let mut adjustments = Vec::new();

    for pack_id in pack_ids {
        let mut pack = store.get_context_pack(pack_id).await?;
        let delta = outcome.confidence_delta();
        pack.set_confidence(pack.confidence + delta);

        match outcome {
            FeedbackOutcome::Success => pack.success_count += 1,
            FeedbackOutcome::Failure => pack.failure_count += 1,
            FeedbackOutcome::Partial | FeedbackOutcome::Unknown => {}
        }
        pack.last_outcome = Some(match outcome {
            FeedbackOutcome::Success => librarian_core::model::PackOutcome::Success,
            FeedbackOutcome::Failure => librarian_core::model::PackOutcome::Failure,
            FeedbackOutcome::Partial => librarian_core::model::PackOutcome::Partial,
            FeedbackOutcome::Unknown => librarian_core::model::PackOutcome::Unknown,
        });

        store.save_context_pack(&pack).await?;
        store.record_feedback(&FeedbackRecord::new(query_id, pack_id, outcome)).await?;

        adjustments.push(Adjustment { pack_id: pack_id.clone(), delta });
    }

    Ok(SubmitFeedbackResult { adjustments_applied: adjustments.len(), adjustments })
}

/// Applies a per-pack relevance rating, independent of any query outcome.
pub async fn submit_relevance_rating(store: &dyn LibrarianStore, pack_id: &str, relevant: bool) -> Result<Adjustment> {
    let mut pack = store.get_context_pack(pack_id).await?;
    let delta = relevance_delta(relevant);
    pack.set_confidence(pack.confidence + delta);
    store.save_context_pack(&pack).await?;
    Ok(Adjustment { pack_id: pack_id.to_string(), delta })
}

#[cfg(test)]
mod tests {
    use super::*;
    use librarian_core::model::ContextPack;
    use librarian_storage::SqliteLibrarianStore;

    #[tokio::test]
    async fn failure_then_success_nets_to_a_small_net_penalty() {
        let store = SqliteLibrarianStore::in_memory().await.unwrap();
        let mut pack = ContextPack::new("p1", "function_summary", "fn1", "does x");
        pack.set_confidence(0.7);
        store.save_context_pack(&pack).await.unwrap();

        submit_outcome(&store, "q1", &["p1".to_string()], FeedbackOutcome::Failure).await.unwrap();
        let after_failure = store.get_context_pack("p1").await.unwrap();
        assert!((after_failure.confidence - 0.6).abs() < 1e-9);

        submit_outcome(&store, "q2", &["p1".to_string()], FeedbackOutcome::Success).await.unwrap();
        let after_success = store.get_context_pack("p1").await.unwrap();
        assert!((after_success.confidence - 0.65).abs() < 1e-9);
        assert_eq!(after_success.success_count, 1);
    }

    #[tokio::test]
    async fn positive_relevance_rating_raises_confidence() {
        let store = SqliteLibrarianStore::in_memory().await.unwrap();
        let mut pack = ContextPack::new("p1", "function_summary", "fn1", "does x");
        pack.set_confidence(0.5);
        store.save_context_pack(&pack).await.unwrap();

        submit_relevance_rating(&store, "p1", true).await.unwrap();
        let updated = store.get_context_pack("p1").await.unwrap();
        assert!((updated.confidence - 0.53).abs() < 1e-9);
    }
}
