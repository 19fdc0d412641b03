use async_trait::async_trait;
use serde_json::json;

use crate::error::Result;
use crate::generator::{ExtractionOutcome, Extractor, GenerationContext, GenerationTarget};
use crate::model::{EvidenceConfidence, EvidenceRef, KnowledgeSection};

/// Git-backed: churn metrics for the entity's source file. Confidence
/// reflects the evidence band — direct commit history, not inference.
pub struct HistoryExtractor;

#[async_trait]
impl Extractor for HistoryExtractor {
    fn section(&self) -> KnowledgeSection {
        KnowledgeSection::History
    }

    async fn extract(&self, target: &GenerationTarget, ctx: &GenerationContext) -> Result<ExtractionOutcome> {
        let churn = ctx.git.churn(target.path())?;

        let evidence = vec![EvidenceRef::new(
            target.path(),
            format!("{} commits touched this file", churn.total_commits),
            EvidenceConfidence::Verified,
        )];

        let confidence = if churn.total_commits > 0 { 0.95 } else { 0.2 };

        Ok(ExtractionOutcome::new(serde_json::to_value(&churn).unwrap_or(json!({})), confidence)
            .with_evidence(evidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::test_support::test_context;
    use crate::model::Function;

    #[tokio::test]
    async fn no_commits_yields_low_confidence() {
        let function = Function::new("a.py", "foo", "def foo():", 1, 2).unwrap();
        let outcome = HistoryExtractor
            .extract(&GenerationTarget::Function(function), &test_context())
            .await
            .unwrap();
        assert_eq!(outcome.confidence, 0.2);
    }
}
