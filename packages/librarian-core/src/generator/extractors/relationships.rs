use async_trait::async_trait;
use serde_json::json;

use crate::error::Result;
use crate::generator::{ExtractionOutcome, Extractor, GenerationContext, GenerationTarget};
use crate::model::{EvidenceConfidence, EvidenceRef, KnowledgeSection};

/// Git-backed cochange signal: files that tend to change alongside this
/// entity's source file. Call-edge and semantic-similarity relationships
/// need the full cross-entity graph, which this per-entity pass doesn't
/// have access to — those are merged in once every entity's knowledge
/// record exists, by whatever assembles the final graph.
pub struct RelationshipsExtractor;

#[async_trait]
impl Extractor for RelationshipsExtractor {
    fn section(&self) -> KnowledgeSection {
        KnowledgeSection::Relationships
    }

    async fn extract(&self, target: &GenerationTarget, ctx: &GenerationContext) -> Result<ExtractionOutcome> {
        let cochanged = ctx.git.cochanged_files(target.path())?;
        let top_cochanged: Vec<_> = cochanged.into_iter().take(10).collect();

        if top_cochanged.is_empty() {
            return Ok(ExtractionOutcome::new(json!({ "cochanged_files": [] }), 0.2));
        }

        let evidence = vec![EvidenceRef::new(
            target.path(),
            format!("{} files share commits with this one", top_cochanged.len()),
            EvidenceConfidence::Inferred,
        )];

        Ok(ExtractionOutcome::new(json!({ "cochanged_files": top_cochanged }), 0.6).with_evidence(evidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::test_support::test_context;
    use crate::model::Function;

    #[tokio::test]
    async fn no_cochange_history_yields_empty_list() {
        let function = Function::new("a.py", "foo", "def foo():", 1, 2).unwrap();
        let outcome = RelationshipsExtractor
            .extract(&GenerationTarget::Function(function), &test_context())
            .await
            .unwrap();
        assert_eq!(outcome.value["cochanged_files"], json!([]));
    }
}
