use async_trait::async_trait;
use serde_json::json;

use crate::error::Result;
use crate::generator::{ExtractionOutcome, Extractor, GenerationContext, GenerationTarget};
use crate::model::{EvidenceConfidence, EvidenceRef, KnowledgeSection};
use crate::ports::{ChatMessage, ChatRequest};

/// LLM-backed: asks why the entity likely exists (what problem it solves),
/// distinct from `semantics`' "what it does". Inherently speculative, so
/// capped to the `literature` confidence band regardless of provider
/// response quality.
pub struct RationaleExtractor;

#[async_trait]
impl Extractor for RationaleExtractor {
    fn section(&self) -> KnowledgeSection {
        KnowledgeSection::Rationale
    }

    async fn extract(&self, target: &GenerationTarget, ctx: &GenerationContext) -> Result<ExtractionOutcome> {
        let identifier = match target {
            GenerationTarget::Function(f) => format!("{} ({})", f.name, f.signature),
            GenerationTarget::Module(m) => m.path.clone(),
        };

        let request = ChatRequest {
            provider: "librarian".to_string(),
            model_id: "rationale".to_string(),
            messages: vec![
                ChatMessage::system("In one sentence, speculate why this code likely exists."),
                ChatMessage::user(identifier),
            ],
            max_tokens: 150,
        };
        let response = ctx.chat.chat(request).await?;
        ctx.governor.record_tokens(response.tokens as u64)?;

        let evidence = vec![EvidenceRef::new(
            target.path(),
            "rationale inferred without access to issue trackers or commit messages",
            EvidenceConfidence::Literature,
        )];

        Ok(ExtractionOutcome::new(json!({ "rationale": response.content }), 0.4).with_evidence(evidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::test_support::test_context;
    use crate::model::Function;

    #[tokio::test]
    async fn rationale_confidence_is_capped_low() {
        let function = Function::new("a.py", "foo", "def foo():", 1, 2).unwrap();
        let outcome = RationaleExtractor
            .extract(&GenerationTarget::Function(function), &test_context())
            .await
            .unwrap();
        assert!(outcome.confidence <= 0.4);
    }
}
