use async_trait::async_trait;
use serde_json::json;

use crate::error::Result;
use crate::generator::{ExtractionOutcome, Extractor, GenerationContext, GenerationTarget};
use crate::model::{EvidenceConfidence, EvidenceRef, KnowledgeSection};
use crate::ports::{ChatMessage, ChatRequest};

/// LLM-backed: asks the configured chat provider for a one-sentence purpose
/// summary of the entity's signature.
pub struct SemanticsExtractor;

#[async_trait]
impl Extractor for SemanticsExtractor {
    fn section(&self) -> KnowledgeSection {
        KnowledgeSection::Semantics
    }

    async fn extract(&self, target: &GenerationTarget, ctx: &GenerationContext) -> Result<ExtractionOutcome> {
        let prompt = match target {
            GenerationTarget::Function(f) => {
                format!("Summarize in one sentence what `{}` ({}) does.", f.name, f.signature)
            }
            GenerationTarget::Module(m) => {
                format!("Summarize in one sentence the purpose of module `{}`.", m.path)
            }
        };

        let request = ChatRequest {
            provider: "librarian".to_string(),
            model_id: "semantics".to_string(),
            messages: vec![
                ChatMessage::system("Answer with a single concise sentence, no preamble."),
                ChatMessage::user(prompt),
            ],
            max_tokens: 200,
        };

        let response = ctx.chat.chat(request).await?;
        ctx.governor.record_tokens(response.tokens as u64)?;

        let evidence = vec![EvidenceRef::new(
            target.path(),
            "summary produced from the entity's signature by the configured chat provider",
            EvidenceConfidence::Inferred,
        )];

        Ok(ExtractionOutcome::new(json!({ "summary": response.content }), 0.7).with_evidence(evidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::test_support::test_context;
    use crate::model::Function;

    #[tokio::test]
    async fn semantics_extraction_produces_a_summary() {
        let function = Function::new("a.py", "foo", "def foo():", 1, 2).unwrap();
        let outcome = SemanticsExtractor
            .extract(&GenerationTarget::Function(function), &test_context())
            .await
            .unwrap();
        assert!(outcome.value["summary"].as_str().unwrap().len() > 0);
        assert!(outcome.confidence < 1.0);
    }
}
