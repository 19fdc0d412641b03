use async_trait::async_trait;
use serde_json::json;

use crate::error::Result;
use crate::generator::{ExtractionOutcome, Extractor, GenerationContext, GenerationTarget};
use crate::model::{EvidenceConfidence, EvidenceRef, KnowledgeSection};
use crate::ports::{ChatMessage, ChatRequest};

/// LLM-backed: asks whether the entity's signature suggests a sensitive
/// operation (I/O, deserialization, shell execution, credential handling).
/// A purely textual pass, so confidence stays in the `inferred` band.
pub struct SecurityExtractor;

const SENSITIVE_HINTS: [&str; 8] =
    ["exec", "eval", "subprocess", "pickle", "password", "token", "secret", "sql"];

#[async_trait]
impl Extractor for SecurityExtractor {
    fn section(&self) -> KnowledgeSection {
        KnowledgeSection::Security
    }

    async fn extract(&self, target: &GenerationTarget, ctx: &GenerationContext) -> Result<ExtractionOutcome> {
        let identifier = match target {
            GenerationTarget::Function(f) => format!("{} {}", f.name, f.signature),
            GenerationTarget::Module(m) => m.path.clone(),
        };
        let lowercase = identifier.to_lowercase();
        let hints: Vec<&str> = SENSITIVE_HINTS.iter().copied().filter(|hint| lowercase.contains(hint)).collect();

        if hints.is_empty() {
            return Ok(ExtractionOutcome::new(
                json!({ "sensitive": false, "hints": [], "assessment": "no sensitive-operation hints found" }),
                0.6,
            ));
        }

        let request = ChatRequest {
            provider: "librarian".to_string(),
            model_id: "security".to_string(),
            messages: vec![
                ChatMessage::system("Assess the security sensitivity of this identifier in one sentence."),
                ChatMessage::user(identifier.clone()),
            ],
            max_tokens: 150,
        };
        let response = ctx.chat.chat(request).await?;
        ctx.governor.record_tokens(response.tokens as u64)?;

        let evidence = vec![EvidenceRef::new(
            target.path(),
            format!("identifier matched sensitive-operation hints: {}", hints.join(", ")),
            EvidenceConfidence::Inferred,
        )];

        Ok(ExtractionOutcome::new(
            json!({ "sensitive": true, "hints": hints, "assessment": response.content }),
            0.5,
        )
        .with_evidence(evidence))
    }
}
