use async_trait::async_trait;
use serde_json::json;

use crate::error::Result;
use crate::generator::{ExtractionOutcome, Extractor, GenerationContext, GenerationTarget};
use crate::model::{EvidenceConfidence, EvidenceRef, KnowledgeSection};

/// Deterministic: records the entity's path, kind and current hash.
/// Confidence is always 1.0 — there is nothing to infer here.
pub struct IdentityExtractor;

#[async_trait]
impl Extractor for IdentityExtractor {
    fn section(&self) -> KnowledgeSection {
        KnowledgeSection::Identity
    }

    async fn extract(&self, target: &GenerationTarget, _ctx: &GenerationContext) -> Result<ExtractionOutcome> {
        let value = json!({
            "path": target.path(),
            "entity_id": target.entity_id(),
            "hash": target.hash(),
        });
        let evidence = vec![EvidenceRef::new(
            target.path(),
            "entity identity fields read directly from the parsed record",
            EvidenceConfidence::Verified,
        )];
        Ok(ExtractionOutcome::new(value, 1.0).with_evidence(evidence))
    }
}
