use async_trait::async_trait;
use serde_json::json;

use crate::error::Result;
use crate::generator::{ExtractionOutcome, Extractor, GenerationContext, GenerationTarget};
use crate::model::{EvidenceConfidence, EvidenceRef, KnowledgeSection};

/// Deterministic: traces the entity back to its own definition site. Cross-
/// entity traceability (which requirement/issue a function implements) has
/// no reliable source in this pass and is left at its default empty state.
pub struct TraceabilityExtractor;

#[async_trait]
impl Extractor for TraceabilityExtractor {
    fn section(&self) -> KnowledgeSection {
        KnowledgeSection::Traceability
    }

    async fn extract(&self, target: &GenerationTarget, _ctx: &GenerationContext) -> Result<ExtractionOutcome> {
        let location = match target {
            GenerationTarget::Function(f) => json!({
                "file": f.file_path,
                "start_line": f.start_line,
                "end_line": f.end_line,
            }),
            GenerationTarget::Module(m) => json!({ "file": m.path }),
        };

        let evidence = vec![EvidenceRef::new(
            target.path(),
            "definition location read directly from the parsed record",
            EvidenceConfidence::Verified,
        )];

        Ok(ExtractionOutcome::new(json!({ "definition_location": location }), 1.0).with_evidence(evidence))
    }
}
