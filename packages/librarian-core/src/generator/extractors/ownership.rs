use async_trait::async_trait;
use serde_json::json;

use crate::error::Result;
use crate::generator::{ExtractionOutcome, Extractor, GenerationContext, GenerationTarget};
use crate::model::{EvidenceConfidence, EvidenceRef, KnowledgeSection};

/// Git-backed: the most frequent contributor to the entity's source file,
/// taken as the primary maintainer.
pub struct OwnershipExtractor;

#[async_trait]
impl Extractor for OwnershipExtractor {
    fn section(&self) -> KnowledgeSection {
        KnowledgeSection::Ownership
    }

    async fn extract(&self, target: &GenerationTarget, ctx: &GenerationContext) -> Result<ExtractionOutcome> {
        let contributors = ctx.git.contributors(target.path())?;
        let primary = contributors.first();

        let Some(primary) = primary else {
            return Ok(ExtractionOutcome::new(
                json!({ "primary_maintainer": null, "contributors": [] }),
                0.1,
            ));
        };

        let evidence = vec![EvidenceRef::new(
            target.path(),
            format!("{} has the most commits on this file ({})", primary.author_name, primary.commit_count),
            EvidenceConfidence::Verified,
        )];

        Ok(ExtractionOutcome::new(
            json!({
                "primary_maintainer": primary.author_email,
                "contributors": contributors,
            }),
            0.8,
        )
        .with_evidence(evidence))
    }
}
