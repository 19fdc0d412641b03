use async_trait::async_trait;
use serde_json::json;

use crate::error::Result;
use crate::generator::{ExtractionOutcome, Extractor, GenerationContext, GenerationTarget};
use crate::model::{EvidenceConfidence, EvidenceRef, KnowledgeSection};

/// Deterministic: a line-count-derived maintainability proxy. A full static
/// analyzer is out of scope; this gives a directionally useful signal from
/// data already on hand (line span, branching keyword density).
pub struct QualityExtractor;

fn estimate_cyclomatic_complexity(signature: &str, line_count: u32) -> u32 {
    let branch_keywords = ["if", "elif", "for", "while", "case", "catch", "&&", "||"];
    let branch_hits: usize = branch_keywords.iter().map(|kw| signature.matches(kw).count()).sum();
    1 + branch_hits as u32 + (line_count / 20)
}

fn estimate_maintainability_index(line_count: u32, cyclomatic: u32) -> f64 {
    let raw = 171.0 - 5.2 * (line_count as f64).max(1.0).ln() - 0.23 * cyclomatic as f64;
    (raw / 171.0).clamp(0.0, 1.0)
}

#[async_trait]
impl Extractor for QualityExtractor {
    fn section(&self) -> KnowledgeSection {
        KnowledgeSection::Quality
    }

    async fn extract(&self, target: &GenerationTarget, _ctx: &GenerationContext) -> Result<ExtractionOutcome> {
        let (line_count, signature) = match target {
            GenerationTarget::Function(f) => (f.line_count(), f.signature.clone()),
            GenerationTarget::Module(m) => (0, m.purpose.clone().unwrap_or_default()),
        };

        let cyclomatic = estimate_cyclomatic_complexity(&signature, line_count);
        let cognitive = cyclomatic.saturating_add(line_count / 30);
        let maintainability = estimate_maintainability_index(line_count, cyclomatic);

        let evidence = vec![EvidenceRef::new(
            target.path(),
            "complexity estimated from line span and branching-keyword density",
            EvidenceConfidence::Inferred,
        )];

        Ok(ExtractionOutcome::new(
            json!({
                "cyclomatic_complexity": cyclomatic,
                "cognitive_complexity": cognitive,
                "maintainability_index": maintainability,
                "line_count": line_count,
            }),
            0.6,
        )
        .with_evidence(evidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::test_support::test_context;
    use crate::model::Function;

    #[tokio::test]
    async fn longer_and_branchier_functions_score_more_complex() {
        let simple = Function::new("a.py", "f", "def f(): pass", 1, 2).unwrap();
        let branchy = Function::new("a.py", "g", "def g(): if x: for y: while z: pass", 1, 40).unwrap();

        let simple_outcome = QualityExtractor.extract(&GenerationTarget::Function(simple), &test_context()).await.unwrap();
        let branchy_outcome = QualityExtractor.extract(&GenerationTarget::Function(branchy), &test_context()).await.unwrap();

        let simple_cc = simple_outcome.value["cyclomatic_complexity"].as_u64().unwrap();
        let branchy_cc = branchy_outcome.value["cyclomatic_complexity"].as_u64().unwrap();
        assert!(branchy_cc > simple_cc);
    }
}
