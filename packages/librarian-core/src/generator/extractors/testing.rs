use async_trait::async_trait;
use serde_json::json;

use crate::error::Result;
use crate::generator::{ExtractionOutcome, Extractor, GenerationContext, GenerationTarget};
use crate::model::{EvidenceConfidence, EvidenceRef, KnowledgeSection};

/// Deterministic: infers a likely test file path by convention and records
/// it as a candidate, without opening the filesystem itself (the caller
/// wires in confirmation once the candidate path is checked against the
/// indexed file set).
pub struct TestingExtractor;

fn candidate_test_paths(source_path: &str) -> Vec<String> {
    let mut candidates = Vec::new();
    if let Some((dir, file)) = source_path.rsplit_once('/') {
        let stem = file.rsplit_once('.').map(|(s, _)| s).unwrap_or(file);
        candidates.push(format!("{dir}/test_{file}"));
        candidates.push(format!("{dir}/tests/test_{stem}.py"));
        candidates.push(format!("{dir}/{stem}.test.ts"));
    } else {
        let stem = source_path.rsplit_once('.').map(|(s, _)| s).unwrap_or(source_path);
        candidates.push(format!("test_{source_path}"));
        candidates.push(format!("{stem}.test.ts"));
    }
    candidates
}

#[async_trait]
impl Extractor for TestingExtractor {
    fn section(&self) -> KnowledgeSection {
        KnowledgeSection::Testing
    }

    async fn extract(&self, target: &GenerationTarget, _ctx: &GenerationContext) -> Result<ExtractionOutcome> {
        let candidates = candidate_test_paths(target.path());

        let evidence = vec![EvidenceRef::new(
            target.path(),
            "candidate test paths derived from naming convention, not yet confirmed present",
            EvidenceConfidence::Literature,
        )];

        Ok(ExtractionOutcome::new(
            json!({ "candidate_test_paths": candidates, "confirmed": false }),
            0.3,
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
    async fn derives_candidate_paths_from_convention() {
        let function = Function::new("src/auth.py", "login", "def login():", 1, 2).unwrap();
        let outcome = TestingExtractor
            .extract(&GenerationTarget::Function(function), &test_context())
            .await
            .unwrap();
        let candidates = outcome.value["candidate_test_paths"].as_array().unwrap();
        assert!(candidates.iter().any(|c| c.as_str().unwrap().contains("test_auth.py")));
    }
}
