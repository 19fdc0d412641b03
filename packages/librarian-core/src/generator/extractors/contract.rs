use async_trait::async_trait;
use serde_json::json;

use crate::error::Result;
use crate::generator::{ExtractionOutcome, Extractor, GenerationContext, GenerationTarget};
use crate::model::{EvidenceConfidence, EvidenceRef, KnowledgeSection};

/// Deterministic: parses a function's parameter list and return annotation
/// straight out of its signature text. Modules have no contract to parse
/// and get an empty, fully confident result.
pub struct ContractExtractor;

fn parse_parameters(signature: &str) -> Vec<String> {
    let Some(open) = signature.find('(') else { return Vec::new() };
    let Some(close) = signature.rfind(')') else { return Vec::new() };
    if close <= open {
        return Vec::new();
    }
    signature[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty() && *p != "self")
        .map(str::to_string)
        .collect()
}

fn parse_return_annotation(signature: &str) -> Option<String> {
    signature.split("->").nth(1).map(|s| s.trim().trim_end_matches(':').to_string())
}

#[async_trait]
impl Extractor for ContractExtractor {
    fn section(&self) -> KnowledgeSection {
        KnowledgeSection::Contract
    }

    async fn extract(&self, target: &GenerationTarget, _ctx: &GenerationContext) -> Result<ExtractionOutcome> {
        let GenerationTarget::Function(function) = target else {
            return Ok(ExtractionOutcome::new(json!({ "parameters": [], "returns": null }), 1.0));
        };

        let parameters = parse_parameters(&function.signature);
        let returns = parse_return_annotation(&function.signature);

        let evidence = vec![EvidenceRef::new(
            &function.file_path,
            "parameter and return shape parsed directly from the signature text",
            EvidenceConfidence::Verified,
        )];

        Ok(ExtractionOutcome::new(json!({ "parameters": parameters, "returns": returns }), 1.0)
            .with_evidence(evidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::test_support::test_context;
    use crate::model::Function;

    #[tokio::test]
    async fn parses_parameters_and_return_annotation() {
        let function = Function::new("a.py", "add", "def add(a: int, b: int) -> int:", 1, 2).unwrap();
        let outcome = ContractExtractor
            .extract(&GenerationTarget::Function(function), &test_context())
            .await
            .unwrap();
        assert_eq!(outcome.value["parameters"], json!(["a: int", "b: int"]));
        assert_eq!(outcome.value["returns"], json!("int"));
    }

    #[test]
    fn self_parameter_is_dropped() {
        let params = parse_parameters("def login(self, username, password):");
        assert_eq!(params, vec!["username".to_string(), "password".to_string()]);
    }
}
