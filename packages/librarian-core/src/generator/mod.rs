//! Per-entity knowledge generation: runs the eleven named extractors over a
//! function or module, folding their output into a `UniversalKnowledgeRecord`.

pub mod extractors;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::defeater::{DefeaterContext, DefeaterRegistry};
use crate::governor::Governor;
use crate::model::{
    EntityKind, EvidenceRef, Function, KnowledgeSection, Module, UniversalKnowledgeRecord,
};
use crate::ports::{ChatPort, EmbedPort, GitHistory};

/// The entity a generation pass targets.
#[derive(Debug, Clone)]
pub enum GenerationTarget {
    Function(Function),
    Module(Module),
}

impl GenerationTarget {
    pub fn entity_id(&self) -> &str {
        match self {
            GenerationTarget::Function(f) => &f.id,
            GenerationTarget::Module(m) => &m.id,
        }
    }

    pub fn entity_kind(&self) -> EntityKind {
        match self {
            GenerationTarget::Function(_) => EntityKind::Function,
            GenerationTarget::Module(_) => EntityKind::Module,
        }
    }

    pub fn hash(&self) -> String {
        match self {
            GenerationTarget::Function(f) => f.hash.clone(),
            GenerationTarget::Module(m) => m.identity_hash(),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            GenerationTarget::Function(f) => &f.file_path,
            GenerationTarget::Module(m) => &m.path,
        }
    }
}

/// What a single extractor phase produced.
pub struct ExtractionOutcome {
    pub value: serde_json::Value,
    pub confidence: f64,
    pub evidence: Vec<EvidenceRef>,
}

impl ExtractionOutcome {
    pub fn new(value: serde_json::Value, confidence: f64) -> Self {
        Self { value, confidence, evidence: Vec::new() }
    }

    pub fn with_evidence(mut self, evidence: Vec<EvidenceRef>) -> Self {
        self.evidence = evidence;
        self
    }
}

/// Shared dependencies every extractor phase may call into.
#[derive(Clone)]
pub struct GenerationContext {
    pub chat: Arc<dyn ChatPort>,
    pub embed: Arc<dyn EmbedPort>,
    pub git: Arc<dyn GitHistory>,
    pub governor: Governor,
}

/// A single named extraction phase. Phases that fail do not abort the whole
/// record: the caller marks that section missing and the overall outcome
/// becomes `partial` rather than `failure`.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn section(&self) -> KnowledgeSection;
    async fn extract(&self, target: &GenerationTarget, ctx: &GenerationContext) -> crate::error::Result<ExtractionOutcome>;
}

/// Runs every registered extractor over a target in a fixed phase order,
/// then applies defeaters before recomputing the record's overall outcome.
pub struct Generator {
    extractors: Vec<Box<dyn Extractor>>,
    defeaters: DefeaterRegistry,
}

impl Generator {
    pub fn new(extractors: Vec<Box<dyn Extractor>>, defeaters: DefeaterRegistry) -> Self {
        Self { extractors, defeaters }
    }

    /// Standard eleven-phase extractor set in its canonical run order.
    pub fn standard_extractors() -> Vec<Box<dyn Extractor>> {
        vec![
            Box::new(extractors::identity::IdentityExtractor),
            Box::new(extractors::semantics::SemanticsExtractor),
            Box::new(extractors::contract::ContractExtractor),
            Box::new(extractors::quality::QualityExtractor),
            Box::new(extractors::security::SecurityExtractor),
            Box::new(extractors::testing::TestingExtractor),
            Box::new(extractors::history::HistoryExtractor),
            Box::new(extractors::ownership::OwnershipExtractor),
            Box::new(extractors::rationale::RationaleExtractor),
            Box::new(extractors::traceability::TraceabilityExtractor),
            Box::new(extractors::relationships::RelationshipsExtractor),
        ]
    }

    /// Generate (or regenerate) a knowledge record for `target`. If
    /// `existing` is given and its hash matches the target's current hash,
    /// generation is skipped entirely and the existing record is returned
    /// unchanged — the identity phase's "skip if unchanged" behavior.
    pub async fn generate(
        &self,
        target: &GenerationTarget,
        ctx: &GenerationContext,
        existing: Option<UniversalKnowledgeRecord>,
    ) -> UniversalKnowledgeRecord {
        if let Some(existing) = &existing {
            if existing.hash == target.hash() {
                info!(entity_id = %target.entity_id(), "skipping generation, hash unchanged");
                return existing.clone();
            }
        }

        let mut record = UniversalKnowledgeRecord::new(target.entity_id(), target.entity_kind(), target.hash());

        for extractor in &self.extractors {
            match extractor.extract(target, ctx).await {
                Ok(outcome) => {
                    record.meta.evidence.extend(outcome.evidence);
                    record.set_section(extractor.section(), outcome.value, outcome.confidence);
                }
                Err(error) => {
                    warn!(entity_id = %target.entity_id(), section = ?extractor.section(), %error, "extractor phase failed");
                }
            }
        }

        let defeater_context = DefeaterContext { current_file_hash: target.hash(), current_file_exists: true };
        self.defeaters.apply(&mut record, &defeater_context).await;

        record.recompute_outcome();
        record
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::test_context;
    use super::*;
    use crate::defeater::DefeaterRegistry;

    #[tokio::test]
    async fn generation_runs_all_eleven_sections() {
        let generator = Generator::new(Generator::standard_extractors(), DefeaterRegistry::new(vec![]));
        let function = Function::new("a.py", "foo", "def foo():", 1, 5).unwrap();
        let target = GenerationTarget::Function(function);
        let record = generator.generate(&target, &test_context(), None).await;
        assert_eq!(record.meta.by_section.len(), KnowledgeSection::ALL.len());
    }

    #[tokio::test]
    async fn unchanged_hash_skips_regeneration() {
        let generator = Generator::new(Generator::standard_extractors(), DefeaterRegistry::new(vec![]));
        let function = Function::new("a.py", "foo", "def foo():", 1, 5).unwrap();
        let target = GenerationTarget::Function(function);
        let first = generator.generate(&target, &test_context(), None).await;
        let second = generator.generate(&target, &test_context(), Some(first.clone())).await;
        assert_eq!(first.hash, second.hash);
        assert_eq!(first.sections, second.sections);
    }
}
