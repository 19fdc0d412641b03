use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{clamp01, CURRENT_SCHEMA_VERSION};

/// Qualitative evidence confidence band.
///
/// Composition across sequential evidence multiplies the numeric band
/// medians below and clamps into `[0, 1]`; an `InsufficientData` evidence
/// collapses the composed result to 0 ("an absent evidence collapses the
/// result").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceConfidence {
    Verified,
    Inferred,
    Literature,
    FormalAnalysis,
    InsufficientData,
}

impl EvidenceConfidence {
    /// Representative numeric median of the qualitative band.
    pub fn band_median(&self) -> f64 {
        match self {
            EvidenceConfidence::Verified => 0.95,
            EvidenceConfidence::FormalAnalysis => 0.85,
            EvidenceConfidence::Inferred => 0.6,
            EvidenceConfidence::Literature => 0.4,
            EvidenceConfidence::InsufficientData => 0.0,
        }
    }
}

/// A citation to a file region supporting a claim in a knowledge record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRef {
    pub file: String,
    pub line: Option<u32>,
    pub snippet: Option<String>,
    pub claim: String,
    pub confidence: EvidenceConfidence,
}

impl EvidenceRef {
    pub fn new(file: impl Into<String>, claim: impl Into<String>, confidence: EvidenceConfidence) -> Self {
        Self {
            file: file.into(),
            line: None,
            snippet: None,
            claim: claim.into(),
            confidence,
        }
    }

    /// Compose a list of sequential evidence refs into a single confidence
    /// value by multiplying band medians, clamped to `[0, 1]`. An empty
    /// evidence list composes to 0 (no support for the claim).
    pub fn compose(evidence: &[EvidenceRef]) -> f64 {
        if evidence.is_empty() {
            return 0.0;
        }
        let mut acc = 1.0_f64;
        for e in evidence {
            if matches!(e.confidence, EvidenceConfidence::InsufficientData) {
                return 0.0;
            }
            acc *= e.confidence.band_median();
        }
        clamp01(acc)
    }
}

/// The named sections of a universal knowledge record, modeled as tagged
/// variants rather than an open string map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeSection {
    Identity,
    Semantics,
    Contract,
    Quality,
    Security,
    Testing,
    History,
    Ownership,
    Rationale,
    Traceability,
    Relationships,
}

impl KnowledgeSection {
    pub const ALL: [KnowledgeSection; 11] = [
        KnowledgeSection::Identity,
        KnowledgeSection::Semantics,
        KnowledgeSection::Contract,
        KnowledgeSection::Quality,
        KnowledgeSection::Security,
        KnowledgeSection::Testing,
        KnowledgeSection::History,
        KnowledgeSection::Ownership,
        KnowledgeSection::Rationale,
        KnowledgeSection::Traceability,
        KnowledgeSection::Relationships,
    ];
}

/// Per-record metadata: per-section confidence, evidence refs and active
/// defeaters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeMeta {
    pub by_section: BTreeMap<KnowledgeSection, f64>,
    pub overall: f64,
    pub evidence: Vec<EvidenceRef>,
    pub active_defeaters: Vec<String>,
}

impl KnowledgeMeta {
    /// Recompute `overall` as `min(bySection)` clamped into `[0, 1]`, after
    /// any defeater adjustments have already mutated `by_section`. Overall
    /// confidence never exceeds the weakest section.
    pub fn recompute_overall(&mut self) {
        self.overall = self
            .by_section
            .values()
            .copied()
            .fold(f64::INFINITY, f64::min);
        if !self.overall.is_finite() {
            self.overall = 0.0;
        }
        self.overall = clamp01(self.overall);
    }

    pub fn set_section_confidence(&mut self, section: KnowledgeSection, confidence: f64) {
        self.by_section.insert(section, clamp01(confidence));
        self.recompute_overall();
    }
}

/// Generation outcome for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationOutcome {
    Success,
    Partial,
    Failure,
}

/// The fully extracted per-entity record (function or module).
///
/// Indexed columns are duplicated at the top level for query efficiency;
/// the remaining extractor output lives in per-section JSON blobs so each
/// extractor's shape can evolve independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniversalKnowledgeRecord {
    pub entity_id: String,
    pub entity_kind: EntityKind,
    pub purpose_summary: Option<String>,
    pub maintainability_index: Option<f64>,
    pub risk_score: Option<f64>,
    pub test_coverage: Option<f64>,
    pub cyclomatic_complexity: Option<u32>,
    pub cognitive_complexity: Option<u32>,
    pub confidence: f64,
    pub embedding: Option<Vec<f32>>,
    pub hash: String,
    pub valid_until: Option<chrono::DateTime<chrono::Utc>>,
    pub sections: BTreeMap<KnowledgeSection, serde_json::Value>,
    pub meta: KnowledgeMeta,
    pub outcome: GenerationOutcome,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
}

fn default_schema_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}

/// Whether a knowledge record belongs to a function or a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Function,
    Module,
}

impl UniversalKnowledgeRecord {
    pub fn new(entity_id: impl Into<String>, entity_kind: EntityKind, hash: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            entity_kind,
            purpose_summary: None,
            maintainability_index: None,
            risk_score: None,
            test_coverage: None,
            cyclomatic_complexity: None,
            cognitive_complexity: None,
            confidence: 0.0,
            embedding: None,
            hash: hash.into(),
            valid_until: None,
            sections: BTreeMap::new(),
            meta: KnowledgeMeta::default(),
            outcome: GenerationOutcome::Failure,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    pub fn set_section(&mut self, section: KnowledgeSection, value: serde_json::Value, confidence: f64) {
        self.sections.insert(section, value);
        self.meta.set_section_confidence(section, confidence);
        self.confidence = self.meta.overall;
    }

    /// Sections with no stored confidence count as missing from the
    /// evaluation; `outcome` reflects how many of the eleven named sections
    /// actually ran.
    pub fn recompute_outcome(&mut self) {
        let completed = self.meta.by_section.len();
        self.outcome = if completed == KnowledgeSection::ALL.len() {
            GenerationOutcome::Success
        } else if completed == 0 {
            GenerationOutcome::Failure
        } else {
            GenerationOutcome::Partial
        };
    }
}
