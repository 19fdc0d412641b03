use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{clamp01, content_hash, CURRENT_SCHEMA_VERSION};

/// A module record. `exports`/`dependencies` are unique, insertion-order-
/// irrelevant sets — modeled as `BTreeSet` so serialization is deterministic,
/// which matters for the identity hash below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub path: String,
    pub exports: BTreeSet<String>,
    pub dependencies: BTreeSet<String>,
    pub purpose: Option<String>,
    pub confidence: f64,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
}

fn default_schema_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}

impl Module {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let id = content_hash(&["module", &path]);
        Self {
            id,
            path,
            exports: BTreeSet::new(),
            dependencies: BTreeSet::new(),
            purpose: None,
            confidence: 0.0,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    pub fn add_export(&mut self, symbol: impl Into<String>) {
        self.exports.insert(symbol.into());
    }

    pub fn add_dependency(&mut self, module_path: impl Into<String>) {
        self.dependencies.insert(module_path.into());
    }

    /// `hash = H(purpose ∥ exports)`.
    pub fn identity_hash(&self) -> String {
        let exports_joined = self.exports.iter().cloned().collect::<Vec<_>>().join(",");
        content_hash(&[self.purpose.as_deref().unwrap_or(""), &exports_joined])
    }

    pub fn set_confidence(&mut self, confidence: f64) {
        self.confidence = clamp01(confidence);
    }
}
