use serde::{Deserialize, Serialize};

use super::{clamp01, CURRENT_SCHEMA_VERSION};

/// A single indexed source file.
///
/// `hash` is the sole change key: re-bootstrapping an unchanged file is a
/// no-op because its hash is unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub path: String,
    pub hash: String,
    pub language: String,
    pub indexed_at: chrono::DateTime<chrono::Utc>,
    pub purpose: Option<String>,
    pub confidence: f64,
    pub version: u32,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
}

fn default_schema_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}

impl File {
    pub fn new(path: impl Into<String>, hash: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hash: hash.into(),
            language: language.into(),
            indexed_at: chrono::Utc::now(),
            purpose: None,
            confidence: 0.0,
            version: 1,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    /// Whether `new_hash` represents a change relative to this file's
    /// current hash, the sole freshness key.
    pub fn changed(&self, new_hash: &str) -> bool {
        self.hash != new_hash
    }

    pub fn set_confidence(&mut self, confidence: f64) {
        self.confidence = clamp01(confidence);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_file_has_zero_confidence_and_current_schema() {
        let f = File::new("src/lib.rs", "abc123", "rust");
        assert_eq!(f.confidence, 0.0);
        assert_eq!(f.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(f.version, 1);
    }

    #[test]
    fn changed_detects_hash_difference() {
        let f = File::new("a.py", "h1", "python");
        assert!(!f.changed("h1"));
        assert!(f.changed("h2"));
    }

    #[test]
    fn set_confidence_clamps() {
        let mut f = File::new("a.py", "h1", "python");
        f.set_confidence(1.8);
        assert_eq!(f.confidence, 1.0);
        f.set_confidence(-1.0);
        assert_eq!(f.confidence, 0.0);
    }
}
