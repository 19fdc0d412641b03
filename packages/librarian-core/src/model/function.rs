use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

use super::{clamp01, content_hash, CURRENT_SCHEMA_VERSION};

/// A normalized function record.
///
/// `id = H(filePath ∥ name ∥ startLine)`, so exactly one record exists per
/// `(file, name, startLine)` triple, and `endLine >= startLine` is enforced
/// at construction rather than left as a caller obligation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub id: String,
    pub name: String,
    pub file_path: String,
    pub signature: String,
    pub start_line: u32,
    pub end_line: u32,
    pub purpose: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub confidence: f64,
    pub hash: String,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
}

fn default_schema_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}

impl Function {
    pub fn new(
        file_path: impl Into<String>,
        name: impl Into<String>,
        signature: impl Into<String>,
        start_line: u32,
        end_line: u32,
    ) -> Result<Self> {
        let file_path = file_path.into();
        let name = name.into();
        let signature = signature.into();

        if end_line < start_line {
            return Err(CoreError::Parse(
                name,
                format!("endLine {end_line} < startLine {start_line}"),
            ));
        }

        let id = content_hash(&[&file_path, &name, &start_line.to_string()]);
        let hash = content_hash(&[&signature]);

        Ok(Self {
            id,
            name,
            file_path,
            signature,
            start_line,
            end_line,
            purpose: None,
            embedding: None,
            confidence: 0.0,
            hash,
            schema_version: CURRENT_SCHEMA_VERSION,
        })
    }

    /// Recompute `hash` from `signature` and `purpose`
    /// (`hash = H(signature ∥ purpose)`), used to decide whether semantic
    /// regeneration can be skipped for an unchanged function.
    pub fn identity_hash(&self) -> String {
        content_hash(&[&self.signature, self.purpose.as_deref().unwrap_or("")])
    }

    pub fn set_confidence(&mut self, confidence: f64) {
        self.confidence = clamp01(confidence);
    }

    pub fn line_count(&self) -> u32 {
        self.end_line - self.start_line + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_end_before_start() {
        let err = Function::new("a.py", "foo", "def foo():", 10, 5);
        assert!(err.is_err());
    }

    #[test]
    fn id_is_stable_for_same_identity_triple() {
        let a = Function::new("a.py", "foo", "def foo():", 1, 5).unwrap();
        let b = Function::new("a.py", "foo", "def foo(x):", 1, 5).unwrap();
        // Same (file, name, startLine) -> same id even if signature differs.
        assert_eq!(a.id, b.id);
        // But content hash differs because the signature differs.
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn id_differs_across_start_lines() {
        let a = Function::new("a.py", "foo", "def foo():", 1, 5).unwrap();
        let b = Function::new("a.py", "foo", "def foo():", 10, 15).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn line_count_is_inclusive() {
        let f = Function::new("a.py", "foo", "def foo():", 10, 10).unwrap();
        assert_eq!(f.line_count(), 1);
    }
}
