//! Domain model for the code-knowledge librarian: plain `serde`-derived
//! structs constructed through `new`/`with_*` helpers, covering files,
//! functions, modules, graph edges, context packs, universal knowledge
//! records and feedback records.

mod context_pack;
mod feedback;
mod file;
mod function;
mod graph_edge;
mod knowledge;
mod module;

pub use context_pack::{ContextPack, PackOutcome};
pub use feedback::{FeedbackOutcome, FeedbackRecord};
pub use file::File;
pub use function::Function;
pub use graph_edge::{EdgeType, EntityType, GraphEdge};
pub use knowledge::{
    EntityKind, EvidenceConfidence, EvidenceRef, GenerationOutcome, KnowledgeMeta, KnowledgeSection,
    UniversalKnowledgeRecord,
};
pub use module::Module;

/// Current schema version written by this crate. Every record carries an
/// explicit version field; an unknown version triggers a regeneration, never
/// a crash.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Stable content hash used for identity/change-detection across the model
/// (`File.hash`, `Function.hash`, cache-key derivation).
pub fn content_hash(parts: &[&str]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update(b"\x1f"); // unit separator, avoids part-boundary collisions
        }
        hasher.update(part.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Clamp a confidence-like value into `[0, 1]`.
pub fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_stable_and_order_sensitive() {
        let a = content_hash(&["foo", "bar"]);
        let b = content_hash(&["foo", "bar"]);
        let c = content_hash(&["bar", "foo"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn clamp01_bounds() {
        assert_eq!(clamp01(-0.5), 0.0);
        assert_eq!(clamp01(1.5), 1.0);
        assert_eq!(clamp01(0.42), 0.42);
    }
}
