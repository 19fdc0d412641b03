//! Defeaters: predicates that can invalidate a previously generated
//! knowledge section when circumstances that justified it no longer hold
//! (the cited file changed, a referenced test was deleted, and so on).

use std::time::Duration;

use async_trait::async_trait;

use crate::model::{KnowledgeSection, UniversalKnowledgeRecord};

/// Context available to a defeater when judging a record.
#[derive(Debug, Clone)]
pub struct DefeaterContext {
    pub current_file_hash: String,
    pub current_file_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefeaterVerdict {
    pub activated: bool,
    pub reason: String,
}

impl DefeaterVerdict {
    pub fn clear() -> Self {
        Self { activated: false, reason: String::new() }
    }

    pub fn activated(reason: impl Into<String>) -> Self {
        Self { activated: true, reason: reason.into() }
    }
}

/// A single defeater predicate targeting one knowledge section.
#[async_trait]
pub trait Defeater: Send + Sync {
    fn name(&self) -> &str;
    fn targets(&self) -> KnowledgeSection;
    async fn check(&self, record: &UniversalKnowledgeRecord, context: &DefeaterContext) -> DefeaterVerdict;
}

/// Fires when the hash the record was generated against no longer matches
/// the file's current hash.
pub struct StaleHashDefeater;

#[async_trait]
impl Defeater for StaleHashDefeater {
    fn name(&self) -> &str {
        "stale_hash"
    }

    fn targets(&self) -> KnowledgeSection {
        KnowledgeSection::Identity
    }

    async fn check(&self, record: &UniversalKnowledgeRecord, context: &DefeaterContext) -> DefeaterVerdict {
        if !context.current_file_exists {
            return DefeaterVerdict::activated("source file no longer exists");
        }
        if record.hash != context.current_file_hash {
            return DefeaterVerdict::activated("source hash changed since generation");
        }
        DefeaterVerdict::clear()
    }
}

/// Runs a fixed set of defeaters against a record, each under a bounded
/// timeout. A defeater that times out or panics is treated as activated —
/// a malformed verdict must never silently preserve stale confidence.
pub struct DefeaterRegistry {
    defeaters: Vec<Box<dyn Defeater>>,
    timeout: Duration,
}

impl DefeaterRegistry {
    pub fn new(defeaters: Vec<Box<dyn Defeater>>) -> Self {
        Self { defeaters, timeout: Duration::from_secs(2) }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run every registered defeater, apply activated ones to `record`'s
    /// per-section confidence (zeroing the targeted section) and recompute
    /// `overall`. Returns the names of defeaters that activated.
    pub async fn apply(&self, record: &mut UniversalKnowledgeRecord, context: &DefeaterContext) -> Vec<String> {
        let mut activated_names = Vec::new();
        for defeater in &self.defeaters {
            let verdict = match tokio::time::timeout(self.timeout, defeater.check(record, context)).await {
                Ok(verdict) => verdict,
                Err(_) => DefeaterVerdict::activated("defeater timed out"),
            };
            if verdict.activated {
                activated_names.push(defeater.name().to_string());
                record.meta.set_section_confidence(defeater.targets(), 0.0);
                record
                    .meta
                    .active_defeaters
                    .push(format!("{}: {}", defeater.name(), verdict.reason));
            }
        }
        record.confidence = record.meta.overall;
        activated_names
    }
}
