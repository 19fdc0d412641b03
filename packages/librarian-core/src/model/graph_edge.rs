use serde::{Deserialize, Serialize};

use super::clamp01;

/// Tagged edge kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Imports,
    Calls,
    Extends,
    Implements,
    Cochange,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Imports => "imports",
            EdgeType::Calls => "calls",
            EdgeType::Extends => "extends",
            EdgeType::Implements => "implements",
            EdgeType::Cochange => "cochange",
        }
    }
}

/// Entity kind an edge endpoint refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    File,
    Function,
    Module,
}

/// A directed edge in the knowledge graph.
///
/// A full reindex of a file replaces all edges whose `source_file` equals
/// that file; there is no implicit cross-type deduplication. Cross-record
/// links are stored as opaque ids into the storage substrate, never as
/// in-memory object graphs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from_id: String,
    pub from_type: EntityType,
    pub to_id: String,
    pub to_type: EntityType,
    pub edge_type: EdgeType,
    pub source_file: String,
    pub source_line: Option<u32>,
    pub confidence: f64,
}

impl GraphEdge {
    pub fn new(
        from_id: impl Into<String>,
        from_type: EntityType,
        to_id: impl Into<String>,
        to_type: EntityType,
        edge_type: EdgeType,
        source_file: impl Into<String>,
    ) -> Self {
        Self {
            from_id: from_id.into(),
            from_type,
            to_id: to_id.into(),
            to_type,
            edge_type,
            source_file: source_file.into(),
            source_line: None,
            confidence: 1.0,
        }
    }

    pub fn with_source_line(mut self, line: u32) -> Self {
        self.source_line = Some(line);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = clamp01(confidence);
        self
    }
}
