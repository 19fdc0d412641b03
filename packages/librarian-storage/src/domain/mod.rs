//! Storage port: `LibrarianStore` — the single abstraction the orchestrator
//! and query engine depend on. Infrastructure implements it against a
//! concrete backend; everything above this layer works against entities
//! from `librarian_core::model` only.
//!
//! # Core Principles
//!
//! 1. **File-level replace**: reindexing a file replaces its functions,
//!    modules and outgoing edges in one transaction — no partial overwrite.
//! 2. **Pack-owns-feedback**: deleting a context pack deletes the feedback
//!    records that reference it, never the reverse.
//! 3. **Index once, query many**: functions are indexed by name for O(log n)
//!    lookup; edges are indexed by both endpoints.

use async_trait::async_trait;

use librarian_core::model::{
    ContextPack, FeedbackRecord, File, Function, GraphEdge, Module, UniversalKnowledgeRecord,
};

use crate::Result;

/// Everything produced by reindexing one file, replacing its previous
/// contents in a single transaction.
pub struct FileReplacement {
    pub file: File,
    pub functions: Vec<Function>,
    pub modules: Vec<Module>,
    pub edges: Vec<GraphEdge>,
}

#[async_trait]
pub trait LibrarianStore: Send + Sync {
    async fn save_file(&self, file: &File) -> Result<()>;
    async fn get_file(&self, path: &str) -> Result<File>;
    async fn list_files(&self) -> Result<Vec<File>>;

    /// Replace every function, module and outgoing edge belonging to
    /// `replacement.file.path`, in a single transaction.
    async fn replace_file(&self, replacement: FileReplacement) -> Result<()>;

    async fn get_function(&self, id: &str) -> Result<Function>;
    async fn find_functions_by_name(&self, name: &str) -> Result<Vec<Function>>;
    async fn functions_in_file(&self, path: &str) -> Result<Vec<Function>>;

    async fn get_module(&self, id: &str) -> Result<Module>;
    async fn get_module_by_path(&self, path: &str) -> Result<Module>;

    async fn edges_from(&self, entity_id: &str) -> Result<Vec<GraphEdge>>;
    async fn edges_to(&self, entity_id: &str) -> Result<Vec<GraphEdge>>;

    async fn save_knowledge_record(&self, record: &UniversalKnowledgeRecord) -> Result<()>;
    async fn get_knowledge_record(&self, entity_id: &str) -> Result<UniversalKnowledgeRecord>;

    /// All records carrying an embedding, for the query engine's in-memory
    /// similarity scan.
    async fn knowledge_records_with_embeddings(&self) -> Result<Vec<UniversalKnowledgeRecord>>;

    async fn save_context_pack(&self, pack: &ContextPack) -> Result<()>;
    async fn get_context_pack(&self, pack_id: &str) -> Result<ContextPack>;
    async fn delete_context_pack(&self, pack_id: &str) -> Result<()>;

    async fn record_feedback(&self, feedback: &FeedbackRecord) -> Result<()>;
    async fn feedback_for_pack(&self, pack_id: &str) -> Result<Vec<FeedbackRecord>>;
}
