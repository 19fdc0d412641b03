//! `sqlx`-backed implementation of `LibrarianStore`.
//!
//! Uses runtime-checked queries (`sqlx::query`/`query_as`) rather than the
//! `query!` macro family, since those require a live database at compile
//! time that isn't available in every build environment.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use librarian_core::model::{
    ContextPack, FeedbackOutcome, FeedbackRecord, File, Function, GraphEdge, Module, PackOutcome,
    UniversalKnowledgeRecord,
};

use crate::domain::{FileReplacement, LibrarianStore};
use crate::error::StorageError;
use crate::Result;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    path TEXT PRIMARY KEY,
    hash TEXT NOT NULL,
    language TEXT NOT NULL,
    indexed_at TEXT NOT NULL,
    purpose TEXT,
    confidence REAL NOT NULL,
    version INTEGER NOT NULL,
    schema_version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS functions (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    file_path TEXT NOT NULL,
    signature TEXT NOT NULL,
    start_line INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    purpose TEXT,
    embedding TEXT,
    confidence REAL NOT NULL,
    hash TEXT NOT NULL,
    schema_version INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_functions_name ON functions(name);
CREATE INDEX IF NOT EXISTS idx_functions_file_path ON functions(file_path);

CREATE TABLE IF NOT EXISTS modules (
    id TEXT PRIMARY KEY,
    path TEXT NOT NULL UNIQUE,
    exports TEXT NOT NULL,
    dependencies TEXT NOT NULL,
    purpose TEXT,
    confidence REAL NOT NULL,
    schema_version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS graph_edges (
    from_id TEXT NOT NULL,
    from_type TEXT NOT NULL,
    to_id TEXT NOT NULL,
    to_type TEXT NOT NULL,
    edge_type TEXT NOT NULL,
    source_file TEXT NOT NULL,
    source_line INTEGER,
    confidence REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_edges_from ON graph_edges(from_id);
CREATE INDEX IF NOT EXISTS idx_edges_to ON graph_edges(to_id);
CREATE INDEX IF NOT EXISTS idx_edges_source_file ON graph_edges(source_file);

CREATE TABLE IF NOT EXISTS knowledge_records (
    entity_id TEXT PRIMARY KEY,
    entity_kind TEXT NOT NULL,
    purpose_summary TEXT,
    maintainability_index REAL,
    risk_score REAL,
    test_coverage REAL,
    cyclomatic_complexity INTEGER,
    cognitive_complexity INTEGER,
    confidence REAL NOT NULL,
    embedding TEXT,
    hash TEXT NOT NULL,
    valid_until TEXT,
    sections TEXT NOT NULL,
    meta TEXT NOT NULL,
    outcome TEXT NOT NULL,
    schema_version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS context_packs (
    pack_id TEXT PRIMARY KEY,
    pack_type TEXT NOT NULL,
    target_id TEXT NOT NULL,
    summary TEXT NOT NULL,
    key_facts TEXT NOT NULL,
    code_snippets TEXT NOT NULL,
    related_files TEXT NOT NULL,
    confidence REAL NOT NULL,
    access_count INTEGER NOT NULL,
    success_count INTEGER NOT NULL,
    failure_count INTEGER NOT NULL,
    last_outcome TEXT,
    version INTEGER NOT NULL,
    invalidation_triggers TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS feedback_records (
    query_id TEXT NOT NULL,
    pack_id TEXT NOT NULL REFERENCES context_packs(pack_id) ON DELETE CASCADE,
    outcome TEXT NOT NULL,
    delta REAL NOT NULL,
    timestamp TEXT NOT NULL,
    agent_id TEXT
);
CREATE INDEX IF NOT EXISTS idx_feedback_pack ON feedback_records(pack_id);
"#;

pub struct SqliteLibrarianStore {
    pool: SqlitePool,
}

impl SqliteLibrarianStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new().max_connections(8).connect(database_url).await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn row_to_file(row: SqliteRow) -> Result<File> {
    Ok(File {
        path: row.try_get("path")?,
        hash: row.try_get("hash")?,
        language: row.try_get("language")?,
        indexed_at: row.try_get("indexed_at")?,
        purpose: row.try_get("purpose")?,
        confidence: row.try_get("confidence")?,
        version: row.try_get::<i64, _>("version")? as u32,
        schema_version: row.try_get::<i64, _>("schema_version")? as u32,
    })
}

fn row_to_function(row: SqliteRow) -> Result<Function> {
    let embedding: Option<String> = row.try_get("embedding")?;
    Ok(Function {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        file_path: row.try_get("file_path")?,
        signature: row.try_get("signature")?,
        start_line: row.try_get::<i64, _>("start_line")? as u32,
        end_line: row.try_get::<i64, _>("end_line")? as u32,
        purpose: row.try_get("purpose")?,
        embedding: embedding.map(|e| serde_json::from_str(&e)).transpose()?,
        confidence: row.try_get("confidence")?,
        hash: row.try_get("hash")?,
        schema_version: row.try_get::<i64, _>("schema_version")? as u32,
    })
}

fn row_to_module(row: SqliteRow) -> Result<Module> {
    let exports: String = row.try_get("exports")?;
    let dependencies: String = row.try_get("dependencies")?;
    Ok(Module {
        id: row.try_get("id")?,
        path: row.try_get("path")?,
        exports: serde_json::from_str(&exports)?,
        dependencies: serde_json::from_str(&dependencies)?,
        purpose: row.try_get("purpose")?,
        confidence: row.try_get("confidence")?,
        schema_version: row.try_get::<i64, _>("schema_version")? as u32,
    })
}

fn row_to_edge(row: SqliteRow) -> Result<GraphEdge> {
    let edge_type: String = row.try_get("edge_type")?;
    let from_type: String = row.try_get("from_type")?;
    let to_type: String = row.try_get("to_type")?;
    Ok(GraphEdge {
        from_id: row.try_get("from_id")?,
        from_type: serde_json::from_value(serde_json::Value::String(from_type))?,
        to_id: row.try_get("to_id")?,
        to_type: serde_json::from_value(serde_json::Value::String(to_type))?,
        edge_type: serde_json::from_value(serde_json::Value::String(edge_type))?,
        source_file: row.try_get("source_file")?,
        source_line: row.try_get::<Option<i64>, _>("source_line")?.map(|n| n as u32),
        confidence: row.try_get("confidence")?,
    })
}

fn row_to_knowledge_record(row: SqliteRow) -> Result<UniversalKnowledgeRecord> {
    let entity_kind: String = row.try_get("entity_kind")?;
    let embedding: Option<String> = row.try_get("embedding")?;
    let sections: String = row.try_get("sections")?;
    let meta: String = row.try_get("meta")?;
    let outcome: String = row.try_get("outcome")?;
    Ok(UniversalKnowledgeRecord {
        entity_id: row.try_get("entity_id")?,
        entity_kind: serde_json::from_value(serde_json::Value::String(entity_kind))?,
        purpose_summary: row.try_get("purpose_summary")?,
        maintainability_index: row.try_get("maintainability_index")?,
        risk_score: row.try_get("risk_score")?,
        test_coverage: row.try_get("test_coverage")?,
        cyclomatic_complexity: row.try_get::<Option<i64>, _>("cyclomatic_complexity")?.map(|n| n as u32),
        cognitive_complexity: row.try_get::<Option<i64>, _>("cognitive_complexity")?.map(|n| n as u32),
        confidence: row.try_get("confidence")?,
        embedding: embedding.map(|e| serde_json::from_str(&e)).transpose()?,
        hash: row.try_get("hash")?,
        valid_until: row.try_get("valid_until")?,
        sections: serde_json::from_str(&sections)?,
        meta: serde_json::from_str(&meta)?,
        outcome: serde_json::from_value(serde_json::Value::String(outcome))?,
        schema_version: row.try_get::<i64, _>("schema_version")? as u32,
    })
}

fn row_to_context_pack(row: SqliteRow) -> Result<ContextPack> {
    let key_facts: String = row.try_get("key_facts")?;
    let code_snippets: String = row.try_get("code_snippets")?;
    let related_files: String = row.try_get("related_files")?;
    let invalidation_triggers: String = row.try_get("invalidation_triggers")?;
    let last_outcome: Option<String> = row.try_get("last_outcome")?;
    Ok(ContextPack {
        pack_id: row.try_get("pack_id")?,
        pack_type: row.try_get("pack_type")?,
        target_id: row.try_get("target_id")?,
        summary: row.try_get("summary")?,
        key_facts: serde_json::from_str(&key_facts)?,
        code_snippets: serde_json::from_str(&code_snippets)?,
        related_files: serde_json::from_str(&related_files)?,
        confidence: row.try_get("confidence")?,
        access_count: row.try_get::<i64, _>("access_count")? as u64,
        success_count: row.try_get::<i64, _>("success_count")? as u64,
        failure_count: row.try_get::<i64, _>("failure_count")? as u64,
        last_outcome: last_outcome
            .map(|o| serde_json::from_value::<PackOutcome>(serde_json::Value::String(o)))
            .transpose()?,
        version: row.try_get::<i64, _>("version")? as u32,
        invalidation_triggers: serde_json::from_str(&invalidation_triggers)?,
    })
}

fn row_to_feedback(row: SqliteRow) -> Result<FeedbackRecord> {
    let outcome: String = row.try_get("outcome")?;
    Ok(FeedbackRecord {
        query_id: row.try_get("query_id")?,
        pack_id: row.try_get("pack_id")?,
        outcome: serde_json::from_value::<FeedbackOutcome>(serde_json::Value::String(outcome))?,
        delta: row.try_get("delta")?,
        timestamp: row.try_get("timestamp")?,
        agent_id: row.try_get("agent_id")?,
    })
}

#[async_trait]
impl LibrarianStore for SqliteLibrarianStore {
    async fn save_file(&self, file: &File) -> Result<()> {
        sqlx::query(
            "INSERT INTO files (path, hash, language, indexed_at, purpose, confidence, version, schema_version)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(path) DO UPDATE SET hash = excluded.hash, language = excluded.language,
                 indexed_at = excluded.indexed_at, purpose = excluded.purpose,
                 confidence = excluded.confidence, version = excluded.version,
                 schema_version = excluded.schema_version",
        )
        .bind(&file.path)
        .bind(&file.hash)
        .bind(&file.language)
        .bind(file.indexed_at)
        .bind(&file.purpose)
        .bind(file.confidence)
        .bind(file.version as i64)
        .bind(file.schema_version as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_file(&self, path: &str) -> Result<File> {
        let row = sqlx::query("SELECT * FROM files WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::not_found("file", path))?;
        row_to_file(row)
    }

    async fn list_files(&self) -> Result<Vec<File>> {
        let rows = sqlx::query("SELECT * FROM files").fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_file).collect()
    }

    async fn replace_file(&self, replacement: FileReplacement) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let path = &replacement.file.path;

        sqlx::query(
            "INSERT INTO files (path, hash, language, indexed_at, purpose, confidence, version, schema_version)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(path) DO UPDATE SET hash = excluded.hash, language = excluded.language,
                 indexed_at = excluded.indexed_at, purpose = excluded.purpose,
                 confidence = excluded.confidence, version = excluded.version,
                 schema_version = excluded.schema_version",
        )
        .bind(path)
        .bind(&replacement.file.hash)
        .bind(&replacement.file.language)
        .bind(replacement.file.indexed_at)
        .bind(&replacement.file.purpose)
        .bind(replacement.file.confidence)
        .bind(replacement.file.version as i64)
        .bind(replacement.file.schema_version as i64)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM functions WHERE file_path = ?").bind(path).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM graph_edges WHERE source_file = ?").bind(path).execute(&mut *tx).await?;

        for function in &replacement.functions {
            let embedding = function.embedding.as_ref().map(serde_json::to_string).transpose()?;
            sqlx::query(
                "INSERT INTO functions (id, name, file_path, signature, start_line, end_line, purpose, embedding, confidence, hash, schema_version)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&function.id)
            .bind(&function.name)
            .bind(&function.file_path)
            .bind(&function.signature)
            .bind(function.start_line as i64)
            .bind(function.end_line as i64)
            .bind(&function.purpose)
            .bind(embedding)
            .bind(function.confidence)
            .bind(&function.hash)
            .bind(function.schema_version as i64)
            .execute(&mut *tx)
            .await?;
        }

        for module in &replacement.modules {
            let exports = serde_json::to_string(&module.exports)?;
            let dependencies = serde_json::to_string(&module.dependencies)?;
            sqlx::query(
                "INSERT INTO modules (id, path, exports, dependencies, purpose, confidence, schema_version)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(path) DO UPDATE SET exports = excluded.exports, dependencies = excluded.dependencies,
                     purpose = excluded.purpose, confidence = excluded.confidence, schema_version = excluded.schema_version",
            )
            .bind(&module.id)
            .bind(&module.path)
            .bind(exports)
            .bind(dependencies)
            .bind(&module.purpose)
            .bind(module.confidence)
            .bind(module.schema_version as i64)
            .execute(&mut *tx)
            .await?;
        }

        for edge in &replacement.edges {
            sqlx::query(
                "INSERT INTO graph_edges (from_id, from_type, to_id, to_type, edge_type, source_file, source_line, confidence)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&edge.from_id)
            .bind(serde_json::to_value(edge.from_type)?.as_str().unwrap_or_default())
            .bind(&edge.to_id)
            .bind(serde_json::to_value(edge.to_type)?.as_str().unwrap_or_default())
            .bind(serde_json::to_value(edge.edge_type)?.as_str().unwrap_or_default())
            .bind(&edge.source_file)
            .bind(edge.source_line.map(|l| l as i64))
            .bind(edge.confidence)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_function(&self, id: &str) -> Result<Function> {
        let row = sqlx::query("SELECT * FROM functions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::not_found("function", id))?;
        row_to_function(row)
    }

    async fn find_functions_by_name(&self, name: &str) -> Result<Vec<Function>> {
        let rows = sqlx::query("SELECT * FROM functions WHERE name = ?").bind(name).fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_function).collect()
    }

    async fn functions_in_file(&self, path: &str) -> Result<Vec<Function>> {
        let rows = sqlx::query("SELECT * FROM functions WHERE file_path = ?").bind(path).fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_function).collect()
    }

    async fn get_module(&self, id: &str) -> Result<Module> {
        let row = sqlx::query("SELECT * FROM modules WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::not_found("module", id))?;
        row_to_module(row)
    }

    async fn get_module_by_path(&self, path: &str) -> Result<Module> {
        let row = sqlx::query("SELECT * FROM modules WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::not_found("module", path))?;
        row_to_module(row)
    }

    async fn edges_from(&self, entity_id: &str) -> Result<Vec<GraphEdge>> {
        let rows = sqlx::query("SELECT * FROM graph_edges WHERE from_id = ?").bind(entity_id).fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_edge).collect()
    }

    async fn edges_to(&self, entity_id: &str) -> Result<Vec<GraphEdge>> {
        let rows = sqlx::query("SELECT * FROM graph_edges WHERE to_id = ?").bind(entity_id).fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_edge).collect()
    }

    async fn save_knowledge_record(&self, record: &UniversalKnowledgeRecord) -> Result<()> {
        let embedding = record.embedding.as_ref().map(serde_json::to_string).transpose()?;
        let sections = serde_json::to_string(&record.sections)?;
        let meta = serde_json::to_string(&record.meta)?;
        let entity_kind = serde_json::to_value(record.entity_kind)?.as_str().unwrap_or_default().to_string();
        let outcome = serde_json::to_value(record.outcome)?.as_str().unwrap_or_default().to_string();

        sqlx::query(
            "INSERT INTO knowledge_records (entity_id, entity_kind, purpose_summary, maintainability_index,
                 risk_score, test_coverage, cyclomatic_complexity, cognitive_complexity, confidence,
                 embedding, hash, valid_until, sections, meta, outcome, schema_version)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(entity_id) DO UPDATE SET
                 purpose_summary = excluded.purpose_summary, maintainability_index = excluded.maintainability_index,
                 risk_score = excluded.risk_score, test_coverage = excluded.test_coverage,
                 cyclomatic_complexity = excluded.cyclomatic_complexity, cognitive_complexity = excluded.cognitive_complexity,
                 confidence = excluded.confidence, embedding = excluded.embedding, hash = excluded.hash,
                 valid_until = excluded.valid_until, sections = excluded.sections, meta = excluded.meta,
                 outcome = excluded.outcome, schema_version = excluded.schema_version",
        )
        .bind(&record.entity_id)
        .bind(entity_kind)
        .bind(&record.purpose_summary)
        .bind(record.maintainability_index)
        .bind(record.risk_score)
        .bind(record.test_coverage)
        .bind(record.cyclomatic_complexity.map(|n| n as i64))
        .bind(record.cognitive_complexity.map(|n| n as i64))
        .bind(record.confidence)
        .bind(embedding)
        .bind(&record.hash)
        .bind(record.valid_until)
        .bind(sections)
        .bind(meta)
        .bind(outcome)
        .bind(record.schema_version as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_knowledge_record(&self, entity_id: &str) -> Result<UniversalKnowledgeRecord> {
        let row = sqlx::query("SELECT * FROM knowledge_records WHERE entity_id = ?")
            .bind(entity_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::not_found("knowledge_record", entity_id))?;
        row_to_knowledge_record(row)
    }

    async fn knowledge_records_with_embeddings(&self) -> Result<Vec<UniversalKnowledgeRecord>> {
        let rows = sqlx::query("SELECT * FROM knowledge_records WHERE embedding IS NOT NULL").fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_knowledge_record).collect()
    }

    async fn save_context_pack(&self, pack: &ContextPack) -> Result<()> {
        let key_facts = serde_json::to_string(&pack.key_facts)?;
        let code_snippets = serde_json::to_string(&pack.code_snippets)?;
        let related_files = serde_json::to_string(&pack.related_files)?;
        let invalidation_triggers = serde_json::to_string(&pack.invalidation_triggers)?;
        let last_outcome = pack
            .last_outcome
            .map(|o| serde_json::to_value(o))
            .transpose()?
            .and_then(|v| v.as_str().map(str::to_string));

        sqlx::query(
            "INSERT INTO context_packs (pack_id, pack_type, target_id, summary, key_facts, code_snippets,
                 related_files, confidence, access_count, success_count, failure_count, last_outcome, version,
                 invalidation_triggers)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(pack_id) DO UPDATE SET summary = excluded.summary, key_facts = excluded.key_facts,
                 code_snippets = excluded.code_snippets, related_files = excluded.related_files,
                 confidence = excluded.confidence, access_count = excluded.access_count,
                 success_count = excluded.success_count, failure_count = excluded.failure_count,
                 last_outcome = excluded.last_outcome, version = excluded.version,
                 invalidation_triggers = excluded.invalidation_triggers",
        )
        .bind(&pack.pack_id)
        .bind(&pack.pack_type)
        .bind(&pack.target_id)
        .bind(&pack.summary)
        .bind(key_facts)
        .bind(code_snippets)
        .bind(related_files)
        .bind(pack.confidence)
        .bind(pack.access_count as i64)
        .bind(pack.success_count as i64)
        .bind(pack.failure_count as i64)
        .bind(last_outcome)
        .bind(pack.version as i64)
        .bind(invalidation_triggers)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_context_pack(&self, pack_id: &str) -> Result<ContextPack> {
        let row = sqlx::query("SELECT * FROM context_packs WHERE pack_id = ?")
            .bind(pack_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::not_found("context_pack", pack_id))?;
        row_to_context_pack(row)
    }

    async fn delete_context_pack(&self, pack_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM context_packs WHERE pack_id = ?").bind(pack_id).execute(&self.pool).await?;
        Ok(())
    }

    async fn record_feedback(&self, feedback: &FeedbackRecord) -> Result<()> {
        let outcome = serde_json::to_value(feedback.outcome)?.as_str().unwrap_or_default().to_string();
        sqlx::query(
            "INSERT INTO feedback_records (query_id, pack_id, outcome, delta, timestamp, agent_id)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&feedback.query_id)
        .bind(&feedback.pack_id)
        .bind(outcome)
        .bind(feedback.delta)
        .bind(feedback.timestamp)
        .bind(&feedback.agent_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn feedback_for_pack(&self, pack_id: &str) -> Result<Vec<FeedbackRecord>> {
        let rows = sqlx::query("SELECT * FROM feedback_records WHERE pack_id = ?").bind(pack_id).fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_feedback).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use librarian_core::model::{EdgeType, EntityType};

    #[tokio::test]
    async fn replace_file_swaps_functions_and_edges_atomically() {
        let store = SqliteLibrarianStore::in_memory().await.unwrap();
        let file = File::new("a.py", "h1", "python");
        let function = Function::new("a.py", "foo", "def foo():", 1, 2).unwrap();
        let edge = GraphEdge::new(function.id.clone(), EntityType::Function, "other", EntityType::Function, EdgeType::Calls, "a.py");

        store
            .replace_file(FileReplacement { file: file.clone(), functions: vec![function.clone()], modules: vec![], edges: vec![edge] })
            .await
            .unwrap();

        let stored = store.get_function(&function.id).await.unwrap();
        assert_eq!(stored.name, "foo");
        assert_eq!(store.edges_from(&function.id).await.unwrap().len(), 1);

        let replacement_function = Function::new("a.py", "bar", "def bar():", 1, 2).unwrap();
        store
            .replace_file(FileReplacement {
                file,
                functions: vec![replacement_function.clone()],
                modules: vec![],
                edges: vec![],
            })
            .await
            .unwrap();

        assert!(store.get_function(&function.id).await.is_err());
        assert!(store.edges_from(&function.id).await.unwrap().is_empty());
        assert_eq!(store.get_function(&replacement_function.id).await.unwrap().name, "bar");
    }

    #[tokio::test]
    async fn context_pack_roundtrips_through_storage() {
        let store = SqliteLibrarianStore::in_memory().await.unwrap();
        let pack = ContextPack::new("p1", "function_summary", "fn1", "does x");
        store.save_context_pack(&pack).await.unwrap();
        let loaded = store.get_context_pack("p1").await.unwrap();
        assert_eq!(loaded.summary, "does x");
    }

    #[tokio::test]
    async fn get_missing_file_errs_not_found() {
        let store = SqliteLibrarianStore::in_memory().await.unwrap();
        let result = store.get_file("missing.py").await;
        assert!(result.is_err());
    }
}
