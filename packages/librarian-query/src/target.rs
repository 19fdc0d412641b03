//! Target resolution: turns a free-text target string from an intent
//! into a concrete entity id, trying progressively looser matches.

use librarian_core::model::EntityType;
use librarian_storage::domain::LibrarianStore;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub entity_id: String,
    pub entity_type: EntityType,
    /// Up to five alternative matches, for diagnostic output only.
    pub alternatives: Vec<String>,
}

const MAX_ALTERNATIVES: usize = 5;

/// Resolves `target` against the store by, in order: indexed function-name
/// lookup, exact module-path match, name-without-extension, substring, and
/// finally the raw string itself as a last-resort path.
pub async fn resolve(store: &dyn LibrarianStore, target: &str) -> Result<ResolvedTarget> {
    let trimmed = target.trim();

    let by_name = store.find_functions_by_name(trimmed).await;
    if let Ok(matches) = by_name {
        if let Some(first) = matches.first() {
            let alternatives = matches.iter().skip(1).take(MAX_ALTERNATIVES).map(|f| f.id.clone()).collect();
            return Ok(ResolvedTarget { entity_id: first.id.clone(), entity_type: EntityType::Function, alternatives });
        }
    }

    if let Ok(module) = store.get_module_by_path(trimmed).await {
        return Ok(ResolvedTarget { entity_id: module.id, entity_type: EntityType::Module, alternatives: vec![] });
    }

    let without_extension = trimmed.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(trimmed);
    if without_extension != trimmed {
        if let Ok(module) = store.get_module_by_path(without_extension).await {
            return Ok(ResolvedTarget { entity_id: module.id, entity_type: EntityType::Module, alternatives: vec![] });
        }
    }

    if let Ok(files) = store.list_files().await {
        let matches: Vec<_> = files.into_iter().filter(|f| f.path.contains(trimmed)).collect();
        if let Some(first) = matches.first() {
            let alternatives = matches.iter().skip(1).take(MAX_ALTERNATIVES).map(|f| f.path.clone()).collect();
            return Ok(ResolvedTarget { entity_id: first.path.clone(), entity_type: EntityType::File, alternatives });
        }
    }

    Ok(ResolvedTarget { entity_id: trimmed.to_string(), entity_type: EntityType::File, alternatives: vec![] })
}

#[cfg(test)]
mod tests {
    use super::*;
    use librarian_core::model::{File, Function};
    use librarian_storage::domain::FileReplacement;
    use librarian_storage::SqliteLibrarianStore;

    #[tokio::test]
    async fn resolves_a_function_by_name() {
        let store = SqliteLibrarianStore::in_memory().await.unwrap();
        let function = Function::new("a.py", "average", "def average(xs):", 1, 3).unwrap();
        let file = File::new("a.py", &function.hash, "python");
        store
            .replace_file(FileReplacement { file, functions: vec![function.clone()], modules: vec![], edges: vec![] })
            .await
            .unwrap();

        let resolved = resolve(&store, "average").await.unwrap();
        assert_eq!(resolved.entity_id, function.id);
        assert_eq!(resolved.entity_type, EntityType::Function);
    }

    #[tokio::test]
    async fn falls_back_to_substring_match_on_file_path() {
        let store = SqliteLibrarianStore::in_memory().await.unwrap();
        let file = File::new("storage/types.ts", "h1", "typescript");
        store.save_file(&file).await.unwrap();

        let resolved = resolve(&store, "types.ts").await.unwrap();
        assert_eq!(resolved.entity_id, "storage/types.ts");
        assert_eq!(resolved.entity_type, EntityType::File);
    }

    #[tokio::test]
    async fn unresolvable_target_falls_back_to_the_raw_string() {
        let store = SqliteLibrarianStore::in_memory().await.unwrap();
        let resolved = resolve(&store, "nonexistent/path.rs").await.unwrap();
        assert_eq!(resolved.entity_id, "nonexistent/path.rs");
    }
}
