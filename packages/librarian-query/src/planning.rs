//! `PlanTask(taskDescription, workspace) -> TaskPlan` — turns a free-text
//! task description into an ordered, scoped plan by combining keyword
//! classification with a structural retrieval pass over the workspace.

use librarian_core::ports::EmbedPort;
use librarian_storage::domain::LibrarianStore;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskClassification {
    BugFix,
    FeatureAdd,
    FeatureModify,
    Refactor,
    Performance,
    Security,
    Documentation,
    Test,
    DependencyUpdate,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Complexity {
    Trivial,
    Simple,
    Moderate,
    Complex,
    Epic,
}

#[derive(Debug, Clone)]
pub struct TaskPlan {
    pub classification: TaskClassification,
    pub complexity: Complexity,
    pub steps: Vec<String>,
    pub context_files: Vec<String>,
    pub files_to_modify: Vec<String>,
    pub tests_required: Vec<String>,
    pub risks: Vec<String>,
    pub preflight_checks: Vec<String>,
    pub confidence: f64,
}

fn classify_task(description: &str) -> TaskClassification {
    let lower = description.to_lowercase();
    let has = |terms: &[&str]| terms.iter().any(|t| lower.contains(t));

    if has(&["fix", "bug", "crash", "broken"]) {
        TaskClassification::BugFix
    } else if has(&["add", "new feature", "implement"]) {
        TaskClassification::FeatureAdd
    } else if has(&["change", "modify", "update the behavior"]) {
        TaskClassification::FeatureModify
    } else if has(&["refactor", "clean up", "restructure"]) {
        TaskClassification::Refactor
    } else if has(&["slow", "performance", "latency", "optimize"]) {
        TaskClassification::Performance
    } else if has(&["security", "vulnerability", "auth", "exploit"]) {
        TaskClassification::Security
    } else if has(&["document", "readme", "comment"]) {
        TaskClassification::Documentation
    } else if has(&["test", "coverage", "spec"]) {
        TaskClassification::Test
    } else if has(&["upgrade", "bump", "dependency", "version"]) {
        TaskClassification::DependencyUpdate
    } else if has(&["config", "env", "setting"]) {
        TaskClassification::Configuration
    } else {
        TaskClassification::FeatureModify
    }
}

fn complexity_for(classification: TaskClassification, affected_file_count: usize) -> Complexity {
    let base = match classification {
        TaskClassification::Documentation | TaskClassification::Configuration => Complexity::Trivial,
        TaskClassification::BugFix | TaskClassification::Test | TaskClassification::DependencyUpdate => {
            Complexity::Simple
        }
        TaskClassification::FeatureModify | TaskClassification::Performance => Complexity::Moderate,
        TaskClassification::FeatureAdd | TaskClassification::Security => Complexity::Complex,
        TaskClassification::Refactor => Complexity::Complex,
    };
    match affected_file_count {
        0..=2 => base,
        3..=8 => base.max(Complexity::Moderate),
        _ => Complexity::Epic,
    }
}

fn steps_for(classification: TaskClassification) -> Vec<String> {
    match classification {
        TaskClassification::BugFix => vec![
            "Reproduce the reported failure".to_string(),
            "Locate the function(s) implicated by the symptom".to_string(),
            "Write a failing test that captures the bug".to_string(),
            "Apply the smallest fix that makes the test pass".to_string(),
        ],
        TaskClassification::FeatureAdd => vec![
            "Identify the module the new capability belongs to".to_string(),
            "Design the public surface (types, function signatures)".to_string(),
            "Implement and wire the new code path".to_string(),
            "Add tests covering the new behavior".to_string(),
        ],
        TaskClassification::Refactor => vec![
            "Confirm existing tests cover current behavior".to_string(),
            "Restructure without changing observable behavior".to_string(),
            "Re-run the full test suite".to_string(),
        ],
        _ => vec!["Locate the affected code".to_string(), "Apply the change".to_string(), "Verify with tests".to_string()],
    }
}

fn risks_for(classification: TaskClassification) -> Vec<String> {
    match classification {
        TaskClassification::Security => vec!["Fix may be incomplete against related attack variants".to_string()],
        TaskClassification::DependencyUpdate => vec!["Transitive breaking changes in the updated dependency".to_string()],
        TaskClassification::Refactor => vec!["Behavior drift not covered by existing tests".to_string()],
        _ => vec![],
    }
}

/// Builds a task plan from a free-text description, using structural
/// retrieval against `affected_files` (when given) to ground `context_files`
/// and `files_to_modify` in the actual workspace rather than guesswork.
pub async fn plan_task(
    store: &dyn LibrarianStore,
    _embed: &dyn EmbedPort,
    description: &str,
    affected_files: &[String],
) -> Result<TaskPlan> {
    let classification = classify_task(description);

    let mut context_files = Vec::new();
    for path in affected_files {
        context_files.push(path.clone());
        if let Ok(edges) = store.edges_from(path).await {
            for edge in edges {
                if !context_files.contains(&edge.to_id) {
                    context_files.push(edge.to_id);
                }
            }
        }
    }

    let complexity = complexity_for(classification, affected_files.len());
    let steps = steps_for(classification);
    let tests_required = affected_files.iter().map(|f| format!("tests covering {f}")).collect();
    let preflight_checks = vec!["Run the existing test suite before making changes".to_string()];
    let confidence = if affected_files.is_empty() { 0.4 } else { 0.7 };

    Ok(TaskPlan {
        classification,
        complexity,
        steps,
        context_files,
        files_to_modify: affected_files.to_vec(),
        tests_required,
        risks: risks_for(classification),
        preflight_checks,
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use librarian_core::model::{EdgeType, EntityType, File, GraphEdge};
    use librarian_core::ports::HashEmbedPort;
    use librarian_storage::domain::FileReplacement;
    use librarian_storage::SqliteLibrarianStore;

    #[tokio::test]
    async fn bug_fix_language_classifies_as_bug_fix_with_simple_complexity() {
        let store = SqliteLibrarianStore::in_memory().await.unwrap();
        let embed = HashEmbedPort;
        let plan = plan_task(&store, &embed, "Fix the crash when dividing by zero", &[]).await.unwrap();
        assert_eq!(plan.classification, TaskClassification::BugFix);
        assert_eq!(plan.complexity, Complexity::Simple);
    }

    #[tokio::test]
    async fn affected_files_pull_in_their_import_targets_as_context() {
        let store = SqliteLibrarianStore::in_memory().await.unwrap();
        let edge = GraphEdge::new("a.ts", EntityType::File, "b.ts", EntityType::File, EdgeType::Imports, "a.ts");
        store
            .replace_file(FileReplacement {
                file: File::new("a.ts", "h1", "typescript"),
                functions: vec![],
                modules: vec![],
                edges: vec![edge],
            })
            .await
            .unwrap();

        let embed = HashEmbedPort;
        let plan = plan_task(&store, &embed, "Add input validation", &["a.ts".to_string()]).await.unwrap();
        assert!(plan.context_files.contains(&"b.ts".to_string()));
    }
}
