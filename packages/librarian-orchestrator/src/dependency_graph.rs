//! Reverse-import index: lets incremental bootstrap runs widen a literal
//! changed-file set to everything that transitively imports it, built
//! straight from the `imports` edges already recorded by a prior parse.
use librarian_core::model::{EdgeType, EntityType, GraphEdge};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

pub type FileId = PathBuf;

/// Maps a file to every file that imports it.
#[derive(Debug, Clone, Default)]
pub struct ReverseDependencyIndex {
    importers: HashMap<FileId, Vec<FileId>>,
}

impl ReverseDependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from recorded graph edges, keeping only file-to-file
    /// `imports` edges; other edge types (calls, extends, ...) don't widen
    /// reindex scope.
    pub fn from_edges(edges: &[GraphEdge]) -> Self {
        let mut index = Self::new();
        for edge in edges {
            if edge.edge_type == EdgeType::Imports && edge.from_type == EntityType::File && edge.to_type == EntityType::File {
                index.add_import(PathBuf::from(&edge.from_id), PathBuf::from(&edge.to_id));
            }
        }
        index
    }

    /// Records that `importer` imports `imported`.
    pub fn add_import(&mut self, importer: FileId, imported: FileId) {
        self.importers.entry(imported).or_default().push(importer);
    }

    /// Every file that imports `file`, directly.
    pub fn importers_of(&self, file: &Path) -> HashSet<FileId> {
        self.importers.get(file).cloned().into_iter().flatten().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.importers.is_empty()
    }

    /// Total number of recorded import edges.
    pub fn len(&self) -> usize {
        self.importers.values().map(|v| v.len()).sum()
    }
}

/// BFS over the reverse-import index: starting from `changed_files`,
/// repeatedly pulls in importers until no new file is reached.
pub fn compute_affected_files(changed_files: &HashSet<PathBuf>, index: &ReverseDependencyIndex) -> HashSet<PathBuf> {
    let mut affected = HashSet::new();
    let mut queue = VecDeque::new();

    for file in changed_files {
        affected.insert(file.clone());
        queue.push_back(file.clone());
    }

    while let Some(current_file) = queue.pop_front() {
        for importer in index.importers_of(&current_file) {
            if affected.insert(importer.clone()) {
                queue.push_back(importer);
            }
        }
    }

    affected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn import_edge(from: &str, to: &str) -> GraphEdge {
        GraphEdge::new(from, EntityType::File, to, EntityType::File, EdgeType::Imports, from)
    }

    #[test]
    fn an_import_edge_makes_its_target_importer_visible() {
        let mut index = ReverseDependencyIndex::new();
        index.add_import(PathBuf::from("A.py"), PathBuf::from("B.py"));

        let importers = index.importers_of(Path::new("B.py"));
        assert_eq!(importers.len(), 1);
        assert!(importers.contains(&PathBuf::from("A.py")));
    }

    #[test]
    fn from_edges_ignores_non_import_and_non_file_edges() {
        let edges = vec![
            import_edge("A.py", "B.py"),
            GraphEdge::new("fn_x", EntityType::Function, "fn_y", EntityType::Function, EdgeType::Calls, "A.py"),
        ];
        let index = ReverseDependencyIndex::from_edges(&edges);
        assert_eq!(index.len(), 1);
        assert!(index.importers_of(Path::new("B.py")).contains(&PathBuf::from("A.py")));
    }

    #[test]
    fn a_file_can_have_more_than_one_importer() {
        let mut index = ReverseDependencyIndex::new();
        index.add_import(PathBuf::from("A.py"), PathBuf::from("B.py"));
        index.add_import(PathBuf::from("C.py"), PathBuf::from("B.py"));

        let importers = index.importers_of(Path::new("B.py"));
        assert_eq!(importers.len(), 2);
        assert!(importers.contains(&PathBuf::from("A.py")));
        assert!(importers.contains(&PathBuf::from("C.py")));
    }

    #[test]
    fn a_changed_file_with_no_importers_affects_only_itself() {
        let index = ReverseDependencyIndex::new();
        let changed = HashSet::from([PathBuf::from("A.py")]);

        let affected = compute_affected_files(&changed, &index);

        assert_eq!(affected.len(), 1);
        assert!(affected.contains(&PathBuf::from("A.py")));
    }

    #[test]
    fn affected_status_propagates_through_a_chain() {
        let mut index = ReverseDependencyIndex::new();
        index.add_import(PathBuf::from("B.py"), PathBuf::from("A.py"));
        index.add_import(PathBuf::from("C.py"), PathBuf::from("B.py"));

        let changed = HashSet::from([PathBuf::from("A.py")]);
        let affected = compute_affected_files(&changed, &index);

        assert_eq!(affected.len(), 3);
        assert!(affected.contains(&PathBuf::from("A.py")));
        assert!(affected.contains(&PathBuf::from("B.py")));
        assert!(affected.contains(&PathBuf::from("C.py")));
    }

    #[test]
    fn affected_status_propagates_through_a_diamond() {
        let mut index = ReverseDependencyIndex::new();
        index.add_import(PathBuf::from("B.py"), PathBuf::from("A.py"));
        index.add_import(PathBuf::from("C.py"), PathBuf::from("A.py"));
        index.add_import(PathBuf::from("D.py"), PathBuf::from("B.py"));
        index.add_import(PathBuf::from("D.py"), PathBuf::from("C.py"));

        let changed = HashSet::from([PathBuf::from("A.py")]);
        let affected = compute_affected_files(&changed, &index);

        assert_eq!(affected.len(), 4);
        for f in ["A.py", "B.py", "C.py", "D.py"] {
            assert!(affected.contains(&PathBuf::from(f)));
        }
    }

    #[test]
    fn independent_changed_files_union_their_affected_sets() {
        let mut index = ReverseDependencyIndex::new();
        index.add_import(PathBuf::from("A.py"), PathBuf::from("B.py"));
        index.add_import(PathBuf::from("C.py"), PathBuf::from("D.py"));

        let changed = HashSet::from([PathBuf::from("B.py"), PathBuf::from("D.py")]);
        let affected = compute_affected_files(&changed, &index);

        assert_eq!(affected.len(), 4);
    }
}
