//! Retrieval: structural graph traversal and semantic similarity search,
//! merged into one candidate list before scoring.

use std::collections::{HashMap, HashSet, VecDeque};

use librarian_core::model::EntityType;
use librarian_core::ports::EmbedPort;
use librarian_storage::domain::LibrarianStore;

use crate::error::Result;
use crate::intent::Direction;
use crate::target::ResolvedTarget;

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub entity_id: String,
    pub entity_type: EntityType,
    pub score: f64,
    pub depth: usize,
}

/// `GetGraphEdges`-driven structural retrieval: one hop in the requested
/// direction, or an exhaustive BFS when the intent asked for "all"/"every".
pub async fn structural(
    store: &dyn LibrarianStore,
    resolved: &ResolvedTarget,
    direction: Direction,
    exhaustive: bool,
    max_depth: usize,
) -> Result<Vec<Candidate>> {
    let mut depths: HashMap<String, usize> = HashMap::new();
    let mut queue = VecDeque::new();
    depths.insert(resolved.entity_id.clone(), 0);
    queue.push_back(resolved.entity_id.clone());

    let limit = if exhaustive { max_depth } else { 1 };

    while let Some(current) = queue.pop_front() {
        let current_depth = depths[&current];
        if current_depth >= limit {
            continue;
        }

        let edges = match direction {
            Direction::Dependents => store.edges_to(&current).await?,
            Direction::Dependencies => store.edges_from(&current).await?,
        };

        for edge in edges {
            let neighbor = match direction {
                Direction::Dependents => edge.from_id,
                Direction::Dependencies => edge.to_id,
            };
            if !depths.contains_key(&neighbor) {
                depths.insert(neighbor.clone(), current_depth + 1);
                queue.push_back(neighbor);
            }
        }
    }

    depths.remove(&resolved.entity_id);

    let mut candidates: Vec<Candidate> = depths
        .into_iter()
        .map(|(entity_id, depth)| Candidate { entity_id, entity_type: resolved.entity_type, score: 0.9, depth })
        .collect();

    candidates.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.entity_id.cmp(&b.entity_id)));
    Ok(candidates)
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    ((dot / (norm_a * norm_b)) as f64).clamp(-1.0, 1.0)
}

/// Embeds the query text and ranks every stored entity with an embedding
/// by cosine similarity, keeping the top `top_k`.
pub async fn semantic(
    store: &dyn LibrarianStore,
    embed: &dyn EmbedPort,
    query_text: &str,
    top_k: usize,
) -> Result<Vec<Candidate>> {
    let response = embed
        .embed(librarian_core::ports::EmbedRequest { model_id: "query".to_string(), texts: vec![query_text.to_string()] })
        .await
        .map_err(crate::error::QueryError::Core)?;
    let query_vector = match response.vectors.into_iter().next() {
        Some(v) => v,
        None => return Ok(Vec::new()),
    };

    let records = store.knowledge_records_with_embeddings().await?;
    let mut candidates: Vec<Candidate> = records
        .into_iter()
        .filter_map(|record| {
            let embedding = record.embedding.as_ref()?;
            let score = (cosine_similarity(&query_vector, embedding) + 1.0) / 2.0;
            let entity_type = match record.entity_kind {
                librarian_core::model::EntityKind::Function => EntityType::Function,
                librarian_core::model::EntityKind::Module => EntityType::Module,
            };
            Some(Candidate { entity_id: record.entity_id, entity_type, score, depth: 0 })
        })
        .collect();

    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
    candidates.truncate(top_k);
    Ok(candidates)
}

/// Merges structural and semantic candidates, boosting structural hits
/// into the 0.85-0.95 score band and deduplicating by entity id, keeping
/// the higher score when both paths found the same entity.
pub fn merge(structural: Vec<Candidate>, semantic: Vec<Candidate>) -> Vec<Candidate> {
    let mut by_id: HashMap<String, Candidate> = HashMap::new();

    for mut candidate in structural {
        let boosted = 0.95 - (candidate.depth.min(10) as f64) * 0.01;
        candidate.score = boosted.max(0.85);
        by_id.insert(candidate.entity_id.clone(), candidate);
    }

    for candidate in semantic {
        by_id
            .entry(candidate.entity_id.clone())
            .and_modify(|existing| existing.score = existing.score.max(candidate.score))
            .or_insert(candidate);
    }

    let seen: HashSet<String> = by_id.keys().cloned().collect();
    let mut merged: Vec<Candidate> = seen.into_iter().map(|id| by_id.remove(&id).unwrap()).collect();
    merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use librarian_core::model::{EdgeType, EntityType as ET, GraphEdge};
    use librarian_core::ports::HashEmbedPort;
    use librarian_storage::SqliteLibrarianStore;

    #[tokio::test]
    async fn one_hop_dependents_finds_the_direct_importer() {
        let store = SqliteLibrarianStore::in_memory().await.unwrap();
        let edge = GraphEdge::new("a.py", ET::File, "b.py", ET::File, EdgeType::Imports, "a.py");
        store
            .replace_file(librarian_storage::domain::FileReplacement {
                file: librarian_core::model::File::new("a.py", "h1", "python"),
                functions: vec![],
                modules: vec![],
                edges: vec![edge],
            })
            .await
            .unwrap();

        let resolved = ResolvedTarget { entity_id: "b.py".to_string(), entity_type: ET::File, alternatives: vec![] };
        let candidates = structural(&store, &resolved, Direction::Dependents, false, 10).await.unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].entity_id, "a.py");
    }

    #[tokio::test]
    async fn exhaustive_mode_follows_the_chain_transitively() {
        let store = SqliteLibrarianStore::in_memory().await.unwrap();
        let e1 = GraphEdge::new("a.py", ET::File, "b.py", ET::File, EdgeType::Imports, "a.py");
        let e2 = GraphEdge::new("b.py", ET::File, "c.py", ET::File, EdgeType::Imports, "b.py");
        store
            .replace_file(librarian_storage::domain::FileReplacement {
                file: librarian_core::model::File::new("a.py", "h1", "python"),
                functions: vec![],
                modules: vec![],
                edges: vec![e1],
            })
            .await
            .unwrap();
        store
            .replace_file(librarian_storage::domain::FileReplacement {
                file: librarian_core::model::File::new("b.py", "h2", "python"),
                functions: vec![],
                modules: vec![],
                edges: vec![e2],
            })
            .await
            .unwrap();

        let resolved = ResolvedTarget { entity_id: "c.py".to_string(), entity_type: ET::File, alternatives: vec![] };
        let candidates = structural(&store, &resolved, Direction::Dependents, true, 10).await.unwrap();

        let ids: Vec<_> = candidates.iter().map(|c| c.entity_id.as_str()).collect();
        assert!(ids.contains(&"a.py"));
        assert!(ids.contains(&"b.py"));
    }

    #[tokio::test]
    async fn semantic_retrieval_ranks_stored_embeddings_by_similarity() {
        let store = SqliteLibrarianStore::in_memory().await.unwrap();
        let mut record = librarian_core::model::UniversalKnowledgeRecord::new(
            "fn1",
            librarian_core::model::EntityKind::Function,
            "h1",
        );
        record.embedding = Some(vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        store.save_knowledge_record(&record).await.unwrap();

        let embed = HashEmbedPort;
        let candidates = semantic(&store, &embed, "fn1", 5).await.unwrap();
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn merge_boosts_structural_hits_into_the_high_band() {
        let structural = vec![Candidate { entity_id: "a".to_string(), entity_type: ET::File, score: 0.0, depth: 0 }];
        let merged = merge(structural, vec![]);
        assert!(merged[0].score >= 0.85 && merged[0].score <= 0.95);
    }
}
