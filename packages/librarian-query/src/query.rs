//! Top-level `Query` API: wires intent classification, target resolution,
//! retrieval, scoring and synthesis into one library entry point.

use std::sync::Arc;

use librarian_core::model::{ContextPack, EntityType};
use librarian_core::ports::{ChatPort, EmbedPort};
use librarian_storage::domain::LibrarianStore;
use tracing::info;

use crate::error::Result;
use crate::intent::{classify, Direction, Intent};
use crate::retrieval::{self, Candidate};
use crate::scoring::{self, Perspective, SignalVector};
use crate::synthesis::{self, Synthesis};
use crate::target;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    L0,
    L1,
    L2,
}

#[derive(Debug, Clone)]
pub struct Query {
    pub intent: String,
    pub depth: Depth,
    pub task_type: Option<String>,
    pub perspective: Option<Perspective>,
    pub affected_files: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct QueryResult {
    pub packs: Vec<ContextPack>,
    pub synthesis: Option<Synthesis>,
    pub total_confidence: f64,
    pub drill_down_hints: Vec<String>,
    pub trace_id: Option<String>,
}

const MAX_DEPTH: usize = 10;

fn top_k_for(depth: Depth) -> usize {
    match depth {
        Depth::L0 => 3,
        Depth::L1 => 8,
        Depth::L2 => 20,
    }
}

fn candidate_to_pack(candidate: &Candidate) -> ContextPack {
    let pack_type = match candidate.entity_type {
        EntityType::Function => "function_summary",
        EntityType::Module => "module_summary",
        EntityType::File => "file_summary",
    };
    let pack_id = format!("{pack_type}:{}:1", candidate.entity_id);
    let mut pack = ContextPack::new(pack_id, pack_type, candidate.entity_id.clone(), candidate.entity_id.clone());
    pack.set_confidence(candidate.score);
    pack
}

/// Runs the full query pipeline: classify, resolve, retrieve, score,
/// synthesize, then bump access counts.
pub async fn run(
    store: &dyn LibrarianStore,
    chat: &dyn ChatPort,
    embed: &dyn EmbedPort,
    query: &Query,
) -> Result<QueryResult> {
    let intent = classify(&query.intent);
    info!(depth = ?query.depth, "classified query intent: {:?}", intent);

    if let Intent::Architectural = intent {
        let pack = crate::architecture::overview(store).await?;
        let confidence = pack.confidence;
        let mut packs = vec![pack];
        record_access(store, &mut packs).await?;
        return Ok(QueryResult { packs, synthesis: None, total_confidence: confidence, drill_down_hints: vec![], trace_id: None });
    }

    let top_k = top_k_for(query.depth);
    let candidates = match &intent {
        Intent::Structural { direction, target: target_text, exhaustive } => {
            let resolved = target::resolve(store, target_text).await?;
            let structural = retrieval::structural(store, &resolved, *direction, *exhaustive, MAX_DEPTH).await?;
            let semantic = retrieval::semantic(store, embed, &query.intent, top_k).await.unwrap_or_default();
            retrieval::merge(structural, semantic)
        }
        _ => retrieval::semantic(store, embed, &query.intent, top_k).await.unwrap_or_default(),
    };

    let perspective = query.perspective.unwrap_or(Perspective::Understanding);
    let mut scored: Vec<(f64, Candidate)> = candidates
        .into_iter()
        .map(|candidate| {
            let mut signals = SignalVector::default();
            signals.0.insert(crate::scoring::Signal::Semantic, candidate.score);
            signals.0.insert(crate::scoring::Signal::Structural, if candidate.depth > 0 { 0.9 } else { 0.3 });
            let s = scoring::score(perspective, candidate.entity_type, &signals, &candidate.entity_id);
            (s.max(candidate.score * 0.5), candidate)
        })
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap().then_with(|| a.1.entity_id.cmp(&b.1.entity_id)));
    scored.truncate(top_k);

    let mut packs: Vec<ContextPack> = scored
        .into_iter()
        .map(|(final_score, mut candidate)| {
            candidate.score = final_score;
            candidate_to_pack(&candidate)
        })
        .collect();

    let synthesis = if std::env::var("LIBRARIAN_QUERY_DISABLE_SYNTHESIS").as_deref() == Ok("1") {
        None
    } else {
        synthesis::synthesize(chat, &query.intent, &packs).await
    };

    let total_confidence = if packs.is_empty() {
        0.0
    } else {
        packs.iter().map(|p| p.confidence).sum::<f64>() / packs.len() as f64
    };

    record_access(store, &mut packs).await?;

    info!(pack_count = packs.len(), total_confidence, "query completed");
    Ok(QueryResult { packs, synthesis, total_confidence, drill_down_hints: vec![], trace_id: None })
}

async fn record_access(store: &dyn LibrarianStore, packs: &mut [ContextPack]) -> Result<()> {
    for pack in packs.iter_mut() {
        pack.record_access();
        let _ = store.save_context_pack(pack).await;
    }
    Ok(())
}

/// Shared ports a `QueryEngine` closes over, so sessions can run repeated
/// queries without threading every port through every call.
#[derive(Clone)]
pub struct QueryEngine {
    pub store: Arc<dyn LibrarianStore>,
    pub chat: Arc<dyn ChatPort>,
    pub embed: Arc<dyn EmbedPort>,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn LibrarianStore>, chat: Arc<dyn ChatPort>, embed: Arc<dyn EmbedPort>) -> Self {
        Self { store, chat, embed }
    }

    pub async fn query(&self, query: &Query) -> Result<QueryResult> {
        run(self.store.as_ref(), self.chat.as_ref(), self.embed.as_ref(), query).await
    }
}
