//! Architecture overview: derives layers from top-level directory names
//! and summarizes cross-layer import counts into one synthesized pack.

use std::collections::HashMap;
use std::collections::HashSet;

use librarian_core::model::{ContextPack, EdgeType};
use librarian_storage::domain::LibrarianStore;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Interface,
    Application,
    Domain,
    Data,
    Infrastructure,
    Analysis,
    Utility,
    Other,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Interface => "interface",
            Layer::Application => "application",
            Layer::Domain => "domain",
            Layer::Data => "data",
            Layer::Infrastructure => "infrastructure",
            Layer::Analysis => "analysis",
            Layer::Utility => "utility",
            Layer::Other => "other",
        }
    }
}

const RECOGNIZED_LAYER_COUNT: f64 = 7.0; // excludes Other

/// Maps a file's top-level directory name to a layer via a fixed taxonomy.
pub fn layer_for_path(path: &str) -> Layer {
    let top = path.split('/').next().unwrap_or("").to_lowercase();
    match top.as_str() {
        "interface" | "interfaces" | "api" | "cli" => Layer::Interface,
        "application" | "app" | "service" | "services" => Layer::Application,
        "domain" | "core" | "model" | "models" => Layer::Domain,
        "data" | "storage" | "db" | "repository" | "repositories" => Layer::Data,
        "infrastructure" | "infra" => Layer::Infrastructure,
        "analysis" | "analytics" => Layer::Analysis,
        "utility" | "utils" | "util" | "common" | "shared" => Layer::Utility,
        _ => Layer::Other,
    }
}

/// Builds the single synthesized architecture-overview pack: recognized
/// layers present in the workspace, and cross-layer import counts.
pub async fn overview(store: &dyn LibrarianStore) -> Result<ContextPack> {
    let files = store.list_files().await?;

    let mut layers_seen: HashSet<Layer> = HashSet::new();
    let mut cross_layer_counts: HashMap<(Layer, Layer), u32> = HashMap::new();
    let mut dependency_edges = 0u32;

    for file in &files {
        let from_layer = layer_for_path(&file.path);
        layers_seen.insert(from_layer);

        let edges = store.edges_from(&file.path).await.unwrap_or_default();
        for edge in edges {
            if edge.edge_type == EdgeType::Imports {
                let to_layer = layer_for_path(&edge.to_id);
                *cross_layer_counts.entry((from_layer, to_layer)).or_insert(0) += 1;
                dependency_edges += 1;
            }
        }
    }

    let recognized = layers_seen.iter().filter(|l| !matches!(l, Layer::Other)).count() as f64;
    let layer_score = (recognized / RECOGNIZED_LAYER_COUNT).min(1.0);
    let edge_score = (dependency_edges.min(20) as f64 / 20.0).min(1.0);
    let confidence = ((layer_score * 0.5) + (edge_score * 0.5)).min(0.9);

    let mut summary_lines: Vec<String> = cross_layer_counts
        .iter()
        .map(|((from, to), count)| format!("{} -> {}: {} import(s)", from.as_str(), to.as_str(), count))
        .collect();
    summary_lines.sort();

    let summary = if summary_lines.is_empty() {
        "No cross-layer imports observed.".to_string()
    } else {
        summary_lines.join("; ")
    };

    let mut pack = ContextPack::new("architecture:overview:1", "architecture_overview", "workspace", summary);
    pack.key_facts = summary_lines;
    pack.set_confidence(confidence);
    Ok(pack)
}
