use crate::error::{OrchestratorError, Result};
use crate::job::StageId;
use std::collections::{HashMap, HashSet};

/// Derives per-stage cache keys from a job's workspace and run identity.
#[derive(Debug, Clone)]
pub struct CacheKeyManager {
    workspace_id: String,
    run_id: String,
}

impl CacheKeyManager {
    pub fn new(workspace_id: String, run_id: String) -> Self {
        Self { workspace_id, run_id }
    }

    pub fn key_for_stage(&self, stage: StageId) -> String {
        format!("{}:{}:{}", stage.as_str(), self.workspace_id, self.run_id)
    }
}

/// A node in the bootstrap pipeline's stage DAG.
#[derive(Debug, Clone)]
pub struct StageNode {
    pub id: StageId,
    pub name: &'static str,
    pub dependencies: Vec<StageId>,
    pub optional: bool,
    pub timeout_ms: u64,
}

impl StageNode {
    pub fn new(id: StageId, name: &'static str, dependencies: Vec<StageId>, optional: bool, timeout_ms: u64) -> Self {
        Self { id, name, dependencies, optional, timeout_ms }
    }
}

/// The bootstrap pipeline DAG, with a topologically-sorted execution order.
#[derive(Debug, Clone)]
pub struct PipelineDAG {
    stages: HashMap<StageId, StageNode>,
    execution_order: Vec<Vec<StageId>>,
}

impl PipelineDAG {
    pub fn new(stages: Vec<StageNode>) -> Result<Self> {
        let mut stage_map = HashMap::new();
        for stage in stages {
            stage_map.insert(stage.id, stage);
        }

        for stage in stage_map.values() {
            for dep in &stage.dependencies {
                if !stage_map.contains_key(dep) {
                    return Err(OrchestratorError::MissingDependency(format!(
                        "stage {:?} depends on non-existent stage {:?}",
                        stage.id, dep
                    )));
                }
            }
        }

        let execution_order = Self::topological_sort(&stage_map)?;
        Ok(Self { stages: stage_map, execution_order })
    }

    /// The six bootstrap steps: provider probe, file enumeration, parse &
    /// insert, embed, generate knowledge, report — a straight-line chain
    /// with each step gated on the previous one's output.
    pub fn default_pipeline() -> Result<Self> {
        let stages = vec![
            StageNode::new(StageId::ProviderProbe, "Provider Probe", vec![], false, 30_000),
            StageNode::new(StageId::FileEnumeration, "File Enumeration", vec![StageId::ProviderProbe], false, 60_000),
            StageNode::new(StageId::ParseAndInsert, "Parse & Insert", vec![StageId::FileEnumeration], false, 300_000),
            StageNode::new(StageId::Embed, "Embed", vec![StageId::ParseAndInsert], false, 300_000),
            StageNode::new(StageId::GenerateKnowledge, "Generate Knowledge", vec![StageId::Embed], false, 900_000),
            StageNode::new(StageId::Report, "Report", vec![StageId::GenerateKnowledge], false, 10_000),
        ];
        Self::new(stages)
    }

    fn topological_sort(stages: &HashMap<StageId, StageNode>) -> Result<Vec<Vec<StageId>>> {
        let mut in_degree: HashMap<StageId, usize> = stages.keys().map(|&id| (id, 0)).collect();

        for stage in stages.values() {
            for &_dep in &stage.dependencies {
                *in_degree.get_mut(&stage.id).unwrap() += 1;
            }
        }

        let mut result = Vec::new();
        let mut processed = HashSet::new();

        while processed.len() < stages.len() {
            let ready: Vec<StageId> = in_degree
                .iter()
                .filter(|(id, &degree)| degree == 0 && !processed.contains(*id))
                .map(|(&id, _)| id)
                .collect();

            if ready.is_empty() {
                return Err(OrchestratorError::DagCycleDetected);
            }

            result.push(ready.clone());

            for &stage_id in &ready {
                processed.insert(stage_id);
                in_degree.remove(&stage_id);

                for dependent in stages.values() {
                    if dependent.dependencies.contains(&stage_id) {
                        *in_degree.get_mut(&dependent.id).unwrap() -= 1;
                    }
                }
            }
        }

        Ok(result)
    }

    pub fn execution_order(&self) -> &[Vec<StageId>] {
        &self.execution_order
    }

    pub fn get_stage(&self, id: StageId) -> Option<&StageNode> {
        self.stages.get(&id)
    }

    pub fn execution_plan(&self) -> String {
        self.execution_order
            .iter()
            .enumerate()
            .map(|(i, group)| {
                let stage_names: Vec<_> = group.iter().map(|id| self.stages[id].name).collect();
                if group.len() > 1 {
                    format!("Phase {}: {} (parallel)", i + 1, stage_names.join(" + "))
                } else {
                    format!("Phase {}: {}", i + 1, stage_names[0])
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn required_cache_keys(&self, stage_id: StageId, cache_mgr: &CacheKeyManager) -> Vec<String> {
        let Some(stage) = self.stages.get(&stage_id) else { return vec![] };
        stage.dependencies.iter().map(|dep_id| cache_mgr.key_for_stage(*dep_id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_scoped_to_stage_workspace_and_run() {
        let mgr = CacheKeyManager::new("ws-1".to_string(), "run-1".to_string());
        assert_eq!(mgr.key_for_stage(StageId::ParseAndInsert), "parse_and_insert:ws-1:run-1");
    }

    #[test]
    fn default_pipeline_is_a_six_stage_chain() {
        let dag = PipelineDAG::default_pipeline().unwrap();
        let order = dag.execution_order();
        assert_eq!(order.len(), 6);
        for group in order {
            assert_eq!(group.len(), 1);
        }
        assert_eq!(order[0], vec![StageId::ProviderProbe]);
        assert_eq!(order[5], vec![StageId::Report]);
    }

    #[test]
    fn missing_dependency_is_rejected() {
        let stages = vec![StageNode::new(StageId::Embed, "Embed", vec![StageId::ParseAndInsert], false, 1000)];
        assert!(PipelineDAG::new(stages).is_err());
    }

    #[test]
    fn independent_stages_run_in_the_same_parallel_group() {
        let stages = vec![
            StageNode::new(StageId::ProviderProbe, "Provider Probe", vec![], false, 1000),
            StageNode::new(StageId::FileEnumeration, "File Enumeration", vec![], false, 1000),
        ];
        let dag = PipelineDAG::new(stages).unwrap();
        let order = dag.execution_order();
        assert_eq!(order.len(), 1);
        assert_eq!(order[0].len(), 2);
    }

    #[test]
    fn execution_plan_lists_every_phase() {
        let dag = PipelineDAG::default_pipeline().unwrap();
        let plan = dag.execution_plan();
        assert!(plan.contains("Phase 1:"));
        assert!(plan.contains("Provider Probe"));
        assert!(plan.contains("Report"));
    }

    #[test]
    fn required_cache_keys_resolve_to_the_dependency_stage() {
        let dag = PipelineDAG::default_pipeline().unwrap();
        let mgr = CacheKeyManager::new("ws-1".to_string(), "run-1".to_string());

        assert!(dag.required_cache_keys(StageId::ProviderProbe, &mgr).is_empty());

        let embed_keys = dag.required_cache_keys(StageId::Embed, &mgr);
        assert_eq!(embed_keys, vec!["parse_and_insert:ws-1:run-1".to_string()]);
    }
}
