//! Execution planning: level-batched topological order (Kahn's algorithm).

mod graph;

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

use crate::model::{Edge, Node};

pub use graph::DependencyGraph;

/// Why a graph cannot be planned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("Circular dependency detected in workflow")]
    CircularDependency {
        /// Nodes that never became ready, in array order.
        unresolved: Vec<String>,
    },
    #[error("edge {edge_id} references unknown node {node_id}")]
    UnknownNode { edge_id: String, node_id: String },
    #[error("duplicate node id: {node_id}")]
    DuplicateNode { node_id: String },
}

impl PlanError {
    pub fn is_cycle(&self) -> bool {
        matches!(self, PlanError::CircularDependency { .. })
    }
}

/// Ordered batches. Every node appears exactly once; nodes in one batch have no
/// ordering constraint between them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExecutionPlan {
    batches: Vec<Vec<String>>,
}

impl ExecutionPlan {
    pub fn batches(&self) -> &[Vec<String>] {
        &self.batches
    }

    /// Number of batches.
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Number of planned nodes across all batches.
    pub fn node_count(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vec<String>> {
        self.batches.iter()
    }

    pub fn into_batches(self) -> Vec<Vec<String>> {
        self.batches
    }
}

impl<'a> IntoIterator for &'a ExecutionPlan {
    type Item = &'a Vec<String>;
    type IntoIter = std::slice::Iter<'a, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.batches.iter()
    }
}

/// Group nodes into dependency levels.
///
/// Batch 0 holds every node without incoming edges, batch k every node whose dependencies
/// all sit in batches `< k`. Within a batch nodes keep their order in `nodes`. Fails without
/// a partial plan when some node can never become ready.
pub fn build_execution_plan(nodes: &[Node], edges: &[Edge]) -> Result<ExecutionPlan, PlanError> {
    let graph = DependencyGraph::new(nodes, edges)?;
    let mut visited: HashSet<&str> = HashSet::with_capacity(nodes.len());
    let mut remaining: Vec<&str> = graph.node_ids().to_vec();
    let mut batches = Vec::new();

    while !remaining.is_empty() {
        let (ready, blocked): (Vec<&str>, Vec<&str>) = remaining.into_iter().partition(|id| {
            graph
                .dependencies_of(id)
                .iter()
                .all(|dep| visited.contains(dep))
        });
        if ready.is_empty() {
            tracing::debug!(unresolved = blocked.len(), "plan stalled on a cycle");
            return Err(PlanError::CircularDependency {
                unresolved: blocked.into_iter().map(String::from).collect(),
            });
        }
        visited.extend(ready.iter().copied());
        batches.push(ready.into_iter().map(String::from).collect());
        remaining = blocked;
    }

    tracing::debug!(batches = batches.len(), nodes = nodes.len(), "built execution plan");
    Ok(ExecutionPlan { batches })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeType, WorkflowGraph};

    fn plan(graph: &WorkflowGraph) -> Result<Vec<Vec<String>>, PlanError> {
        build_execution_plan(&graph.nodes, &graph.edges).map(ExecutionPlan::into_batches)
    }

    fn ids(batch: &[&str]) -> Vec<String> {
        batch.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_graph_plans_to_nothing() {
        let batches = plan(&WorkflowGraph::default()).unwrap();
        assert!(batches.is_empty());
    }

    #[test]
    fn edgeless_nodes_share_one_batch() {
        let graph = WorkflowGraph::builder()
            .node("a", NodeType::Action)
            .node("b", NodeType::Action)
            .node("c", NodeType::Action)
            .node("d", NodeType::Action)
            .build();
        assert_eq!(plan(&graph).unwrap(), vec![ids(&["a", "b", "c", "d"])]);
    }

    #[test]
    fn chain_plans_one_node_per_batch() {
        let graph = WorkflowGraph::builder()
            .node("A", NodeType::Start)
            .node("B", NodeType::Action)
            .node("C", NodeType::End)
            .link("A", "B")
            .link("B", "C")
            .build();
        assert_eq!(
            plan(&graph).unwrap(),
            vec![ids(&["A"]), ids(&["B"]), ids(&["C"])]
        );
    }

    #[test]
    fn diamond_batches_siblings_together() {
        let graph = WorkflowGraph::builder()
            .node("A", NodeType::Start)
            .node("B", NodeType::Action)
            .node("C", NodeType::Action)
            .node("D", NodeType::End)
            .link("A", "B")
            .link("A", "C")
            .link("B", "D")
            .link("C", "D")
            .build();
        let batches = plan(&graph).unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0], ids(&["A"]));
        let middle: HashSet<&str> = batches[1].iter().map(String::as_str).collect();
        assert_eq!(middle, HashSet::from(["B", "C"]));
        assert_eq!(batches[2], ids(&["D"]));
    }

    #[test]
    fn batch_order_follows_node_array_order() {
        let graph = WorkflowGraph::builder()
            .node("z", NodeType::Start)
            .node("m", NodeType::Action)
            .node("b", NodeType::Action)
            .link("z", "m")
            .link("z", "b")
            .build();
        let plan = build_execution_plan(&graph.nodes, &graph.edges).unwrap();
        assert_eq!(plan.batches()[1], ids(&["m", "b"]));
        assert_eq!(plan.node_count(), 3);
    }

    #[test]
    fn two_node_cycle_is_detected() {
        let graph = WorkflowGraph::builder()
            .node("A", NodeType::Action)
            .node("B", NodeType::Action)
            .link("A", "B")
            .link("B", "A")
            .build();
        let err = plan(&graph).unwrap_err();
        assert!(err.is_cycle());
        assert!(err.to_string().contains("Circular dependency"));
    }

    #[test]
    fn cycle_downstream_of_valid_prefix_returns_no_partial_plan() {
        let graph = WorkflowGraph::builder()
            .node("s", NodeType::Start)
            .node("a", NodeType::Action)
            .node("b", NodeType::Action)
            .link("s", "a")
            .link("a", "b")
            .link("b", "a")
            .build();
        match plan(&graph) {
            Err(PlanError::CircularDependency { unresolved }) => {
                assert_eq!(unresolved, ids(&["a", "b"]));
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let graph = WorkflowGraph::builder()
            .node("a", NodeType::Action)
            .link("a", "a")
            .build();
        assert!(plan(&graph).unwrap_err().is_cycle());
    }

    #[test]
    fn edge_to_missing_node_fails_instead_of_dropping() {
        let graph = WorkflowGraph::builder()
            .node("a", NodeType::Start)
            .link("ghost", "a")
            .build();
        let err = plan(&graph).unwrap_err();
        assert!(!err.is_cycle());
        assert!(matches!(err, PlanError::UnknownNode { node_id, .. } if node_id == "ghost"));
    }
}
