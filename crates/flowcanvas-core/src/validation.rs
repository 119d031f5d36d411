use serde::{Deserialize, Serialize};

use crate::model::{Edge, Node, NodeType};
use crate::planner::build_execution_plan;

/// Advisory check result; execution does not require a valid report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

pub fn validate_workflow(nodes: &[Node], edges: &[Edge]) -> ValidationReport {
    let mut errors = Vec::new();
    if !nodes.iter().any(|n| n.node_type == NodeType::Start) {
        errors.push("Workflow must have at least one start node".to_string());
    }
    if !nodes.iter().any(|n| n.node_type == NodeType::End) {
        errors.push("Workflow must have at least one end node".to_string());
    }
    if let Err(e) = build_execution_plan(nodes, edges) {
        errors.push(e.to_string());
    }
    if !errors.is_empty() {
        tracing::debug!(?errors, "workflow failed validation");
    }
    ValidationReport::from_errors(errors)
}
