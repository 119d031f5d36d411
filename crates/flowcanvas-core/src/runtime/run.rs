use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of one execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Pending,
    Running,
    Completed,
    Failed(String),
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed(_))
    }
}

/// Bookkeeping for a single execution: id, state and which nodes have finished.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRun {
    pub id: Uuid,
    pub workflow_id: String,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_node_ids: HashSet<String>,
    pub total_nodes: usize,
}

impl ExecutionRun {
    pub fn new(workflow_id: impl Into<String>, total_nodes: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_id: workflow_id.into(),
            state: RunState::Pending,
            started_at: Utc::now(),
            completed_node_ids: HashSet::new(),
            total_nodes,
        }
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn set_state(&mut self, state: RunState) {
        tracing::debug!(execution_id = %self.id, from = ?self.state, to = ?state, "run state change");
        self.state = state;
    }

    /// Records `node_id` and returns the new progress fraction.
    pub fn mark_node_completed(&mut self, node_id: impl Into<String>) -> f64 {
        self.completed_node_ids.insert(node_id.into());
        self.progress()
    }

    /// Completed nodes over total nodes; 1.0 for an empty graph.
    pub fn progress(&self) -> f64 {
        if self.total_nodes == 0 {
            return 1.0;
        }
        self.completed_node_ids.len() as f64 / self.total_nodes as f64
    }
}
