//! Simulated execution: walk the plan batch by batch, dispatch each node to its handler and
//! report progress.
//!
//! Every handler in a batch is started together and the batch is joined before the next one
//! begins. The first handler error aborts the run; outputs already committed stay in the
//! result.

mod progress;
mod run;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::handler::{HandlerError, HandlerRegistry, NodeContext};
use crate::model::{Edge, Node};
use crate::planner::{PlanError, build_execution_plan};

pub use progress::{NodeStatus, ProgressCallback, ProgressEvent};
pub use run::{ExecutionRun, RunState};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Handler(#[from] HandlerError),
    #[error("node not found: {0}")]
    MissingNode(String),
}

/// What to run: a graph plus the values seeded into the results store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub workflow_id: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub inputs: Map<String, Value>,
}

impl ExecutionRequest {
    pub fn new(workflow_id: impl Into<String>, nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            nodes,
            edges,
            inputs: Map::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: Map<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub execution_id: String,
    pub workflow_id: String,
    /// Seeded inputs plus every committed node output, keyed by input key or node id.
    pub results: Map<String, Value>,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn is_completed(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }
}

/// Run `request` to completion. Failures are reported in the returned result, never as `Err`.
///
/// When a handler fails, handlers still in flight in the same batch are dropped and emit no
/// progress event.
pub async fn execute_workflow(
    request: &ExecutionRequest,
    registry: &HandlerRegistry,
    progress: Option<&ProgressCallback>,
) -> ExecutionResult {
    let mut run = ExecutionRun::new(request.workflow_id.clone(), request.nodes.len());
    let execution_id = run.id().to_string();
    let store: DashMap<String, Value> = request
        .inputs
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    info!(
        execution_id = %execution_id,
        workflow_id = %request.workflow_id,
        nodes = request.nodes.len(),
        edges = request.edges.len(),
        "execution started"
    );
    run.set_state(RunState::Running);

    let outcome = run_batches(request, registry, progress, &mut run, &store).await;
    let results: Map<String, Value> = store.into_iter().collect();

    match outcome {
        Ok(()) => {
            run.set_state(RunState::Completed);
            info!(execution_id = %execution_id, "execution completed");
            ExecutionResult {
                execution_id,
                workflow_id: request.workflow_id.clone(),
                results,
                status: ExecutionStatus::Completed,
                error: None,
            }
        }
        Err(err) => {
            let message = err.to_string();
            run.set_state(RunState::Failed(message.clone()));
            warn!(execution_id = %execution_id, error = %message, "execution failed");
            ExecutionResult {
                execution_id,
                workflow_id: request.workflow_id.clone(),
                results,
                status: ExecutionStatus::Failed,
                error: Some(message),
            }
        }
    }
}

async fn run_batches(
    request: &ExecutionRequest,
    registry: &HandlerRegistry,
    progress: Option<&ProgressCallback>,
    run: &mut ExecutionRun,
    store: &DashMap<String, Value>,
) -> Result<(), RuntimeError> {
    let plan = build_execution_plan(&request.nodes, &request.edges)?;

    let mut incoming: HashMap<&str, Vec<&Edge>> = HashMap::new();
    for edge in &request.edges {
        incoming.entry(edge.target.as_str()).or_default().push(edge);
    }
    let batch_ctx = BatchContext {
        execution_id: run.id().to_string(),
        workflow_id: &request.workflow_id,
        nodes: request.nodes.iter().map(|n| (n.id.as_str(), n)).collect(),
        incoming,
        registry,
        progress,
        store,
        completed: AtomicUsize::new(0),
        total: request.nodes.len(),
    };

    for (index, batch) in plan.iter().enumerate() {
        debug!(execution_id = %batch_ctx.execution_id, batch = index, size = batch.len(), "running batch");
        let finished = try_join_all(batch.iter().map(|id| batch_ctx.run_node(id))).await?;
        for node_id in finished {
            run.mark_node_completed(node_id);
        }
    }
    Ok(())
}

/// Shared state for the nodes of one run.
struct BatchContext<'a> {
    execution_id: String,
    workflow_id: &'a str,
    nodes: HashMap<&'a str, &'a Node>,
    incoming: HashMap<&'a str, Vec<&'a Edge>>,
    registry: &'a HandlerRegistry,
    progress: Option<&'a ProgressCallback>,
    store: &'a DashMap<String, Value>,
    completed: AtomicUsize,
    total: usize,
}

impl BatchContext<'_> {
    /// Inputs for `node_id`: each incoming edge's source result under its handle name.
    fn assemble_inputs(&self, node_id: &str) -> Map<String, Value> {
        let mut inputs = Map::new();
        for edge in self.incoming.get(node_id).into_iter().flatten() {
            if let Some(value) = self.store.get(&edge.source) {
                inputs.insert(edge.input_key().to_string(), value.clone());
            }
        }
        inputs
    }

    async fn run_node(&self, node_id: &str) -> Result<String, RuntimeError> {
        let node = *self
            .nodes
            .get(node_id)
            .ok_or_else(|| RuntimeError::MissingNode(node_id.to_string()))?;
        let ctx = NodeContext {
            workflow_id: self.workflow_id.to_string(),
            execution_id: self.execution_id.clone(),
            node: node.clone(),
            inputs: self.assemble_inputs(node_id),
        };
        let handler = self.registry.get(&node.node_type);

        match handler.handle(ctx).await {
            Ok(output) => {
                self.store.insert(node.id.clone(), output.clone());
                let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
                self.emit(ProgressEvent {
                    execution_id: self.execution_id.clone(),
                    node_id: node.id.clone(),
                    status: NodeStatus::Completed,
                    output: Some(output),
                    error: None,
                    progress: self.fraction(done),
                });
                Ok(node.id.clone())
            }
            Err(err) => {
                warn!(execution_id = %self.execution_id, node_id = %node.id, error = %err, "node failed");
                self.emit(ProgressEvent {
                    execution_id: self.execution_id.clone(),
                    node_id: node.id.clone(),
                    status: NodeStatus::Failed,
                    output: None,
                    error: Some(err.to_string()),
                    progress: self.fraction(self.completed.load(Ordering::SeqCst)),
                });
                Err(err.into())
            }
        }
    }

    fn fraction(&self, done: usize) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            done as f64 / self.total as f64
        }
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(cb) = self.progress {
            cb(event);
        }
    }
}
