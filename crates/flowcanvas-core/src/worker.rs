//! The worker boundary: one [`WorkflowWorker`] owns the handler registry, the layout engine
//! and the result cache, and is driven from the host through a cloneable [`WorkerHandle`].
//!
//! Each handle call sends one request with its own reply channel; the worker task serves
//! requests strictly one at a time.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::cache::{CacheStats, ExecutionCache};
use crate::config::WorkerConfig;
use crate::handler::HandlerRegistry;
use crate::layout::{
    LayeredLayout, LayoutError, LayoutOptions, LayoutResult, SugiyamaLayout, compute_layout_with,
};
use crate::model::{Edge, Node};
use crate::runtime::{ExecutionRequest, ExecutionResult, ProgressCallback, execute_workflow};
use crate::validation::{ValidationReport, validate_workflow};

const REQUEST_BUFFER: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("worker is not running")]
    Closed,
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

pub struct WorkflowWorker {
    config: WorkerConfig,
    registry: HandlerRegistry,
    cache: ExecutionCache,
    engine: Box<dyn LayeredLayout>,
    progress: Option<ProgressCallback>,
}

impl Default for WorkflowWorker {
    fn default() -> Self {
        Self::new(WorkerConfig::default())
    }
}

impl WorkflowWorker {
    /// Built-in handlers, the layered layout engine and an empty cache, all per `config`.
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            registry: HandlerRegistry::with_builtins(config.action_delay),
            cache: ExecutionCache::new(config.cache.clone()),
            engine: Box::new(SugiyamaLayout::default()),
            progress: None,
            config,
        }
    }

    pub fn with_registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_layout_engine(mut self, engine: Box<dyn LayeredLayout>) -> Self {
        self.engine = engine;
        self
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Replaces any previously registered callback.
    pub fn set_progress_callback(&mut self, callback: Option<ProgressCallback>) {
        self.progress = callback;
    }

    pub fn compute_layout(
        &self,
        nodes: &[Node],
        edges: &[Edge],
        options: &LayoutOptions,
    ) -> Result<LayoutResult, LayoutError> {
        compute_layout_with(self.engine.as_ref(), &self.config.spacing, nodes, edges, options)
    }

    /// Runs the workflow and caches the result under its execution id.
    pub async fn execute_workflow(&self, request: &ExecutionRequest) -> ExecutionResult {
        let result = execute_workflow(request, &self.registry, self.progress.as_ref()).await;
        self.cache.insert(result.clone());
        result
    }

    pub fn validate_workflow(&self, nodes: &[Node], edges: &[Edge]) -> ValidationReport {
        validate_workflow(nodes, edges)
    }

    pub fn execution_result(&self, execution_id: &str) -> Option<ExecutionResult> {
        self.cache.get(execution_id)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

enum WorkerRequest {
    SetProgressCallback {
        callback: Option<ProgressCallback>,
        reply: oneshot::Sender<()>,
    },
    ComputeLayout {
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        options: LayoutOptions,
        reply: oneshot::Sender<Result<LayoutResult, LayoutError>>,
    },
    ExecuteWorkflow {
        request: ExecutionRequest,
        reply: oneshot::Sender<ExecutionResult>,
    },
    ValidateWorkflow {
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        reply: oneshot::Sender<ValidationReport>,
    },
    ExecutionResult {
        execution_id: String,
        reply: oneshot::Sender<Option<ExecutionResult>>,
    },
    CacheStats {
        reply: oneshot::Sender<CacheStats>,
    },
}

/// Host-side proxy to a running worker task.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<WorkerRequest>,
}

impl WorkerHandle {
    /// Moves `worker` onto a tokio task. The task exits once every handle is dropped.
    pub fn spawn(worker: WorkflowWorker) -> Self {
        let (tx, rx) = mpsc::channel(REQUEST_BUFFER);
        tokio::spawn(serve(worker, rx));
        Self { tx }
    }

    async fn call<T>(
        &self,
        request: impl FnOnce(oneshot::Sender<T>) -> WorkerRequest,
    ) -> Result<T, WorkerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(request(reply))
            .await
            .map_err(|_| WorkerError::Closed)?;
        rx.await.map_err(|_| WorkerError::Closed)
    }

    pub async fn set_progress_callback(
        &self,
        callback: Option<ProgressCallback>,
    ) -> Result<(), WorkerError> {
        self.call(|reply| WorkerRequest::SetProgressCallback { callback, reply })
            .await
    }

    pub async fn compute_layout(
        &self,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        options: LayoutOptions,
    ) -> Result<LayoutResult, WorkerError> {
        let result = self
            .call(|reply| WorkerRequest::ComputeLayout {
                nodes,
                edges,
                options,
                reply,
            })
            .await?;
        Ok(result?)
    }

    /// Domain failures come back inside the result with `status: failed`.
    pub async fn execute_workflow(
        &self,
        request: ExecutionRequest,
    ) -> Result<ExecutionResult, WorkerError> {
        self.call(|reply| WorkerRequest::ExecuteWorkflow { request, reply })
            .await
    }

    pub async fn validate_workflow(
        &self,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
    ) -> Result<ValidationReport, WorkerError> {
        self.call(|reply| WorkerRequest::ValidateWorkflow {
            nodes,
            edges,
            reply,
        })
        .await
    }

    pub async fn execution_result(
        &self,
        execution_id: impl Into<String>,
    ) -> Result<Option<ExecutionResult>, WorkerError> {
        let execution_id = execution_id.into();
        self.call(|reply| WorkerRequest::ExecutionResult {
            execution_id,
            reply,
        })
        .await
    }

    pub async fn cache_stats(&self) -> Result<CacheStats, WorkerError> {
        self.call(|reply| WorkerRequest::CacheStats { reply }).await
    }
}

async fn serve(mut worker: WorkflowWorker, mut rx: mpsc::Receiver<WorkerRequest>) {
    info!("workflow worker started");
    while let Some(request) = rx.recv().await {
        // a dropped reply receiver only means the caller stopped waiting
        match request {
            WorkerRequest::SetProgressCallback { callback, reply } => {
                debug!(registered = callback.is_some(), "progress callback replaced");
                worker.set_progress_callback(callback);
                let _ = reply.send(());
            }
            WorkerRequest::ComputeLayout {
                nodes,
                edges,
                options,
                reply,
            } => {
                let _ = reply.send(worker.compute_layout(&nodes, &edges, &options));
            }
            WorkerRequest::ExecuteWorkflow { request, reply } => {
                let _ = reply.send(worker.execute_workflow(&request).await);
            }
            WorkerRequest::ValidateWorkflow {
                nodes,
                edges,
                reply,
            } => {
                let _ = reply.send(worker.validate_workflow(&nodes, &edges));
            }
            WorkerRequest::ExecutionResult {
                execution_id,
                reply,
            } => {
                let _ = reply.send(worker.execution_result(&execution_id));
            }
            WorkerRequest::CacheStats { reply } => {
                let _ = reply.send(worker.cache_stats());
            }
        }
    }
    info!("workflow worker stopped");
}
