//! # Node handlers
//!
//! One handler per node type. The runtime hands each handler a [`NodeContext`]: the node
//! itself plus an inputs map assembled from its incoming edges, keyed by the edge's
//! `sourceHandle` (or `"default"`).
//!
//! ## Built-ins
//!
//! The built-in handlers simulate work: `start`/`end` emit timestamped markers, `action`
//! waits and echoes, `transform` applies a named string/count transform and `condition`
//! evaluates its expression. Unregistered types fall back to [`unknown::UnknownNodeHandler`],
//! which reports the type and never fails.
//!
//! ## Errors
//!
//! Returning `Err` aborts the whole run after the current batch settles. Handlers that can
//! recover locally (see `condition`) should do so and return `Ok`.

pub mod action;
pub mod condition;
pub mod end;
pub mod registry;
pub mod start;
pub mod transform;
pub mod unknown;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::model::Node;

pub use registry::HandlerRegistry;

/// Everything a handler sees about one node invocation.
#[derive(Debug, Clone)]
pub struct NodeContext {
    pub workflow_id: String,
    pub execution_id: String,
    pub node: Node,
    /// Source outputs keyed by handle name.
    pub inputs: Map<String, Value>,
}

impl NodeContext {
    pub fn node_id(&self) -> &str {
        &self.node.id
    }

    /// `data.config.<key>` as a string.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.node.data.config_str(key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    #[error("node {node_id} failed: {message}")]
    Failed { node_id: String, message: String },
}

impl HandlerError {
    pub fn failed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            node_id: node_id.into(),
            message: message.into(),
        }
    }
}

/// Async node executor.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    async fn handle(&self, ctx: NodeContext) -> Result<Value, HandlerError>;
}

pub(crate) fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
