//! Start node: marks the beginning of a run.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{HandlerError, HandlerRegistry, NodeContext, NodeHandler, timestamp};
use crate::model::NodeType;

pub struct StartHandler;

#[async_trait]
impl NodeHandler for StartHandler {
    async fn handle(&self, _ctx: NodeContext) -> Result<Value, HandlerError> {
        Ok(json!({
            "message": "Workflow started",
            "timestamp": timestamp(),
        }))
    }
}

pub fn register_start(registry: &mut HandlerRegistry) {
    registry.register(NodeType::Start, Arc::new(StartHandler));
}
