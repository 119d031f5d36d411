//! End node: marks the end of a run. Inputs are ignored.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{HandlerError, HandlerRegistry, NodeContext, NodeHandler, timestamp};
use crate::model::NodeType;

pub struct EndHandler;

#[async_trait]
impl NodeHandler for EndHandler {
    async fn handle(&self, _ctx: NodeContext) -> Result<Value, HandlerError> {
        Ok(json!({
            "message": "Workflow completed",
            "timestamp": timestamp(),
        }))
    }
}

pub fn register_end(registry: &mut HandlerRegistry) {
    registry.register(NodeType::End, Arc::new(EndHandler));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::test_support::ctx;
    use crate::model::Node;

    #[tokio::test]
    async fn end_ignores_inputs() {
        let out = EndHandler
            .handle(ctx(Node::new("e", NodeType::End), json!({ "default": 1 })))
            .await
            .unwrap();
        assert_eq!(out["message"], json!("Workflow completed"));
        assert!(out.get("inputs").is_none());
    }
}
