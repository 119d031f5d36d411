//! Fallback for node types without a registered handler.

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{HandlerError, NodeContext, NodeHandler};

pub struct UnknownNodeHandler;

#[async_trait]
impl NodeHandler for UnknownNodeHandler {
    async fn handle(&self, ctx: NodeContext) -> Result<Value, HandlerError> {
        tracing::debug!(node_id = %ctx.node.id, node_type = %ctx.node.node_type, "no handler registered");
        Ok(json!({
            "message": format!("Unknown node type: {}", ctx.node.node_type),
            "nodeId": ctx.node.id,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::test_support::ctx;
    use crate::model::{Node, NodeType};

    #[tokio::test]
    async fn reports_type_and_node_id() {
        let out = UnknownNodeHandler
            .handle(ctx(Node::new("i1", NodeType::Intermediate), json!({})))
            .await
            .unwrap();
        assert_eq!(
            out,
            json!({ "message": "Unknown node type: intermediate", "nodeId": "i1" })
        );

        let out = UnknownNodeHandler
            .handle(ctx(Node::new("x", "webhook"), json!({})))
            .await
            .unwrap();
        assert_eq!(out["message"], json!("Unknown node type: webhook"));
    }
}
