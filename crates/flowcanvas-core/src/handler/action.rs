//! Action node: waits for the configured delay, then echoes its inputs. No side effects.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{HandlerError, HandlerRegistry, NodeContext, NodeHandler};
use crate::model::NodeType;

pub const DEFAULT_ACTION_DELAY: Duration = Duration::from_millis(500);

pub struct ActionHandler {
    delay: Duration,
}

impl ActionHandler {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for ActionHandler {
    fn default() -> Self {
        Self::new(DEFAULT_ACTION_DELAY)
    }
}

#[async_trait]
impl NodeHandler for ActionHandler {
    async fn handle(&self, ctx: NodeContext) -> Result<Value, HandlerError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let action = ctx.config_str("action").unwrap_or("default").to_string();
        Ok(json!({
            "result": format!("Executed {action}"),
            "action": action,
            "inputs": ctx.inputs,
        }))
    }
}

pub fn register_action(registry: &mut HandlerRegistry, delay: Duration) {
    registry.register(NodeType::Action, Arc::new(ActionHandler::new(delay)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::test_support::ctx;
    use crate::model::Node;

    #[tokio::test]
    async fn default_action_echoes_inputs() {
        let out = ActionHandler::new(Duration::ZERO)
            .handle(ctx(Node::new("a", NodeType::Action), json!({ "default": { "n": 1 } })))
            .await
            .unwrap();
        assert_eq!(
            out,
            json!({
                "action": "default",
                "result": "Executed default",
                "inputs": { "default": { "n": 1 } },
            })
        );
    }

    #[tokio::test]
    async fn configured_action_name_is_used() {
        let node = Node::new("a", NodeType::Action).with_config(json!({ "action": "send_email" }));
        let out = ActionHandler::new(Duration::ZERO)
            .handle(ctx(node, json!({})))
            .await
            .unwrap();
        assert_eq!(out["result"], json!("Executed send_email"));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_the_configured_delay() {
        let started = tokio::time::Instant::now();
        ActionHandler::default()
            .handle(ctx(Node::new("a", NodeType::Action), json!({})))
            .await
            .unwrap();
        assert!(started.elapsed() >= DEFAULT_ACTION_DELAY);
    }
}
