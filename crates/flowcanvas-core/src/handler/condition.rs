//! Condition node: evaluates `data.config.condition` against the node's inputs.
//!
//! A condition that fails to parse or evaluate is treated as `false` and logged; the run
//! continues.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{HandlerError, HandlerRegistry, NodeContext, NodeHandler};
use crate::expression::evaluate_condition;
use crate::model::NodeType;

const DEFAULT_CONDITION: &str = "true";

pub struct ConditionHandler;

#[async_trait]
impl NodeHandler for ConditionHandler {
    async fn handle(&self, ctx: NodeContext) -> Result<Value, HandlerError> {
        let source = ctx.config_str("condition").unwrap_or(DEFAULT_CONDITION);
        let condition = match evaluate_condition(source, &ctx.inputs) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(
                    node_id = %ctx.node.id,
                    condition = source,
                    error = %e,
                    "condition evaluation failed, treating as false"
                );
                false
            }
        };
        Ok(json!({
            "condition": condition,
            "inputs": ctx.inputs,
        }))
    }
}

pub fn register_condition(registry: &mut HandlerRegistry) {
    registry.register(NodeType::Condition, Arc::new(ConditionHandler));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::test_support::ctx;
    use crate::model::Node;

    fn cond(expr: &str) -> Node {
        Node::new("c", NodeType::Condition).with_config(json!({ "condition": expr }))
    }

    #[tokio::test]
    async fn missing_condition_defaults_to_true() {
        let out = ConditionHandler
            .handle(ctx(Node::new("c", NodeType::Condition), json!({})))
            .await
            .unwrap();
        assert_eq!(out, json!({ "condition": true, "inputs": {} }));
    }

    #[tokio::test]
    async fn evaluates_against_inputs() {
        let inputs = json!({ "default": { "score": 7 } });
        let out = ConditionHandler
            .handle(ctx(cond("default.score > 5"), inputs.clone()))
            .await
            .unwrap();
        assert_eq!(out, json!({ "condition": true, "inputs": inputs }));
    }

    #[tokio::test]
    async fn division_by_zero_stays_truthy() {
        let out = ConditionHandler
            .handle(ctx(cond("1/0"), json!({})))
            .await
            .unwrap();
        assert_eq!(out["condition"], json!(true));
    }

    #[tokio::test]
    async fn failing_condition_degrades_to_false() {
        for bad in ["undefinedThing > 1", "1 +", "default.x"] {
            let out = ConditionHandler
                .handle(ctx(cond(bad), json!({ "default": null })))
                .await
                .unwrap();
            assert_eq!(out["condition"], json!(false), "condition {bad:?}");
        }
    }

    #[tokio::test]
    async fn oversized_or_chained_conditions_degrade_to_false() {
        let huge = format!("{}1", "1+".repeat(10_000));
        let chained = format!("{}1", "1+".repeat(1_000));
        let path = format!("default{}", ".b".repeat(1_000));
        for src in [huge, chained, path] {
            let out = ConditionHandler
                .handle(ctx(cond(&src), json!({ "default": { "b": 1 } })))
                .await
                .unwrap();
            assert_eq!(out["condition"], json!(false));
        }
    }
}
