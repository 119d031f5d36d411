use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::action::DEFAULT_ACTION_DELAY;
use super::unknown::UnknownNodeHandler;
use super::NodeHandler;
use crate::model::NodeType;

/// Registry: node type tag -> handler. Types without an entry resolve to the unknown-type
/// handler.
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn NodeHandler>>,
    fallback: Arc<dyn NodeHandler>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    /// Empty registry; every type resolves to the fallback.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            fallback: Arc::new(UnknownNodeHandler),
        }
    }

    /// Registry with start, condition, action, transform and end registered.
    pub fn default_with_builtins() -> Self {
        Self::with_builtins(DEFAULT_ACTION_DELAY)
    }

    /// Same as [`default_with_builtins`](Self::default_with_builtins) with a custom action delay.
    pub fn with_builtins(action_delay: Duration) -> Self {
        let mut r = Self::new();
        super::start::register_start(&mut r);
        super::end::register_end(&mut r);
        super::condition::register_condition(&mut r);
        super::action::register_action(&mut r, action_delay);
        super::transform::register_transform(&mut r);
        r
    }

    /// Register (or replace) the handler for `node_type`.
    pub fn register(&mut self, node_type: impl Into<NodeType>, handler: Arc<dyn NodeHandler>) {
        let node_type: NodeType = node_type.into();
        self.handlers.insert(node_type.into(), handler);
    }

    pub fn contains(&self, node_type: &NodeType) -> bool {
        self.handlers.contains_key(node_type.as_str())
    }

    pub fn get(&self, node_type: &NodeType) -> Arc<dyn NodeHandler> {
        self.handlers
            .get(node_type.as_str())
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::test_support::ctx;
    use crate::handler::{HandlerError, NodeContext};
    use crate::model::Node;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Shout;

    #[async_trait]
    impl NodeHandler for Shout {
        async fn handle(&self, ctx: NodeContext) -> Result<Value, HandlerError> {
            Ok(json!({ "shout": ctx.node_id().to_uppercase() }))
        }
    }

    #[tokio::test]
    async fn empty_registry_falls_back_to_unknown_handler() {
        let r = HandlerRegistry::new();
        assert!(!r.contains(&NodeType::Start));
        let out = r
            .get(&NodeType::Start)
            .handle(ctx(Node::new("s", NodeType::Start), json!({})))
            .await
            .unwrap();
        assert_eq!(out["message"], json!("Unknown node type: start"));
    }

    #[test]
    fn builtins_cover_simulated_types() {
        let r = HandlerRegistry::default_with_builtins();
        for t in [
            NodeType::Start,
            NodeType::Condition,
            NodeType::Action,
            NodeType::Transform,
            NodeType::End,
        ] {
            assert!(r.contains(&t), "missing handler for {t}");
        }
        assert!(!r.contains(&NodeType::Custom));
    }

    #[tokio::test]
    async fn register_custom_type_resolves_and_executes() {
        let mut r = HandlerRegistry::default_with_builtins();
        r.register("webhook", Arc::new(Shout));
        let node = Node::new("hook", "webhook");
        let out = r
            .get(&node.node_type)
            .handle(ctx(node.clone(), json!({})))
            .await
            .unwrap();
        assert_eq!(out, json!({ "shout": "HOOK" }));
    }
}
