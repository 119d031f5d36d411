//! Transform node: a fixed set of named transforms over the inputs map.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::{HandlerError, HandlerRegistry, NodeContext, NodeHandler};
use crate::model::NodeType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Uppercase,
    Lowercase,
    Count,
    Passthrough,
}

impl Transform {
    /// Unrecognized names fall back to passthrough.
    pub fn from_name(name: &str) -> Self {
        match name {
            "uppercase" => Self::Uppercase,
            "lowercase" => Self::Lowercase,
            "count" => Self::Count,
            _ => Self::Passthrough,
        }
    }

    pub fn apply(self, inputs: &Map<String, Value>) -> Value {
        match self {
            Self::Uppercase => map_strings(&Value::Object(inputs.clone()), &|s| s.to_uppercase()),
            Self::Lowercase => map_strings(&Value::Object(inputs.clone()), &|s| s.to_lowercase()),
            Self::Count => json!(inputs.len()),
            Self::Passthrough => Value::Object(inputs.clone()),
        }
    }
}

fn map_strings(value: &Value, f: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(s)),
        Value::Array(items) => Value::Array(items.iter().map(|v| map_strings(v, f)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), map_strings(v, f)))
                .collect(),
        ),
        other => other.clone(),
    }
}

pub struct TransformHandler;

#[async_trait]
impl NodeHandler for TransformHandler {
    async fn handle(&self, ctx: NodeContext) -> Result<Value, HandlerError> {
        let name = ctx.config_str("transform").unwrap_or("passthrough");
        let result = Transform::from_name(name).apply(&ctx.inputs);
        Ok(json!({
            "transform": name,
            "result": result,
        }))
    }
}

pub fn register_transform(registry: &mut HandlerRegistry) {
    registry.register(NodeType::Transform, Arc::new(TransformHandler));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::test_support::ctx;
    use crate::model::Node;

    async fn run(name: Option<&str>, inputs: Value) -> Value {
        let mut node = Node::new("t", NodeType::Transform);
        if let Some(name) = name {
            node = node.with_config(json!({ "transform": name }));
        }
        TransformHandler.handle(ctx(node, inputs)).await.unwrap()
    }

    #[tokio::test]
    async fn uppercase_maps_nested_strings_only() {
        let out = run(
            Some("uppercase"),
            json!({ "default": { "name": "ada", "tags": ["x", 1], "n": 2 } }),
        )
        .await;
        assert_eq!(
            out,
            json!({
                "transform": "uppercase",
                "result": { "default": { "name": "ADA", "tags": ["X", 1], "n": 2 } },
            })
        );
    }

    #[tokio::test]
    async fn lowercase_and_count() {
        let out = run(Some("lowercase"), json!({ "a": "MiXeD" })).await;
        assert_eq!(out["result"], json!({ "a": "mixed" }));

        let out = run(Some("count"), json!({ "a": 1, "b": 2, "c": 3 })).await;
        assert_eq!(out["result"], json!(3));
    }

    #[tokio::test]
    async fn unknown_or_missing_name_passes_through() {
        let out = run(Some("reverse"), json!({ "a": "x" })).await;
        assert_eq!(out, json!({ "transform": "reverse", "result": { "a": "x" } }));

        let out = run(None, json!({ "a": "x" })).await;
        assert_eq!(out["transform"], json!("passthrough"));
        assert_eq!(out["result"], json!({ "a": "x" }));
    }
}
