//! Graph model shared by the planner, the layout adapter and the runtime.
//!
//! Field names follow the canvas JSON (`sourceHandle`, `measured`, ...). Fields the
//! core does not understand are kept in `extra` so a node survives a layout pass unchanged.

mod builder;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

pub use builder::WorkflowGraphBuilder;

/// Node type tag. Unrecognized tags are preserved in [`NodeType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeType {
    Start,
    Condition,
    Action,
    Transform,
    End,
    Intermediate,
    Custom,
    Other(String),
}

impl NodeType {
    /// Tag as written in the canvas JSON; also the handler registry key.
    pub fn as_str(&self) -> &str {
        match self {
            NodeType::Start => "start",
            NodeType::Condition => "condition",
            NodeType::Action => "action",
            NodeType::Transform => "transform",
            NodeType::End => "end",
            NodeType::Intermediate => "intermediate",
            NodeType::Custom => "custom",
            NodeType::Other(tag) => tag.as_str(),
        }
    }
}

impl From<String> for NodeType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "start" => NodeType::Start,
            "condition" => NodeType::Condition,
            "action" => NodeType::Action,
            "transform" => NodeType::Transform,
            "end" => NodeType::End,
            "intermediate" => NodeType::Intermediate,
            "custom" => NodeType::Custom,
            _ => NodeType::Other(tag),
        }
    }
}

impl From<&str> for NodeType {
    fn from(tag: &str) -> Self {
        NodeType::from(tag.to_string())
    }
}

impl From<NodeType> for String {
    fn from(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Other(tag) => tag,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-left anchor in canvas space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Rendered size reported by the canvas. Either side may be missing before first paint.
///
/// Sizes keep their JSON number form (`180` stays `180`) so a node written back out is
/// unchanged apart from what layout moves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measured {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<Number>,
}

/// Resolved box size of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

/// Opaque node payload: display label, side-panel config, and anything else the canvas stores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeData {
    /// Config entry as a string, if present and a string.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.as_ref()?.get(key)?.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured: Option<Measured>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<Number>,
    #[serde(default)]
    pub data: NodeData,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    pub fn new(id: impl Into<String>, node_type: impl Into<NodeType>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            position: Position::default(),
            measured: None,
            width: None,
            height: None,
            data: NodeData::default(),
            extra: Map::new(),
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    /// Set the measured size, as the canvas does after rendering. Non-finite sides are
    /// left unset.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.measured = Some(Measured {
            width: Number::from_f64(width),
            height: Number::from_f64(height),
        });
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.data.label = Some(label.into());
        self
    }

    /// Replace `data.config`. Non-object values are ignored.
    pub fn with_config(mut self, config: Value) -> Self {
        if let Value::Object(map) = config {
            self.data.config = Some(map);
        }
        self
    }

    /// Box size for layout: `measured` wins over the top-level `width`/`height`.
    pub fn dimensions(&self) -> Option<Dimensions> {
        let measured = self.measured.as_ref();
        let width = measured
            .and_then(|m| m.width.as_ref())
            .or(self.width.as_ref())?
            .as_f64()?;
        let height = measured
            .and_then(|m| m.height.as_ref())
            .or(self.height.as_ref())?
            .as_f64()?;
        if !width.is_finite() || !height.is_finite() {
            return None;
        }
        Some(Dimensions { width, height })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Edge {
    /// Edge with a derived id (`e-<source>-<target>`).
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: format!("e-{source}-{target}"),
            source,
            target,
            source_handle: None,
            target_handle: None,
            edge_type: None,
            extra: Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_source_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }

    /// Key under which the source output is handed to the target handler.
    pub fn input_key(&self) -> &str {
        self.source_handle.as_deref().unwrap_or("default")
    }
}

/// Serialized graph snapshot sent by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowGraph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl WorkflowGraph {
    pub fn builder() -> WorkflowGraphBuilder {
        WorkflowGraphBuilder::new()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_parses_canvas_json_and_keeps_unknown_fields() {
        let raw = json!({
            "id": "n1",
            "type": "action",
            "position": { "x": 10.0, "y": 20.0 },
            "measured": { "width": 180.0, "height": 60.0 },
            "selected": true,
            "data": { "label": "Send email", "config": { "action": "email" }, "icon": "mail" }
        });
        let node: Node = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(node.node_type, NodeType::Action);
        assert_eq!(node.data.config_str("action"), Some("email"));
        assert_eq!(node.extra.get("selected"), Some(&json!(true)));
        assert_eq!(serde_json::to_value(&node).unwrap(), raw);
    }

    #[test]
    fn integer_sizes_round_trip_unchanged() {
        let raw = r#"{"id":"n1","type":"start","position":{"x":0.0,"y":0.0},"measured":{"width":180,"height":60},"width":180,"height":60,"data":{"label":"Start"}}"#;
        let node: Node = serde_json::from_str(raw).unwrap();
        assert_eq!(
            node.dimensions(),
            Some(Dimensions { width: 180.0, height: 60.0 })
        );
        assert_eq!(serde_json::to_string(&node).unwrap(), raw);
    }

    #[test]
    fn unknown_node_type_is_preserved() {
        let node: Node = serde_json::from_value(json!({ "id": "x", "type": "webhook" })).unwrap();
        assert_eq!(node.node_type, NodeType::Other("webhook".into()));
        assert_eq!(serde_json::to_value(&node).unwrap()["type"], json!("webhook"));
    }

    #[test]
    fn dimensions_prefer_measured_then_top_level() {
        let measured = Node::new("a", NodeType::Start).with_size(100.0, 40.0);
        assert_eq!(
            measured.dimensions(),
            Some(Dimensions { width: 100.0, height: 40.0 })
        );

        let mut top_level = Node::new("b", NodeType::End);
        top_level.width = Some(50.into());
        top_level.height = Some(20.into());
        assert_eq!(
            top_level.dimensions(),
            Some(Dimensions { width: 50.0, height: 20.0 })
        );

        let mut partial = Node::new("c", NodeType::End);
        partial.measured = Some(Measured {
            width: Some(10.into()),
            height: None,
        });
        assert_eq!(partial.dimensions(), None);
    }

    #[test]
    fn edge_handles_use_camel_case() {
        let edge: Edge = serde_json::from_value(json!({
            "id": "e1", "source": "c", "target": "a", "sourceHandle": "true"
        }))
        .unwrap();
        assert_eq!(edge.input_key(), "true");
        assert_eq!(Edge::new("a", "b").input_key(), "default");
    }
}
