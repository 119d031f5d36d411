//! Layout adapter: feeds node sizes and edges to a layered layout primitive and maps the
//! returned centers back to the canvas's top-left anchor.

mod layered;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Edge, Node, Position};

pub use layered::{LayeredLayout, LayoutGraph, LayoutNode, Point, SugiyamaLayout};

/// Rank direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "TB")]
    TopToBottom,
    #[serde(rename = "BT")]
    BottomToTop,
    #[serde(rename = "LR")]
    LeftToRight,
    #[serde(rename = "RL")]
    RightToLeft,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::TopToBottom => "TB",
            Direction::BottomToTop => "BT",
            Direction::LeftToRight => "LR",
            Direction::RightToLeft => "RL",
        }
    }

    /// True when ranks advance along the x axis.
    pub fn is_horizontal(&self) -> bool {
        matches!(self, Direction::LeftToRight | Direction::RightToLeft)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TB" => Ok(Direction::TopToBottom),
            "BT" => Ok(Direction::BottomToTop),
            "LR" => Ok(Direction::LeftToRight),
            "RL" => Ok(Direction::RightToLeft),
            other => Err(format!("unknown direction {other:?} (expected TB, BT, LR or RL)")),
        }
    }
}

/// Per-call options sent by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutOptions {
    pub direction: Direction,
    /// Keep each node's current `x`; only `y` comes from the layout.
    pub preserve_x: bool,
}

impl LayoutOptions {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            preserve_x: false,
        }
    }

    pub fn preserve_x(mut self, preserve_x: bool) -> Self {
        self.preserve_x = preserve_x;
        self
    }
}

/// Spacing handed to the primitive, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutSpacing {
    /// Gap between neighbouring boxes of the same rank.
    pub node_sep: f64,
    /// Gap between consecutive ranks.
    pub rank_sep: f64,
    pub margin_x: f64,
    pub margin_y: f64,
}

impl Default for LayoutSpacing {
    fn default() -> Self {
        Self {
            node_sep: 26.0,
            rank_sep: 100.0,
            margin_x: 0.0,
            margin_y: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("node {node_id} has no measured width/height")]
    MissingDimensions { node_id: String },
    #[error("edge {edge_id} references unknown node {node_id}")]
    UnknownNode { edge_id: String, node_id: String },
    #[error("duplicate node id: {node_id}")]
    DuplicateNode { node_id: String },
    #[error("layout engine failed: {0}")]
    Primitive(String),
}

/// Repositioned nodes plus the unchanged edge list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Lay out with [`SugiyamaLayout`] and the default spacing.
pub fn compute_layout(
    nodes: &[Node],
    edges: &[Edge],
    options: &LayoutOptions,
) -> Result<LayoutResult, LayoutError> {
    compute_layout_with(
        &SugiyamaLayout::default(),
        &LayoutSpacing::default(),
        nodes,
        edges,
        options,
    )
}

/// Lay out with a caller-supplied primitive and spacing.
///
/// Inputs are never modified: the result holds clones that differ from the originals only
/// in `position`.
pub fn compute_layout_with(
    engine: &dyn LayeredLayout,
    spacing: &LayoutSpacing,
    nodes: &[Node],
    edges: &[Edge],
    options: &LayoutOptions,
) -> Result<LayoutResult, LayoutError> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
    let mut layout_nodes = Vec::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        if index.insert(node.id.as_str(), i).is_some() {
            return Err(LayoutError::DuplicateNode {
                node_id: node.id.clone(),
            });
        }
        let dims = node
            .dimensions()
            .ok_or_else(|| LayoutError::MissingDimensions {
                node_id: node.id.clone(),
            })?;
        layout_nodes.push(LayoutNode {
            id: node.id.as_str(),
            width: dims.width,
            height: dims.height,
        });
    }

    let endpoint = |edge: &Edge, id: &str| {
        index
            .get(id)
            .copied()
            .ok_or_else(|| LayoutError::UnknownNode {
                edge_id: edge.id.clone(),
                node_id: id.to_string(),
            })
    };
    let mut layout_edges = Vec::with_capacity(edges.len());
    for edge in edges {
        layout_edges.push((endpoint(edge, &edge.source)?, endpoint(edge, &edge.target)?));
    }

    let graph = LayoutGraph {
        nodes: layout_nodes,
        edges: layout_edges,
    };
    let centers = engine.layout(&graph, options.direction, spacing)?;
    if centers.len() != nodes.len() {
        return Err(LayoutError::Primitive(format!(
            "expected {} positions, got {}",
            nodes.len(),
            centers.len()
        )));
    }

    let laid_out = nodes
        .iter()
        .zip(&graph.nodes)
        .zip(centers)
        .map(|((node, sized), center)| {
            let mut node = node.clone();
            let x = if options.preserve_x {
                node.position.x
            } else {
                center.x - sized.width / 2.0
            };
            node.position = Position::new(x, center.y - sized.height / 2.0);
            node
        })
        .collect();

    tracing::debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        direction = %options.direction,
        preserve_x = options.preserve_x,
        "computed layout"
    );
    Ok(LayoutResult {
        nodes: laid_out,
        edges: edges.to_vec(),
    })
}
