//! Adjacency view over a node/edge list: the dependencies of each node.

use std::collections::{HashMap, HashSet};

use super::PlanError;
use crate::model::{Edge, Node};

/// Borrowed adjacency maps for one graph snapshot.
///
/// Construction checks that node ids are unique and that every edge endpoint exists.
/// Parallel edges collapse to a single dependency.
#[derive(Debug)]
pub struct DependencyGraph<'a> {
    order: Vec<&'a str>,
    dependencies: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> DependencyGraph<'a> {
    pub fn new(nodes: &'a [Node], edges: &'a [Edge]) -> Result<Self, PlanError> {
        let mut order = Vec::with_capacity(nodes.len());
        let mut seen: HashSet<&str> = HashSet::with_capacity(nodes.len());
        for node in nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(PlanError::DuplicateNode {
                    node_id: node.id.clone(),
                });
            }
            order.push(node.id.as_str());
        }

        let mut dependencies: HashMap<&str, Vec<&str>> =
            order.iter().map(|&id| (id, Vec::new())).collect();

        for edge in edges {
            for endpoint in [&edge.source, &edge.target] {
                if !seen.contains(endpoint.as_str()) {
                    return Err(PlanError::UnknownNode {
                        edge_id: edge.id.clone(),
                        node_id: endpoint.clone(),
                    });
                }
            }
            let deps = dependencies.entry(edge.target.as_str()).or_default();
            if !deps.contains(&edge.source.as_str()) {
                deps.push(edge.source.as_str());
            }
        }

        Ok(Self {
            order,
            dependencies,
        })
    }

    /// Node ids in original array order.
    pub fn node_ids(&self) -> &[&'a str] {
        &self.order
    }

    /// Nodes with an edge into `id`.
    pub fn dependencies_of(&self, id: &str) -> &[&'a str] {
        self.dependencies.get(id).map(Vec::as_slice).unwrap_or(&[])
    }
}
