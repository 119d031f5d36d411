use super::{Edge, Node, NodeType, WorkflowGraph};

/// Fluent builder for [`WorkflowGraph`]. Nodes keep insertion order.
#[derive(Debug, Default)]
pub struct WorkflowGraphBuilder {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl WorkflowGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Shorthand for a node with only an id and a type.
    pub fn node(self, id: impl Into<String>, node_type: impl Into<NodeType>) -> Self {
        self.add_node(Node::new(id, node_type))
    }

    pub fn add_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Link `source` to `target` on the default handle.
    pub fn link(self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.add_edge(Edge::new(source, target))
    }

    pub fn build(self) -> WorkflowGraph {
        WorkflowGraph {
            nodes: self.nodes,
            edges: self.edges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_insertion_order() {
        let graph = WorkflowGraph::builder()
            .node("s", NodeType::Start)
            .node("a", NodeType::Action)
            .node("e", NodeType::End)
            .link("s", "a")
            .link("a", "e")
            .build();

        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["s", "a", "e"]);
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.edges[0].id, "e-s-a");
        assert!(graph.node("a").is_some());
        assert!(graph.node("missing").is_none());
    }
}
