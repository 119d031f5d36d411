//! Layered (Sugiyama-style) layout primitive.
//!
//! Phases: break cycles, rank by longest path, insert dummy vertices on long edges,
//! reduce crossings with barycenter sweeps, assign cross-axis coordinates, stack ranks.
//! Returns one center point per input node.

use std::collections::{HashSet, VecDeque};

use super::{Direction, LayoutError, LayoutSpacing};

/// Node as seen by the layout primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutNode<'a> {
    pub id: &'a str,
    pub width: f64,
    pub height: f64,
}

/// Graph handed to a [`LayeredLayout`]. Edges index into `nodes`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutGraph<'a> {
    pub nodes: Vec<LayoutNode<'a>>,
    pub edges: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Hierarchical layout algorithm: returns the center of every node, in node order.
pub trait LayeredLayout: Send + Sync {
    fn layout(
        &self,
        graph: &LayoutGraph<'_>,
        direction: Direction,
        spacing: &LayoutSpacing,
    ) -> Result<Vec<Point>, LayoutError>;
}

const DEFAULT_SWEEPS: usize = 4;
const COORDINATE_PASSES: usize = 4;

#[derive(Debug, Clone)]
pub struct SugiyamaLayout {
    sweeps: usize,
}

impl SugiyamaLayout {
    pub fn new() -> Self {
        Self {
            sweeps: DEFAULT_SWEEPS,
        }
    }
}

impl Default for SugiyamaLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl LayeredLayout for SugiyamaLayout {
    fn layout(
        &self,
        graph: &LayoutGraph<'_>,
        direction: Direction,
        spacing: &LayoutSpacing,
    ) -> Result<Vec<Point>, LayoutError> {
        let n = graph.nodes.len();
        if n == 0 {
            return Ok(Vec::new());
        }
        if let Some(&(s, t)) = graph.edges.iter().find(|(s, t)| *s >= n || *t >= n) {
            return Err(LayoutError::Primitive(format!(
                "edge ({s}, {t}) out of bounds for {n} nodes"
            )));
        }

        let horizontal = direction.is_horizontal();
        let (cross_sizes, rank_sizes): (Vec<f64>, Vec<f64>) = graph
            .nodes
            .iter()
            .map(|node| {
                if horizontal {
                    (node.height, node.width)
                } else {
                    (node.width, node.height)
                }
            })
            .unzip();

        let edges = acyclic_edges(n, &graph.edges);
        let ranks = longest_path_ranks(n, &edges);
        let mut layering = Layering::build(&cross_sizes, &ranks, &edges);
        self.reduce_crossings(&mut layering);

        let cross = layering.assign_cross(spacing.node_sep);
        let min_left = (0..n)
            .map(|v| cross[v] - cross_sizes[v] / 2.0)
            .fold(f64::INFINITY, f64::min);

        let rank_count = layering.layers.len();
        let mut rank_extent = vec![0.0_f64; rank_count];
        for v in 0..n {
            let r = ranks[v];
            rank_extent[r] = rank_extent[r].max(rank_sizes[v]);
        }
        let mut rank_center = Vec::with_capacity(rank_count);
        let mut top = 0.0;
        for (r, extent) in rank_extent.iter().enumerate() {
            if r > 0 {
                top += spacing.rank_sep;
            }
            rank_center.push(top + extent / 2.0);
            top += extent;
        }
        let total = top;

        let points = (0..n)
            .map(|v| {
                let c = cross[v] - min_left;
                let r = rank_center[ranks[v]];
                let (x, y) = match direction {
                    Direction::TopToBottom => (c, r),
                    Direction::BottomToTop => (c, total - r),
                    Direction::LeftToRight => (r, c),
                    Direction::RightToLeft => (total - r, c),
                };
                Point {
                    x: x + spacing.margin_x,
                    y: y + spacing.margin_y,
                }
            })
            .collect();
        Ok(points)
    }
}

impl SugiyamaLayout {
    fn reduce_crossings(&self, layering: &mut Layering) {
        let rank_count = layering.layers.len();
        if rank_count < 2 {
            return;
        }
        let mut best = layering.layers.clone();
        let mut best_crossings = layering.crossings();
        for sweep in 0..self.sweeps {
            if best_crossings == 0 {
                break;
            }
            if sweep % 2 == 0 {
                for r in 1..rank_count {
                    layering.reorder(r, true);
                }
            } else {
                for r in (0..rank_count - 1).rev() {
                    layering.reorder(r, false);
                }
            }
            let crossings = layering.crossings();
            if crossings < best_crossings {
                best_crossings = crossings;
                best = layering.layers.clone();
            }
        }
        layering.layers = best;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

/// Drop self-loops and reverse DFS back edges so the result is a DAG.
fn acyclic_edges(n: usize, edges: &[(usize, usize)]) -> Vec<(usize, usize)> {
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    for &(s, t) in edges {
        if s != t && !adjacency[s].contains(&t) {
            adjacency[s].push(t);
        }
    }

    let mut state = vec![Visit::New; n];
    let mut back_edges: HashSet<(usize, usize)> = HashSet::new();
    for root in 0..n {
        if state[root] != Visit::New {
            continue;
        }
        state[root] = Visit::Active;
        let mut stack = vec![(root, 0usize)];
        while let Some(top) = stack.last_mut() {
            let node = top.0;
            if top.1 < adjacency[node].len() {
                let child = adjacency[node][top.1];
                top.1 += 1;
                match state[child] {
                    Visit::New => {
                        state[child] = Visit::Active;
                        stack.push((child, 0));
                    }
                    Visit::Active => {
                        back_edges.insert((node, child));
                    }
                    Visit::Done => {}
                }
            } else {
                state[node] = Visit::Done;
                stack.pop();
            }
        }
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (s, targets) in adjacency.iter().enumerate() {
        for &t in targets {
            let edge = if back_edges.contains(&(s, t)) { (t, s) } else { (s, t) };
            if seen.insert(edge) {
                out.push(edge);
            }
        }
    }
    out
}

/// Rank = length of the longest path from any source.
fn longest_path_ranks(n: usize, edges: &[(usize, usize)]) -> Vec<usize> {
    let mut in_degree = vec![0usize; n];
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); n];
    for &(s, t) in edges {
        in_degree[t] += 1;
        outgoing[s].push(t);
    }
    let mut rank = vec![0usize; n];
    let mut queue: VecDeque<usize> = (0..n).filter(|&v| in_degree[v] == 0).collect();
    while let Some(u) = queue.pop_front() {
        for &v in &outgoing[u] {
            rank[v] = rank[v].max(rank[u] + 1);
            in_degree[v] -= 1;
            if in_degree[v] == 0 {
                queue.push_back(v);
            }
        }
    }
    rank
}

/// Proper layering: every edge spans exactly one rank. Vertices `0..n` are the real nodes,
/// the rest are zero-size dummies on long edges.
#[derive(Debug)]
struct Layering {
    cross_size: Vec<f64>,
    upper: Vec<Vec<usize>>,
    lower: Vec<Vec<usize>>,
    layers: Vec<Vec<usize>>,
}

impl Layering {
    fn build(cross_sizes: &[f64], ranks: &[usize], edges: &[(usize, usize)]) -> Self {
        let mut cross_size = cross_sizes.to_vec();
        let mut rank = ranks.to_vec();
        let mut upper: Vec<Vec<usize>> = vec![Vec::new(); cross_size.len()];
        let mut lower: Vec<Vec<usize>> = vec![Vec::new(); cross_size.len()];

        for &(s, t) in edges {
            let mut prev = s;
            for r in rank[s] + 1..rank[t] {
                let dummy = cross_size.len();
                cross_size.push(0.0);
                rank.push(r);
                upper.push(vec![prev]);
                lower.push(Vec::new());
                lower[prev].push(dummy);
                prev = dummy;
            }
            lower[prev].push(t);
            upper[t].push(prev);
        }

        let rank_count = rank.iter().copied().max().map_or(0, |m| m + 1);
        let mut layers: Vec<Vec<usize>> = vec![Vec::new(); rank_count];
        for (v, &r) in rank.iter().enumerate() {
            layers[r].push(v);
        }

        Self {
            cross_size,
            upper,
            lower,
            layers,
        }
    }

    fn positions(&self) -> Vec<usize> {
        let mut pos = vec![0usize; self.cross_size.len()];
        for layer in &self.layers {
            for (i, &v) in layer.iter().enumerate() {
                pos[v] = i;
            }
        }
        pos
    }

    /// Stable sort of layer `r` by the mean position of its neighbors in the adjacent
    /// layer above (`from_upper`) or below.
    fn reorder(&mut self, r: usize, from_upper: bool) {
        let pos = self.positions();
        let neighbors = if from_upper { &self.upper } else { &self.lower };
        let mut keyed: Vec<(f64, usize)> = self.layers[r]
            .iter()
            .map(|&v| {
                let adj = &neighbors[v];
                let key = if adj.is_empty() {
                    pos[v] as f64
                } else {
                    adj.iter().map(|&u| pos[u] as f64).sum::<f64>() / adj.len() as f64
                };
                (key, v)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        self.layers[r] = keyed.into_iter().map(|(_, v)| v).collect();
    }

    fn crossings(&self) -> usize {
        let pos = self.positions();
        let mut total = 0;
        for layer in &self.layers {
            let segments: Vec<(usize, usize)> = layer
                .iter()
                .flat_map(|&u| self.lower[u].iter().map(move |&v| (u, v)))
                .map(|(u, v)| (pos[u], pos[v]))
                .collect();
            for (i, a) in segments.iter().enumerate() {
                for b in &segments[i + 1..] {
                    if (a.0 < b.0 && a.1 > b.1) || (a.0 > b.0 && a.1 < b.1) {
                        total += 1;
                    }
                }
            }
        }
        total
    }

    /// Cross-axis centers. Starts packed, then pulls each vertex toward the mean of its
    /// neighbors while keeping `node_sep` between boxes of the same layer.
    fn assign_cross(&self, node_sep: f64) -> Vec<f64> {
        let mut coord = vec![0.0; self.cross_size.len()];
        for layer in &self.layers {
            let desired = vec![f64::NEG_INFINITY; layer.len()];
            self.place(layer, &desired, &mut coord, node_sep);
        }

        let rank_count = self.layers.len();
        for pass in 0..COORDINATE_PASSES {
            let downward = pass % 2 == 0;
            let order: Vec<usize> = if downward {
                (1..rank_count).collect()
            } else {
                (0..rank_count.saturating_sub(1)).rev().collect()
            };
            for r in order {
                let layer = &self.layers[r];
                let desired: Vec<f64> = layer
                    .iter()
                    .map(|&v| {
                        let adj = if downward { &self.upper[v] } else { &self.lower[v] };
                        if adj.is_empty() {
                            coord[v]
                        } else {
                            adj.iter().map(|&u| coord[u]).sum::<f64>() / adj.len() as f64
                        }
                    })
                    .collect();
                self.place(layer, &desired, &mut coord, node_sep);
            }
        }
        coord
    }

    fn place(&self, layer: &[usize], desired: &[f64], coord: &mut [f64], node_sep: f64) {
        let mut prev: Option<usize> = None;
        for (&v, &want) in layer.iter().zip(desired) {
            let half = self.cross_size[v] / 2.0;
            let min = match prev {
                Some(p) => coord[p] + self.cross_size[p] / 2.0 + node_sep + half,
                None => half,
            };
            coord[v] = if prev.is_none() && want.is_finite() {
                want
            } else {
                want.max(min)
            };
            prev = Some(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, width: f64, height: f64) -> LayoutNode<'_> {
        LayoutNode { id, width, height }
    }

    fn run(graph: &LayoutGraph<'_>, direction: Direction) -> Vec<Point> {
        SugiyamaLayout::default()
            .layout(graph, direction, &LayoutSpacing::default())
            .unwrap()
    }

    #[test]
    fn empty_graph_has_no_points() {
        assert!(run(&LayoutGraph::default(), Direction::TopToBottom).is_empty());
    }

    #[test]
    fn chain_stacks_ranks_with_rank_sep() {
        let graph = LayoutGraph {
            nodes: vec![node("a", 100.0, 50.0), node("b", 100.0, 50.0)],
            edges: vec![(0, 1)],
        };
        let pts = run(&graph, Direction::TopToBottom);
        assert_eq!(pts[0], Point { x: 50.0, y: 25.0 });
        assert_eq!(pts[1], Point { x: 50.0, y: 175.0 });
    }

    #[test]
    fn siblings_are_separated_by_node_sep() {
        let graph = LayoutGraph {
            nodes: vec![
                node("root", 100.0, 50.0),
                node("l", 100.0, 50.0),
                node("r", 100.0, 50.0),
            ],
            edges: vec![(0, 1), (0, 2)],
        };
        let pts = run(&graph, Direction::TopToBottom);
        assert_eq!(pts[1].y, pts[2].y);
        assert_eq!((pts[2].x - pts[1].x).abs(), 126.0);
        assert_eq!(pts[0].x, (pts[1].x + pts[2].x) / 2.0);
    }

    #[test]
    fn long_edge_does_not_pull_ranks_together() {
        let graph = LayoutGraph {
            nodes: vec![
                node("a", 10.0, 10.0),
                node("b", 10.0, 10.0),
                node("c", 10.0, 10.0),
            ],
            edges: vec![(0, 1), (1, 2), (0, 2)],
        };
        let pts = run(&graph, Direction::TopToBottom);
        assert!(pts[0].y < pts[1].y);
        assert!(pts[1].y < pts[2].y);
    }

    #[test]
    fn cycles_terminate_and_still_layer() {
        let graph = LayoutGraph {
            nodes: vec![node("a", 10.0, 10.0), node("b", 10.0, 10.0)],
            edges: vec![(0, 1), (1, 0), (1, 1)],
        };
        let pts = run(&graph, Direction::TopToBottom);
        assert_eq!(pts.len(), 2);
        assert_ne!(pts[0].y, pts[1].y);
    }

    #[test]
    fn left_to_right_swaps_axes() {
        let graph = LayoutGraph {
            nodes: vec![node("a", 100.0, 50.0), node("b", 100.0, 50.0)],
            edges: vec![(0, 1)],
        };
        let pts = run(&graph, Direction::LeftToRight);
        assert_eq!(pts[0], Point { x: 50.0, y: 25.0 });
        assert_eq!(pts[1], Point { x: 250.0, y: 25.0 });
    }

    #[test]
    fn bottom_to_top_flips_ranks() {
        let graph = LayoutGraph {
            nodes: vec![node("a", 100.0, 50.0), node("b", 100.0, 50.0)],
            edges: vec![(0, 1)],
        };
        let pts = run(&graph, Direction::BottomToTop);
        assert_eq!(pts[0].y, 175.0);
        assert_eq!(pts[1].y, 25.0);
    }

    #[test]
    fn barycenter_sweeps_remove_simple_crossing() {
        // a -> d, b -> c with c listed before d: one crossing until reordered.
        let graph = LayoutGraph {
            nodes: vec![
                node("a", 10.0, 10.0),
                node("b", 10.0, 10.0),
                node("c", 10.0, 10.0),
                node("d", 10.0, 10.0),
            ],
            edges: vec![(0, 3), (1, 2)],
        };
        let pts = run(&graph, Direction::TopToBottom);
        let a_left_of_b = pts[0].x < pts[1].x;
        let d_left_of_c = pts[3].x < pts[2].x;
        assert_eq!(a_left_of_b, d_left_of_c);
    }

    #[test]
    fn out_of_bounds_edge_is_rejected() {
        let graph = LayoutGraph {
            nodes: vec![node("a", 10.0, 10.0)],
            edges: vec![(0, 5)],
        };
        let err = SugiyamaLayout::default()
            .layout(&graph, Direction::TopToBottom, &LayoutSpacing::default())
            .unwrap_err();
        assert!(matches!(err, LayoutError::Primitive(_)));
    }
}
