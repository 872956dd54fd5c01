use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::error::Result;
use crate::tree::validate::{check_references, topological_order};
use crate::tree::{Edge, EdgeId, FlowDirection, Node, NodeId, Position};

/// Bounding box for layout elements
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn with_padding(&self, padding: f32) -> Self {
        Self::new(
            self.x - padding,
            self.y - padding,
            self.width + padding * 2.0,
            self.height + padding * 2.0,
        )
    }
}

/// Box sizes and spacing used by the layered layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub node_width: f32,
    pub node_height: f32,
    /// Gap between neighbouring boxes in the same rank
    pub node_spacing: f32,
    /// Gap between consecutive ranks
    pub rank_spacing: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 220.0,
            node_height: 90.0,
            node_spacing: 50.0,
            rank_spacing: 50.0,
        }
    }
}

/// Result of a layout pass. Node positions are also written back onto the
/// node slice that was laid out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub direction: FlowDirection,
    pub node_width: f32,
    pub node_height: f32,
    pub ranks: BTreeMap<NodeId, usize>,
    /// Intermediate points for edges that span more than one rank
    pub waypoints: BTreeMap<EdgeId, Vec<(f32, f32)>>,
    pub bounds: BBox,
}

impl Layout {
    /// Box of a node given its stored top-left position
    pub fn node_box(&self, position: Position) -> BBox {
        BBox::new(position.x, position.y, self.node_width, self.node_height)
    }
}

/// Vertex in the layered graph: either a real node or a dummy standing in
/// for one rank of a long edge.
#[derive(Debug, Clone, Copy)]
enum Vertex {
    Real,
    Dummy,
}

/// Layered (Sugiyama-style) layout engine. One engine is built per call so
/// no state carries over between diagrams.
struct LayoutEngine {
    config: LayoutConfig,
    direction: FlowDirection,
}

impl LayoutEngine {
    fn new(config: LayoutConfig, direction: FlowDirection) -> Self {
        Self { config, direction }
    }

    /// Size of a vertex along the rank (x for vertical flows)
    fn along_size(&self, vertex: Vertex) -> f32 {
        match vertex {
            Vertex::Dummy => 0.0,
            Vertex::Real if self.direction.is_vertical() => self.config.node_width,
            Vertex::Real => self.config.node_height,
        }
    }

    /// Size of a vertex across ranks (y for vertical flows)
    fn across_size(&self, vertex: Vertex) -> f32 {
        match vertex {
            Vertex::Dummy => 0.0,
            Vertex::Real if self.direction.is_vertical() => self.config.node_height,
            Vertex::Real => self.config.node_width,
        }
    }

    fn run(&self, nodes: &mut [Node], edges: &[Edge]) -> Result<Layout> {
        check_references(nodes, edges)?;
        let order = topological_order(nodes, edges)?;

        let index: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();
        let edge_ends: Vec<(usize, usize)> = edges
            .iter()
            .map(|e| (index[e.source.as_str()], index[e.target.as_str()]))
            .collect();

        // --- Phase 1: longest-path ranking ---
        let mut rank = vec![0usize; nodes.len()];
        for id in &order {
            let v = index[id];
            for &(from, to) in &edge_ends {
                if from == v {
                    rank[to] = rank[to].max(rank[v] + 1);
                }
            }
        }

        // --- Phase 2: dummy vertices for long edges ---
        let mut vertices: Vec<Vertex> = vec![Vertex::Real; nodes.len()];
        let mut vertex_rank: Vec<usize> = rank.clone();
        let mut chains: Vec<Vec<usize>> = vec![Vec::new(); edges.len()];
        let mut links: Vec<(usize, usize)> = Vec::new();

        for (e, &(from, to)) in edge_ends.iter().enumerate() {
            let mut prev = from;
            for r in (rank[from] + 1)..rank[to] {
                let dummy = vertices.len();
                vertices.push(Vertex::Dummy);
                vertex_rank.push(r);
                chains[e].push(dummy);
                links.push((prev, dummy));
                prev = dummy;
            }
            links.push((prev, to));
        }
        trace!(
            vertices = vertices.len(),
            dummies = vertices.len() - nodes.len(),
            "layered graph built"
        );

        let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); vertices.len()];
        let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); vertices.len()];
        for &(from, to) in &links {
            outgoing[from].push(to);
            incoming[to].push(from);
        }

        let max_rank = vertex_rank.iter().copied().max().unwrap_or(0);
        let mut layers: Vec<Vec<usize>> = vec![Vec::new(); max_rank + 1];
        for (v, &r) in vertex_rank.iter().enumerate() {
            layers[r].push(v);
        }

        // --- Phase 3: crossing reduction by barycenter sweeps ---
        for _ in 0..6 {
            for r in 1..layers.len() {
                let (above, rest) = layers.split_at_mut(r);
                sort_by_barycenter(&mut rest[0], &above[r - 1], &incoming);
            }
            for r in (0..layers.len().saturating_sub(1)).rev() {
                let (head, below) = layers.split_at_mut(r + 1);
                sort_by_barycenter(&mut head[r], &below[0], &outgoing);
            }
        }

        // --- Phase 4: coordinates ---
        // `along` is the centre within a rank, `across` the centre of the rank.
        let mut along = vec![0.0f32; vertices.len()];
        let mut across = vec![0.0f32; vertices.len()];

        let layer_extent = |layer: &[usize]| -> f32 {
            layer.iter().map(|&v| self.along_size(vertices[v])).sum::<f32>()
                + self.config.node_spacing * layer.len().saturating_sub(1) as f32
        };
        let widest = layers
            .iter()
            .map(|l| layer_extent(l.as_slice()))
            .fold(0.0, f32::max);

        let mut rank_start = 0.0f32;
        for layer in &layers {
            let depth = layer
                .iter()
                .map(|&v| self.across_size(vertices[v]))
                .fold(0.0, f32::max);
            let mut cursor = (widest - layer_extent(layer.as_slice())) / 2.0;
            for &v in layer {
                let size = self.along_size(vertices[v]);
                along[v] = cursor + size / 2.0;
                across[v] = rank_start + depth / 2.0;
                cursor += size + self.config.node_spacing;
            }
            rank_start += depth + self.config.rank_spacing;
        }

        for _ in 0..4 {
            for r in 1..layers.len() {
                self.align_to_neighbours(&layers[r], &incoming, &vertices, &mut along);
            }
            for r in (0..layers.len().saturating_sub(1)).rev() {
                self.align_to_neighbours(&layers[r], &outgoing, &vertices, &mut along);
            }
        }

        // --- Phase 5: map to screen space and normalise ---
        let to_screen = |a: f32, c: f32| -> (f32, f32) {
            match self.direction {
                FlowDirection::TopDown => (a, c),
                FlowDirection::BottomUp => (a, -c),
                FlowDirection::LeftRight => (c, a),
                FlowDirection::RightLeft => (-c, a),
            }
        };

        let half_w = self.config.node_width / 2.0;
        let half_h = self.config.node_height / 2.0;
        let anchors: Vec<(f32, f32)> = (0..vertices.len())
            .map(|v| to_screen(along[v], across[v]))
            .collect();

        // Dummies count too: alignment can push a long edge past every box.
        let extent = |v: usize| match vertices[v] {
            Vertex::Real => (half_w, half_h),
            Vertex::Dummy => (0.0, 0.0),
        };
        let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
        let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
        for (v, &(x, y)) in anchors.iter().enumerate() {
            let (hw, hh) = extent(v);
            min_x = min_x.min(x - hw);
            min_y = min_y.min(y - hh);
            max_x = max_x.max(x + hw);
            max_y = max_y.max(y + hh);
        }
        if anchors.is_empty() {
            (min_x, min_y, max_x, max_y) = (0.0, 0.0, 0.0, 0.0);
        }
        let shift = |(x, y): (f32, f32)| (x - min_x, y - min_y);

        for (i, node) in nodes.iter_mut().enumerate() {
            let (cx, cy) = shift(anchors[i]);
            node.position = Position {
                x: cx - half_w,
                y: cy - half_h,
            };
        }

        let mut waypoints = BTreeMap::new();
        for (e, chain) in chains.iter().enumerate() {
            if !chain.is_empty() {
                let points = chain.iter().map(|&d| shift(anchors[d])).collect();
                waypoints.insert(edges[e].id.clone(), points);
            }
        }

        let ranks = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), rank[i]))
            .collect();

        Ok(Layout {
            direction: self.direction,
            node_width: self.config.node_width,
            node_height: self.config.node_height,
            ranks,
            waypoints,
            bounds: BBox::new(0.0, 0.0, max_x - min_x, max_y - min_y),
        })
    }

    /// Pull each vertex towards the median centre of its neighbours in the
    /// adjacent rank, then push right to keep the minimum spacing.
    fn align_to_neighbours(
        &self,
        layer: &[usize],
        neighbours: &[Vec<usize>],
        vertices: &[Vertex],
        along: &mut [f32],
    ) {
        for &v in layer {
            let mut centers: Vec<f32> = neighbours[v].iter().map(|&n| along[n]).collect();
            if centers.is_empty() {
                continue;
            }
            centers.sort_by(|a, b| a.total_cmp(b));
            along[v] = centers[centers.len() / 2];
        }

        let mut prev_edge = f32::NEG_INFINITY;
        for &v in layer {
            let half = self.along_size(vertices[v]) / 2.0;
            let min_center = prev_edge + self.config.node_spacing + half;
            if along[v] < min_center {
                along[v] = min_center;
            }
            prev_edge = along[v] + half;
        }
    }
}

/// Reorder `layer` by the mean position of each vertex's neighbours in
/// `fixed`. Vertices without neighbours there sort last; ties keep index order.
fn sort_by_barycenter(layer: &mut [usize], fixed: &[usize], neighbours: &[Vec<usize>]) {
    let pos: HashMap<usize, usize> = fixed.iter().enumerate().map(|(i, &v)| (v, i)).collect();
    let barycenter = |v: usize| -> Option<f32> {
        let hits: Vec<usize> = neighbours[v]
            .iter()
            .filter_map(|n| pos.get(n).copied())
            .collect();
        if hits.is_empty() {
            None
        } else {
            Some(hits.iter().sum::<usize>() as f32 / hits.len() as f32)
        }
    };

    layer.sort_by(|&a, &b| match (barycenter(a), barycenter(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y).then(a.cmp(&b)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.cmp(&b),
    });
}

/// Lay out `nodes` as a layered diagram flowing in `direction`.
///
/// Every node is treated as a `node_width` x `node_height` box. The stored
/// position is the box's top-left corner, i.e. the computed centre minus half
/// the box size. Malformed edge references and cycles are rejected before any
/// coordinates are computed.
#[instrument(level = "debug", skip(nodes, edges, config), fields(nodes = nodes.len(), edges = edges.len()))]
pub fn layout(
    nodes: &mut [Node],
    edges: &[Edge],
    direction: FlowDirection,
    config: &LayoutConfig,
) -> Result<Layout> {
    let result = LayoutEngine::new(*config, direction).run(nodes, edges)?;
    debug!(
        width = result.bounds.width,
        height = result.bounds.height,
        "layout complete"
    );
    Ok(result)
}
