use std::collections::{HashMap, HashSet};

use super::types::{Edge, EdgeId, Node, NodeId};

/// Nodes and edges reached by a connectivity query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Connected {
    pub nodes: HashSet<NodeId>,
    pub edges: HashSet<EdgeId>,
}

impl Connected {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains(id)
    }

    pub fn contains_edge(&self, id: &str) -> bool {
        self.edges.contains(id)
    }
}

#[derive(Clone, Copy)]
enum Walk {
    Backward,
    Forward,
}

fn walk(start: &str, nodes: &[Node], edges: &[Edge], dir: Walk) -> Connected {
    if !nodes.iter().any(|n| n.id == start) {
        return Connected::default();
    }

    let mut adjacency: HashMap<&str, Vec<&Edge>> = HashMap::new();
    for edge in edges {
        let key = match dir {
            Walk::Backward => edge.target.as_str(),
            Walk::Forward => edge.source.as_str(),
        };
        adjacency.entry(key).or_default().push(edge);
    }

    let mut result = Connected::default();
    result.nodes.insert(start.to_string());
    let mut stack: Vec<&str> = vec![start];

    while let Some(current) = stack.pop() {
        let Some(next_edges) = adjacency.get(current) else {
            continue;
        };
        for edge in next_edges {
            result.edges.insert(edge.id.clone());
            let next = match dir {
                Walk::Backward => edge.source.as_str(),
                Walk::Forward => edge.target.as_str(),
            };
            // Mark before pushing: converging paths enqueue a node once.
            if result.nodes.insert(next.to_string()) {
                stack.push(next);
            }
        }
    }

    result
}

/// Every node with a directed path to `target` (including `target`) and
/// every edge on such a path. Unknown ids yield empty sets.
pub fn ancestors(target: &str, nodes: &[Node], edges: &[Edge]) -> Connected {
    walk(target, nodes, edges, Walk::Backward)
}

/// Every node reachable from `source` (including `source`) and the edges
/// traversed to reach them. Unknown ids yield empty sets.
pub fn descendants(source: &str, nodes: &[Node], edges: &[Edge]) -> Connected {
    walk(source, nodes, edges, Walk::Forward)
}

/// The ancestors of `target` ordered from the root down to `target`.
///
/// Ties between nodes at the same depth keep declaration order.
pub fn path_to(target: &str, nodes: &[Node], edges: &[Edge]) -> Vec<NodeId> {
    let connected = ancestors(target, nodes, edges);
    if connected.is_empty() {
        return Vec::new();
    }

    let mut depth: HashMap<&str, usize> = HashMap::new();
    let members: Vec<&Node> = nodes
        .iter()
        .filter(|n| connected.contains_node(&n.id))
        .collect();

    // Longest distance from a root within the ancestor subgraph; the
    // subgraph is small, so relax until stable.
    let inner: Vec<&Edge> = edges
        .iter()
        .filter(|e| connected.contains_edge(&e.id))
        .collect();
    for node in &members {
        depth.insert(node.id.as_str(), 0);
    }
    for _ in 0..members.len() {
        let mut changed = false;
        for edge in &inner {
            let candidate = depth.get(edge.source.as_str()).copied().unwrap_or(0) + 1;
            let entry = depth.entry(edge.target.as_str()).or_insert(0);
            if candidate > *entry {
                *entry = candidate;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let mut ordered: Vec<(usize, usize, &Node)> = members
        .iter()
        .enumerate()
        .map(|(i, n)| (depth.get(n.id.as_str()).copied().unwrap_or(0), i, *n))
        .collect();
    ordered.sort_by_key(|(d, i, _)| (*d, *i));
    ordered.into_iter().map(|(_, _, n)| n.id.clone()).collect()
}
