use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, instrument};

use crate::error::ConfigError;

use super::types::{DecisionTree, Edge, Node};

/// Check that node and edge ids are unique and that every edge endpoint
/// names an existing node. This is the minimum the layout engine needs.
pub fn check_references(nodes: &[Node], edges: &[Edge]) -> Result<(), ConfigError> {
    let mut node_ids: HashSet<&str> = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if !node_ids.insert(node.id.as_str()) {
            return Err(ConfigError::DuplicateNodeId(node.id.clone()));
        }
    }

    let mut edge_ids: HashSet<&str> = HashSet::with_capacity(edges.len());
    for edge in edges {
        if !edge_ids.insert(edge.id.as_str()) {
            return Err(ConfigError::DuplicateEdgeId(edge.id.clone()));
        }
        for endpoint in [&edge.source, &edge.target] {
            if !node_ids.contains(endpoint.as_str()) {
                return Err(ConfigError::DanglingEdge {
                    edge: edge.id.clone(),
                    endpoint: endpoint.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Return the nodes in a topological order, or the first node left on a
/// cycle. Assumes `check_references` passed.
pub fn topological_order<'a>(
    nodes: &'a [Node],
    edges: &'a [Edge],
) -> Result<Vec<&'a str>, ConfigError> {
    let mut in_degree: HashMap<&str, usize> =
        nodes.iter().map(|n| (n.id.as_str(), 0)).collect();
    let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        outgoing
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
        if let Some(d) = in_degree.get_mut(edge.target.as_str()) {
            *d += 1;
        }
    }

    // Seed in declaration order so the result is stable.
    let mut queue: VecDeque<&str> = nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| in_degree.get(id).copied() == Some(0))
        .collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(id) = queue.pop_front() {
        order.push(id);
        for &next in outgoing.get(id).map(Vec::as_slice).unwrap_or(&[]) {
            if let Some(d) = in_degree.get_mut(next) {
                *d -= 1;
                if *d == 0 {
                    queue.push_back(next);
                }
            }
        }
    }

    if order.len() < nodes.len() {
        let placed: HashSet<&str> = order.iter().copied().collect();
        let stuck = nodes
            .iter()
            .find(|n| !placed.contains(n.id.as_str()))
            .map(|n| n.id.clone())
            .unwrap_or_default();
        return Err(ConfigError::Cycle { node: stuck });
    }

    Ok(order)
}

/// Full structural validation of a decision tree: unique ids, resolvable
/// edges, a single start node, no cycles, and every node reachable from
/// the start.
#[instrument(level = "debug", skip(tree), fields(nodes = tree.nodes.len(), edges = tree.edges.len()))]
pub fn validate(tree: &DecisionTree) -> Result<(), ConfigError> {
    check_references(&tree.nodes, &tree.edges)?;

    let starts: Vec<&Node> = tree.nodes.iter().filter(|n| n.is_start()).collect();
    let start = match starts.as_slice() {
        [] => return Err(ConfigError::MissingStart),
        [only] => *only,
        many => {
            return Err(ConfigError::MultipleStarts(
                many.iter().map(|n| n.id.clone()).collect(),
            ));
        }
    };

    topological_order(&tree.nodes, &tree.edges)?;

    let mut reached: HashSet<&str> = HashSet::new();
    let mut stack = vec![start.id.as_str()];
    reached.insert(start.id.as_str());
    while let Some(id) = stack.pop() {
        for edge in tree.edges.iter().filter(|e| e.source == id) {
            if reached.insert(edge.target.as_str()) {
                stack.push(edge.target.as_str());
            }
        }
    }
    if let Some(orphan) = tree.nodes.iter().find(|n| !reached.contains(n.id.as_str())) {
        return Err(ConfigError::Unreachable {
            node: orphan.id.clone(),
        });
    }

    debug!("decision tree is well formed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::content::valuation_tree;
    use crate::tree::types::Branch;

    fn tiny() -> DecisionTree {
        DecisionTree::new(
            vec![
                Node::start("start", "Start"),
                Node::question("q", "Q?"),
                Node::question("r", "R?"),
            ],
            vec![
                Edge::new("e0", "start", "q", Branch::Unlabeled),
                Edge::new("e1", "q", "r", Branch::Yes),
            ],
        )
    }

    #[test]
    fn builtin_tree_is_valid() {
        validate(&valuation_tree()).expect("built-in content must validate");
    }

    #[test]
    fn rejects_duplicate_node() {
        let mut tree = tiny();
        tree.nodes.push(Node::question("q", "again"));
        assert_eq!(
            validate(&tree),
            Err(ConfigError::DuplicateNodeId("q".to_string()))
        );
    }

    #[test]
    fn rejects_duplicate_edge() {
        let mut tree = tiny();
        tree.edges.push(Edge::new("e1", "start", "r", Branch::No));
        assert_eq!(
            validate(&tree),
            Err(ConfigError::DuplicateEdgeId("e1".to_string()))
        );
    }

    #[test]
    fn rejects_dangling_edge() {
        let mut tree = tiny();
        tree.edges.push(Edge::new("e2", "r", "ghost", Branch::No));
        assert_eq!(
            validate(&tree),
            Err(ConfigError::DanglingEdge {
                edge: "e2".to_string(),
                endpoint: "ghost".to_string()
            })
        );
    }

    #[test]
    fn rejects_cycle() {
        let mut tree = tiny();
        tree.edges.push(Edge::new("e2", "r", "q", Branch::No));
        assert!(matches!(validate(&tree), Err(ConfigError::Cycle { .. })));
    }

    #[test]
    fn rejects_missing_and_multiple_starts() {
        let mut tree = tiny();
        tree.nodes.retain(|n| !n.is_start());
        tree.edges.retain(|e| e.source != "start");
        assert_eq!(validate(&tree), Err(ConfigError::MissingStart));

        let mut tree = tiny();
        tree.nodes.push(Node::start("start2", "Again"));
        assert!(matches!(
            validate(&tree),
            Err(ConfigError::MultipleStarts(ids)) if ids == vec!["start", "start2"]
        ));
    }

    #[test]
    fn rejects_unreachable_node() {
        let mut tree = tiny();
        tree.nodes.push(Node::question("island", "Alone?"));
        assert_eq!(
            validate(&tree),
            Err(ConfigError::Unreachable {
                node: "island".to_string()
            })
        );
    }

    #[test]
    fn topological_order_respects_edges() {
        let tree = valuation_tree();
        let order = topological_order(&tree.nodes, &tree.edges).expect("acyclic");
        let index: HashMap<&str, usize> =
            order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        for edge in &tree.edges {
            assert!(index[edge.source.as_str()] < index[edge.target.as_str()]);
        }
    }
}
