use std::collections::HashSet;

use proptest::prelude::*;
use valuation_tree::tree::{Branch, Edge, Node, ancestors, descendants};

/// Random DAG: edges only run from a lower to a higher index.
fn dag() -> impl Strategy<Value = (Vec<Node>, Vec<Edge>)> {
    (1usize..12).prop_flat_map(|n| {
        prop::collection::vec((0..n, 0..n), 0..30).prop_map(move |pairs| {
            let nodes: Vec<Node> = (0..n)
                .map(|i| Node::question(&format!("n{}", i), &format!("node {}", i)))
                .collect();
            let edges: Vec<Edge> = pairs
                .into_iter()
                .filter(|(a, b)| a < b)
                .enumerate()
                .map(|(k, (a, b))| {
                    Edge::new(
                        &format!("e{}", k),
                        &format!("n{}", a),
                        &format!("n{}", b),
                        Branch::Unlabeled,
                    )
                })
                .collect();
            (nodes, edges)
        })
    })
}

/// Nodes with a path to `target`, found by repeated relaxation.
fn reaches(target: &str, nodes: &[Node], edges: &[Edge]) -> HashSet<String> {
    let mut found: HashSet<String> = HashSet::from([target.to_string()]);
    loop {
        let before = found.len();
        for edge in edges {
            if found.contains(&edge.target) {
                found.insert(edge.source.clone());
            }
        }
        if found.len() == before {
            break;
        }
    }
    found.retain(|id| nodes.iter().any(|n| &n.id == id));
    found
}

proptest! {
    #[test]
    fn ancestors_match_reachability((nodes, edges) in dag(), pick in any::<prop::sample::Index>()) {
        let target = &nodes[pick.index(nodes.len())].id;
        let result = ancestors(target, &nodes, &edges);

        prop_assert_eq!(&result.nodes, &reaches(target, &nodes, &edges));
        let expected_edges: HashSet<String> = edges
            .iter()
            .filter(|e| result.nodes.contains(&e.target))
            .map(|e| e.id.clone())
            .collect();
        prop_assert_eq!(&result.edges, &expected_edges);
    }

    #[test]
    fn ancestors_are_closed_under_repeat(
        (nodes, edges) in dag(),
        pick in any::<prop::sample::Index>(),
    ) {
        let target = &nodes[pick.index(nodes.len())].id;
        let first = ancestors(target, &nodes, &edges);
        for member in &first.nodes {
            let again = ancestors(member, &nodes, &edges);
            prop_assert!(again.nodes.is_subset(&first.nodes));
            prop_assert!(again.edges.is_subset(&first.edges));
        }
        prop_assert_eq!(first, ancestors(target, &nodes, &edges));
    }

    #[test]
    fn descendants_mirror_ancestors(
        (nodes, edges) in dag(),
        a in any::<prop::sample::Index>(),
        b in any::<prop::sample::Index>(),
    ) {
        let x = &nodes[a.index(nodes.len())].id;
        let y = &nodes[b.index(nodes.len())].id;
        prop_assert_eq!(
            ancestors(y, &nodes, &edges).contains_node(x),
            descendants(x, &nodes, &edges).contains_node(y)
        );
    }

    #[test]
    fn unknown_target_is_empty((nodes, edges) in dag()) {
        prop_assert!(ancestors("missing", &nodes, &edges).is_empty());
    }
}
