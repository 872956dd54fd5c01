use proptest::prelude::*;
use valuation_tree::layout::{LayoutConfig, layout};
use valuation_tree::tree::{Branch, Edge, FlowDirection, Node};

/// Random DAG: edges only run from a lower to a higher index.
fn dag() -> impl Strategy<Value = (Vec<Node>, Vec<Edge>)> {
    (1usize..10).prop_flat_map(|n| {
        prop::collection::vec((0..n, 0..n), 0..24).prop_map(move |pairs| {
            let nodes: Vec<Node> = (0..n)
                .map(|i| Node::question(&format!("n{}", i), &format!("node {}", i)))
                .collect();
            let mut seen = Vec::new();
            let edges: Vec<Edge> = pairs
                .into_iter()
                .filter(|(a, b)| a < b)
                .filter(|pair| {
                    let fresh = !seen.contains(pair);
                    seen.push(*pair);
                    fresh
                })
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

fn direction() -> impl Strategy<Value = FlowDirection> {
    prop_oneof![
        Just(FlowDirection::TopDown),
        Just(FlowDirection::BottomUp),
        Just(FlowDirection::LeftRight),
        Just(FlowDirection::RightLeft),
    ]
}

proptest! {
    #[test]
    fn everything_lands_inside_bounds((mut nodes, edges) in dag(), direction in direction()) {
        let config = LayoutConfig::default();
        let result = layout(&mut nodes, &edges, direction, &config).expect("acyclic input");
        let (w, h) = (result.bounds.width, result.bounds.height);

        for node in &nodes {
            prop_assert!(node.position.x >= -0.01 && node.position.y >= -0.01);
            prop_assert!(node.position.x + config.node_width <= w + 0.01);
            prop_assert!(node.position.y + config.node_height <= h + 0.01);
        }
        for (id, points) in &result.waypoints {
            for &(x, y) in points {
                prop_assert!(
                    (-0.01..=w + 0.01).contains(&x) && (-0.01..=h + 0.01).contains(&y),
                    "{} waypoint ({}, {}) outside {}x{}", id, x, y, w, h
                );
            }
        }
    }

    #[test]
    fn edges_follow_the_flow((mut nodes, edges) in dag()) {
        layout(&mut nodes, &edges, FlowDirection::TopDown, &LayoutConfig::default())
            .expect("acyclic input");
        for edge in &edges {
            let y = |id: &str| nodes.iter().find(|n| n.id == id).map(|n| n.position.y);
            prop_assert!(y(&edge.source) < y(&edge.target));
        }
    }
}
