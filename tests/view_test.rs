use rstest::{fixture, rstest};
use valuation_tree::layout::LayoutConfig;
use valuation_tree::tree::{Category, DecisionTree, FlowDirection, ancestors, path_to};
use valuation_tree::view::{ClickOutcome, DiagramView};

#[fixture]
fn view() -> DiagramView {
    DiagramView::new(
        DecisionTree::builtin().expect("built-in tree is valid"),
        FlowDirection::TopDown,
        &LayoutConfig::default(),
    )
    .expect("layout")
}

#[rstest]
#[case("ccf", Category::Income)]
#[case("residual", Category::Income)]
#[case("vc", Category::Income)]
#[case("asset", Category::Asset)]
#[case("liquidation", Category::Asset)]
#[case("market", Category::Market)]
#[case("lbo", Category::Option)]
#[case("option", Category::Option)]
fn clicking_a_model_opens_its_panel(
    mut view: DiagramView,
    #[case] id: &str,
    #[case] category: Category,
) {
    let ClickOutcome::Selected(panel) = view.click(Some(id)) else {
        panic!("{} should open the panel", id);
    };
    assert_eq!(panel.node_id, id);
    assert_eq!(panel.category, category);
    assert!(!panel.formula.is_empty());
    assert!(panel.description.contains("How to use:"));
    assert_eq!(view.selected(), Some(id));
}

#[rstest]
#[case(Some("start"))]
#[case(Some("q1"))]
#[case(Some("q6"))]
#[case(Some("ghost"))]
#[case(None)]
fn other_clicks_clear(mut view: DiagramView, #[case] target: Option<&str>) {
    view.click(Some("dcf"));
    assert_eq!(view.click(target), ClickOutcome::Cleared);
    assert!(view.detail_panel().is_none());
    assert!(view.tree().nodes.iter().all(|n| !n.selected));
}

#[rstest]
fn clicks_leave_positions_alone(mut view: DiagramView) {
    let before: Vec<_> = view.tree().nodes.iter().map(|n| n.position).collect();
    view.click(Some("vc"));
    view.click(None);
    let after: Vec<_> = view.tree().nodes.iter().map(|n| n.position).collect();
    assert_eq!(before, after);
}

#[rstest]
fn residual_ancestors() {
    let tree = DecisionTree::builtin().expect("tree");
    let found = ancestors("residual", &tree.nodes, &tree.edges);

    let mut nodes: Vec<_> = found.nodes.iter().map(String::as_str).collect();
    nodes.sort();
    assert_eq!(nodes, ["q1", "q1a", "residual", "start"]);

    let mut edges: Vec<_> = found.edges.iter().map(String::as_str).collect();
    edges.sort();
    assert_eq!(edges, ["e0", "e1", "e3"]);

    assert_eq!(
        path_to("residual", &tree.nodes, &tree.edges),
        ["start", "q1", "q1a", "residual"]
    );
}

#[rstest]
fn ccf_ancestors() {
    let tree = DecisionTree::builtin().expect("tree");
    let found = ancestors("ccf", &tree.nodes, &tree.edges);

    let mut nodes: Vec<_> = found.nodes.iter().map(String::as_str).collect();
    nodes.sort();
    assert_eq!(nodes, ["ccf", "q1", "q1a", "start"]);

    let mut edges: Vec<_> = found.edges.iter().map(String::as_str).collect();
    edges.sort();
    assert_eq!(edges, ["e0", "e1", "e4"]);

    // Repeating the query gives the same sets
    assert_eq!(found, ancestors("ccf", &tree.nodes, &tree.edges));
}

#[rstest]
fn start_is_its_own_only_ancestor() {
    let tree = DecisionTree::builtin().expect("tree");
    let found = ancestors("start", &tree.nodes, &tree.edges);
    assert_eq!(found.nodes.len(), 1);
    assert!(found.edges.is_empty());
}

#[rstest]
fn connecting_keeps_layout(mut view: DiagramView) {
    let before: Vec<_> = view.tree().nodes.iter().map(|n| n.position).collect();
    let id = view.connect("q5", "dcf").expect("new connection");
    assert!(view.tree().edge(&id).is_some());
    let after: Vec<_> = view.tree().nodes.iter().map(|n| n.position).collect();
    assert_eq!(before, after);

    // The new edge now feeds dcf's ancestor set
    view.click(Some("dcf"));
    assert!(view.ancestors_of_selection().contains_node("q5"));
}

#[rstest]
#[case(FlowDirection::TopDown)]
#[case(FlowDirection::BottomUp)]
#[case(FlowDirection::LeftRight)]
#[case(FlowDirection::RightLeft)]
fn layout_is_deterministic(#[case] direction: FlowDirection) {
    let build = || {
        DiagramView::new(
            DecisionTree::builtin().expect("tree"),
            direction,
            &LayoutConfig::default(),
        )
        .expect("layout")
    };
    let (a, b) = (build(), build());
    assert_eq!(a.tree(), b.tree());
    assert_eq!(a.layout(), b.layout());
}
