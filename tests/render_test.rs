use quick_xml::events::Event;
use quick_xml::reader::Reader;
use rstest::{fixture, rstest};
use valuation_tree::config::RenderConfig;
use valuation_tree::fonts::ApproxMeasure;
use valuation_tree::render::{RenderedSvg, render_panel_only, render_view};
use valuation_tree::theme::Theme;
use valuation_tree::tree::{DecisionTree, FlowDirection};
use valuation_tree::view::DiagramView;

fn view_for(config: &RenderConfig) -> DiagramView {
    DiagramView::new(
        DecisionTree::builtin().expect("tree"),
        config.direction,
        &config.layout(),
    )
    .expect("layout")
}

#[fixture]
fn config() -> RenderConfig {
    RenderConfig::default()
}

/// Parse the whole document; panics on the first XML error.
fn assert_well_formed(svg: &str) -> usize {
    let mut reader = Reader::from_str(svg);
    let mut elements = 0;
    let mut depth = 0i32;
    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => {
                elements += 1;
                depth += 1;
            }
            Ok(Event::End(_)) => depth -= 1,
            Ok(Event::Empty(_)) => elements += 1,
            Ok(Event::Eof) => break,
            Err(e) => panic!("malformed SVG at {}: {}", reader.buffer_position(), e),
            _ => {}
        }
    }
    assert_eq!(depth, 0, "unbalanced elements");
    elements
}

fn render(view: &DiagramView, config: &RenderConfig, highlight: bool) -> RenderedSvg {
    render_view(view, &Theme::default(), config, highlight, &mut ApproxMeasure)
}

#[rstest]
#[case(FlowDirection::TopDown)]
#[case(FlowDirection::BottomUp)]
#[case(FlowDirection::LeftRight)]
#[case(FlowDirection::RightLeft)]
fn every_direction_renders_well_formed(#[case] direction: FlowDirection) {
    let config = RenderConfig {
        direction,
        ..RenderConfig::default()
    };
    let rendered = render(&view_for(&config), &config, false);
    assert!(assert_well_formed(&rendered.svg) > 20);
    assert!(rendered.width > 0.0 && rendered.height > 0.0);
}

#[rstest]
fn labels_and_edge_answers_are_drawn(config: RenderConfig) {
    let view = view_for(&config);
    let svg = render(&view, &config, false).svg;
    for node in &view.tree().nodes {
        for word in node.label.split_whitespace() {
            assert!(svg.contains(word), "missing label word {:?}", word);
        }
        assert!(svg.contains(&format!(r#"data-id="{}""#, node.id)));
    }
    assert_eq!(svg.matches(r#"class="edge animated""#).count(), 1);
    assert!(svg.contains(">Yes</text>"));
    assert!(svg.contains(">No</text>"));
}

#[rstest]
fn no_panel_without_selection(config: RenderConfig) {
    let svg = render(&view_for(&config), &config, false).svg;
    assert!(!svg.contains("detail-panel"));
    assert!(!svg.contains("selected"));
}

#[rstest]
fn selection_adds_panel_and_highlight(config: RenderConfig) {
    let mut view = view_for(&config);
    let plain = render(&view, &config, false);
    view.click(Some("dcf"));
    let selected = render(&view, &config, false);

    assert_well_formed(&selected.svg);
    assert!(selected.svg.contains(r#"class="node node-model selected" data-id="dcf""#));
    assert!(selected.svg.contains("detail-panel"));
    assert!(selected.svg.contains("Discount all CF to today"));
    assert!(selected.width > plain.width + config.panel_width);
}

#[rstest]
fn highlighted_path_uses_accent_marker(config: RenderConfig) {
    let mut view = view_for(&config);
    view.click(Some("residual"));
    let svg = render(&view, &config, true).svg;
    assert_well_formed(&svg);
    // e0, e1 and e3 lead to residual
    assert_eq!(svg.matches("url(#arrow-highlight)").count(), 3);

    let unhighlighted = render(&view, &config, false).svg;
    assert_eq!(unhighlighted.matches("url(#arrow-highlight)").count(), 0);
}

#[rstest]
fn minimap_and_grid_follow_config() {
    let config = RenderConfig {
        minimap: true,
        background_grid: false,
        ..RenderConfig::default()
    };
    let with_minimap = render(&view_for(&config), &config, false);
    assert!(with_minimap.svg.contains(r#"class="minimap""#));
    assert!(!with_minimap.svg.contains("url(#dots)"));

    let plain = render(&view_for(&RenderConfig::default()), &RenderConfig::default(), false);
    assert!(plain.svg.contains("url(#dots)"));
    assert!(with_minimap.height > plain.height);
}

#[rstest]
#[case("github_dark")]
#[case("github_light")]
#[case("solarized_light")]
#[case("slate")]
fn builtin_themes_render(config: RenderConfig, #[case] theme: &str) {
    let theme = Theme::from_builtin(theme).expect("theme");
    let mut view = view_for(&config);
    view.click(Some("option"));
    let rendered = render_view(&view, &theme, &config, true, &mut ApproxMeasure);
    assert_well_formed(&rendered.svg);
    assert!(rendered.svg.contains(&theme.background_color));
}

#[rstest]
fn panel_only_document(config: RenderConfig) {
    let mut view = view_for(&config);
    view.click(Some("liquidation"));
    let panel = view.detail_panel().expect("panel").clone();
    let rendered = render_panel_only(&panel, &Theme::default(), &config, &mut ApproxMeasure);
    assert_well_formed(&rendered.svg);
    assert_eq!(rendered.width, config.panel_width + config.padding * 2.0);
    assert!(rendered.svg.contains("Liquidation Value"));
}
