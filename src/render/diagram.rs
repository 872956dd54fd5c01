use tracing::trace;

use crate::config::RenderConfig;
use crate::fonts::{TextMeasure, TextStyle};
use crate::layout::{BBox, Layout};
use crate::tree::{Branch, Connected, Edge, FlowDirection, Node};
use crate::view::DiagramView;

use super::icons::Glyph;
use super::{DiagramStyle, Fragment, escape_xml, palette_for, wrap_text};

const NODE_PADDING: f32 = 12.0;
const GLYPH_SIZE: f32 = 20.0;
const GLYPH_GAP: f32 = 12.0;
const CORNER_RADIUS: f32 = 8.0;
const EDGE_RADIUS: f32 = 5.0;
const MINIMAP_WIDTH: f32 = 200.0;
const MINIMAP_HEIGHT: f32 = 150.0;
const MINIMAP_GAP: f32 = 16.0;

type Point = (f32, f32);

/// Edges first so nodes sit on top of them, then the optional minimap below
/// the diagram.
pub(crate) fn render_diagram<T: TextMeasure>(
    view: &DiagramView,
    style: &DiagramStyle,
    config: &RenderConfig,
    highlight: &Connected,
    measure: &mut T,
) -> Fragment {
    let tree = view.tree();
    let layout = view.layout();
    let mut svg = String::new();

    for edge in &tree.edges {
        let (Some(source), Some(target)) = (tree.node(&edge.source), tree.node(&edge.target))
        else {
            continue;
        };
        svg.push_str(&render_edge(
            edge,
            layout.node_box(source.position),
            layout.node_box(target.position),
            layout,
            style,
            highlight.contains_edge(&edge.id),
            measure,
        ));
    }

    for node in &tree.nodes {
        svg.push_str(&render_node(
            node,
            layout.node_box(node.position),
            style,
            highlight.contains_node(&node.id),
            measure,
        ));
    }

    let mut width = layout.bounds.right();
    let mut height = layout.bounds.bottom();
    if config.minimap && !tree.nodes.is_empty() {
        let origin = (
            (width - MINIMAP_WIDTH).max(0.0),
            height + MINIMAP_GAP,
        );
        svg.push_str(&render_minimap(tree.nodes.as_slice(), layout, origin, style));
        width = width.max(MINIMAP_WIDTH);
        height += MINIMAP_GAP + MINIMAP_HEIGHT;
    }

    Fragment {
        body: svg,
        width,
        height,
    }
}

fn render_node<T: TextMeasure>(
    node: &Node,
    b: BBox,
    style: &DiagramStyle,
    highlighted: bool,
    measure: &mut T,
) -> String {
    let palette = palette_for(node);
    let (stroke, stroke_width) = if node.selected || highlighted {
        (style.accent.as_str(), 2.0)
    } else if node.is_start() {
        (palette.border, 1.0)
    } else {
        (palette.border, 2.0)
    };
    let rx = if node.is_start() {
        b.height / 2.0
    } else {
        CORNER_RADIUS
    };
    let filter = if node.selected { "shadow-lg" } else { "shadow" };
    let kind = if node.is_start() {
        "start"
    } else if node.is_question() {
        "question"
    } else {
        "model"
    };

    let mut svg = format!(
        r#"<g class="node node-{}{}" data-id="{}">"#,
        kind,
        if node.selected { " selected" } else { "" },
        escape_xml(&node.id)
    );
    svg.push_str(&format!(
        r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="{:.2}" fill="{}" stroke="{}" stroke-width="{:.1}" filter="url(#{})"/>"#,
        b.x, b.y, b.width, b.height, rx, palette.fill, escape_xml(stroke), stroke_width, filter
    ));

    let (_, cy) = b.center();
    let glyph = Glyph::for_node(node);
    let (text_x, anchor, max_width) = match glyph {
        Some(glyph) => {
            svg.push_str(&glyph.svg(
                b.x + NODE_PADDING,
                cy - GLYPH_SIZE / 2.0,
                GLYPH_SIZE,
                palette.icon,
            ));
            let x = b.x + NODE_PADDING + GLYPH_SIZE + GLYPH_GAP;
            (x, "start", b.right() - NODE_PADDING - x)
        }
        None => (b.center().0, "middle", b.width - NODE_PADDING * 2.0),
    };

    let size = style.label_size;
    let lines = wrap_text(&node.label, max_width, size, TextStyle::PLAIN, measure);
    let line_height = size * 1.25;
    let first_baseline =
        cy - line_height * lines.len() as f32 / 2.0 + line_height / 2.0 + size * 0.35;
    for (i, line) in lines.iter().enumerate() {
        svg.push_str(&format!(
            r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="{:.1}" font-weight="500" fill="{}" text-anchor="{}">{}</text>"#,
            text_x,
            first_baseline + i as f32 * line_height,
            style.font_family,
            size,
            escape_xml(&style.node_text),
            anchor,
            escape_xml(line)
        ));
    }
    svg.push_str("</g>");
    svg
}

/// Where an edge leaves its source and enters its target, given the flow.
fn ports(source: BBox, target: BBox, direction: FlowDirection) -> (Point, Point) {
    let (scx, scy) = source.center();
    let (tcx, tcy) = target.center();
    match direction {
        FlowDirection::TopDown => ((scx, source.bottom()), (tcx, target.y)),
        FlowDirection::BottomUp => ((scx, source.y), (tcx, target.bottom())),
        FlowDirection::LeftRight => ((source.right(), scy), (target.x, tcy)),
        FlowDirection::RightLeft => ((source.x, scy), (target.right(), tcy)),
    }
}

#[allow(clippy::too_many_arguments)]
fn render_edge<T: TextMeasure>(
    edge: &Edge,
    source: BBox,
    target: BBox,
    layout: &Layout,
    style: &DiagramStyle,
    highlighted: bool,
    measure: &mut T,
) -> String {
    let (start, end) = ports(source, target, layout.direction);
    let mut points = vec![start];
    if let Some(via) = layout.waypoints.get(&edge.id) {
        points.extend(via.iter().copied());
    }
    points.push(end);

    let route = orthogonal_route(&points, layout.direction.is_vertical());
    trace!(edge = %edge.id, corners = route.len(), "routed edge");

    let (stroke, marker) = if highlighted {
        (style.accent.as_str(), "arrow-highlight")
    } else {
        (style.edge_stroke.as_str(), "arrow")
    };
    let stroke_width = if edge.animated || highlighted { 2.0 } else { 1.0 };

    let mut svg = format!(
        r#"<path id="edge-{}" class="edge{}" d="{}" fill="none" stroke="{}" stroke-width="{:.1}" marker-end="url(#{})""#,
        escape_xml(&edge.id),
        if edge.animated { " animated" } else { "" },
        rounded_path(&route, EDGE_RADIUS),
        escape_xml(stroke),
        stroke_width,
        marker
    );
    if edge.animated {
        svg.push_str(r#" stroke-dasharray="5"><animate attributeName="stroke-dashoffset" from="10" to="0" dur="0.5s" repeatCount="indefinite"/></path>"#);
    } else {
        svg.push_str("/>");
    }

    if edge.label != Branch::Unlabeled {
        let text = edge.label.as_str();
        let size = style.edge_label_size;
        let (w, _) = measure.measure_text(text, size, TextStyle::PLAIN);
        let (lx, ly) = point_along(&route, 0.5);
        let pill_w = w + 8.0;
        let pill_h = size + 4.0;
        svg.push_str(&format!(
            r#"<rect class="edge-label" x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="2" fill="{}"/>"#,
            lx - pill_w / 2.0,
            ly - pill_h / 2.0,
            pill_w,
            pill_h,
            escape_xml(&style.edge_label_bg)
        ));
        svg.push_str(&format!(
            r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="{:.1}" fill="{}" text-anchor="middle">{}</text>"#,
            lx,
            ly + size * 0.35,
            style.font_family,
            size,
            escape_xml(&style.edge_label_text),
            text
        ));
    }

    svg
}

fn close(a: Point, b: Point) -> bool {
    (a.0 - b.0).abs() < 0.01 && (a.1 - b.1).abs() < 0.01
}

/// Turn a chain of points into axis-aligned segments: each hop runs along
/// the flow to the midpoint, across, then along the flow again.
fn orthogonal_route(points: &[Point], vertical: bool) -> Vec<Point> {
    let Some(&first) = points.first() else {
        return Vec::new();
    };
    let mut route = vec![first];
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if vertical {
            let mid = (a.1 + b.1) / 2.0;
            route.push((a.0, mid));
            route.push((b.0, mid));
        } else {
            let mid = (a.0 + b.0) / 2.0;
            route.push((mid, a.1));
            route.push((mid, b.1));
        }
        route.push(b);
    }
    route.dedup_by(|a, b| close(*a, *b));

    let mut out: Vec<Point> = Vec::with_capacity(route.len());
    for p in route {
        if let [.., a, b] = out.as_slice() {
            let same_x = (a.0 - b.0).abs() < 0.01 && (b.0 - p.0).abs() < 0.01;
            let same_y = (a.1 - b.1).abs() < 0.01 && (b.1 - p.1).abs() < 0.01;
            if same_x || same_y {
                out.pop();
            }
        }
        out.push(p);
    }
    out
}

fn distance(a: Point, b: Point) -> f32 {
    ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt()
}

fn toward(from: Point, to: Point, dist: f32) -> Point {
    let len = distance(from, to);
    if len <= f32::EPSILON {
        return from;
    }
    let t = dist / len;
    (from.0 + (to.0 - from.0) * t, from.1 + (to.1 - from.1) * t)
}

/// SVG path through `route` with each corner rounded by up to `radius`.
fn rounded_path(route: &[Point], radius: f32) -> String {
    let mut d = String::new();
    for (i, &p) in route.iter().enumerate() {
        if i == 0 {
            d.push_str(&format!("M{:.2},{:.2}", p.0, p.1));
            continue;
        }
        let (prev, next) = match route.get(i + 1) {
            Some(&next) => (route[i - 1], next),
            None => {
                d.push_str(&format!(" L{:.2},{:.2}", p.0, p.1));
                continue;
            }
        };
        let r = radius
            .min(distance(prev, p) / 2.0)
            .min(distance(p, next) / 2.0);
        let before = toward(p, prev, r);
        let after = toward(p, next, r);
        d.push_str(&format!(
            " L{:.2},{:.2} Q{:.2},{:.2} {:.2},{:.2}",
            before.0, before.1, p.0, p.1, after.0, after.1
        ));
    }
    d
}

/// Point at fraction `t` of the route's total length.
fn point_along(route: &[Point], t: f32) -> Point {
    let total: f32 = route.windows(2).map(|w| distance(w[0], w[1])).sum();
    let mut remaining = total * t.clamp(0.0, 1.0);
    for w in route.windows(2) {
        let seg = distance(w[0], w[1]);
        if remaining <= seg {
            return toward(w[0], w[1], remaining);
        }
        remaining -= seg;
    }
    route.last().copied().unwrap_or_default()
}

fn render_minimap(nodes: &[Node], layout: &Layout, origin: Point, style: &DiagramStyle) -> String {
    let bounds = layout.bounds;
    let scale =
        (MINIMAP_WIDTH / bounds.width.max(1.0)).min(MINIMAP_HEIGHT / bounds.height.max(1.0));
    let offset_x = origin.0 + (MINIMAP_WIDTH - bounds.width * scale) / 2.0;
    let offset_y = origin.1 + (MINIMAP_HEIGHT - bounds.height * scale) / 2.0;

    let mut svg = format!(
        r#"<g class="minimap"><rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" stroke="{}" stroke-width="1"/>"#,
        origin.0,
        origin.1,
        MINIMAP_WIDTH,
        MINIMAP_HEIGHT,
        escape_xml(&style.panel_bg),
        escape_xml(&style.panel_border)
    );
    for node in nodes {
        let b = layout.node_box(node.position);
        let palette = palette_for(node);
        svg.push_str(&format!(
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="2" fill="{}" stroke="{}" stroke-width="{:.2}"/>"#,
            offset_x + b.x * scale,
            offset_y + b.y * scale,
            b.width * scale,
            b.height * scale,
            palette.fill,
            if node.selected { style.accent.as_str() } else { palette.border },
            3.0 * scale
        ));
    }
    svg.push_str("</g>");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertical_hop_bends_at_midpoint() {
        let route = orthogonal_route(&[(0.0, 0.0), (100.0, 100.0)], true);
        assert_eq!(
            route,
            vec![(0.0, 0.0), (0.0, 50.0), (100.0, 50.0), (100.0, 100.0)]
        );
    }

    #[test]
    fn straight_hop_has_no_corners() {
        let route = orthogonal_route(&[(10.0, 0.0), (10.0, 40.0), (10.0, 80.0)], true);
        assert_eq!(route, vec![(10.0, 0.0), (10.0, 80.0)]);
        assert_eq!(rounded_path(&route, 5.0), "M10.00,0.00 L10.00,80.00");
    }

    #[test]
    fn corners_are_rounded() {
        let route = orthogonal_route(&[(0.0, 0.0), (50.0, 0.0)], false);
        assert_eq!(route.len(), 2);
        let bent = orthogonal_route(&[(0.0, 0.0), (100.0, 60.0)], false);
        let d = rounded_path(&bent, 5.0);
        assert_eq!(d.matches('Q').count(), 2);
    }

    #[test]
    fn label_sits_halfway() {
        let route = vec![(0.0, 0.0), (0.0, 10.0), (10.0, 10.0)];
        assert_eq!(point_along(&route, 0.5), (0.0, 10.0));
        assert_eq!(point_along(&route, 1.0), (10.0, 10.0));
    }

    #[test]
    fn ports_follow_direction() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(0.0, 50.0, 10.0, 10.0);
        assert_eq!(ports(a, b, FlowDirection::TopDown), ((5.0, 10.0), (5.0, 50.0)));
        assert_eq!(ports(b, a, FlowDirection::BottomUp), ((5.0, 50.0), (5.0, 10.0)));
    }
}
