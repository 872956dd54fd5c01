//! SVG output for a [`DiagramView`]: the diagram itself and, when a model
//! is selected, the detail panel beside it.

mod diagram;
mod icons;
mod panel;

use tracing::{debug, instrument};

use crate::config::RenderConfig;
use crate::fonts::{TextMeasure, TextStyle};
use crate::theme::Theme;
use crate::tree::{Category, Connected, Node, NodeKind};
use crate::view::{DetailPanel, DiagramView};

pub use icons::Glyph;

const SLATE_700: &str = "#334155";
const SLATE_800: &str = "#1e293b";

/// Fill, border and glyph colour of one kind of node box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub fill: &'static str,
    pub border: &'static str,
    pub icon: &'static str,
}

const START: Palette = Palette {
    fill: "#ffffff",
    border: "#1a192b",
    icon: "#1a192b",
};
const QUESTION: Palette = Palette {
    fill: "#f8fafc",
    border: "#e2e8f0",
    icon: "#6b7280",
};
const INCOME: Palette = Palette {
    fill: "#f0f9ff",
    border: "#bae6fd",
    icon: "#0369a1",
};
const MARKET: Palette = Palette {
    fill: "#ecfdf5",
    border: "#a7f3d0",
    icon: "#047857",
};
const ASSET: Palette = Palette {
    fill: "#fffbeb",
    border: "#fde68a",
    icon: "#b45309",
};
const OPTION: Palette = Palette {
    fill: "#faf5ff",
    border: "#e9d5ff",
    icon: "#7e22ce",
};

pub fn palette_for_category(category: Category) -> Palette {
    match category {
        Category::Income => INCOME,
        Category::Market => MARKET,
        Category::Asset => ASSET,
        Category::Option => OPTION,
    }
}

pub fn palette_for(node: &Node) -> Palette {
    match &node.kind {
        NodeKind::Start => START,
        NodeKind::Question => QUESTION,
        NodeKind::Model(info) => palette_for_category(info.category),
    }
}

/// Colours and sizes used while drawing, resolved once from the theme
#[derive(Debug, Clone)]
pub struct DiagramStyle {
    pub background: String,
    pub grid: String,
    pub node_text: String,
    pub edge_stroke: String,
    pub edge_label_bg: String,
    pub edge_label_text: String,
    pub accent: String,
    pub panel_bg: String,
    pub panel_border: String,
    pub panel_title: String,
    pub panel_text: String,
    pub font_family: String,
    pub label_size: f32,
    pub edge_label_size: f32,
    pub title_size: f32,
    pub formula_size: f32,
    pub body_size: f32,
    pub line_height: f32,
}

impl Default for DiagramStyle {
    fn default() -> Self {
        Self::from_theme(&Theme::default(), &RenderConfig::default())
    }
}

impl DiagramStyle {
    pub fn from_theme(theme: &Theme, config: &RenderConfig) -> Self {
        // Node boxes keep their light category fills under every theme, so
        // their text is picked against the fill rather than the background.
        let node_text = pick_higher_contrast(QUESTION.fill, &theme.text_color, SLATE_800);
        let edge_label_text =
            pick_higher_contrast(&theme.background_color, &theme.text_color, &theme.edge_color);
        let panel_title = pick_higher_contrast(&theme.panel_bg_color, &theme.text_color, SLATE_800);
        let panel_text = pick_higher_contrast(&theme.panel_bg_color, &theme.text_color, SLATE_700);

        Self {
            background: theme.background_color.clone(),
            grid: theme.grid_color.clone(),
            node_text,
            edge_stroke: theme.edge_color.clone(),
            edge_label_bg: theme.background_color.clone(),
            edge_label_text,
            accent: theme.accent_color.clone(),
            panel_bg: theme.panel_bg_color.clone(),
            panel_border: theme.panel_border_color.clone(),
            panel_title,
            panel_text,
            font_family: "sans-serif".to_string(),
            label_size: config.font_size.unwrap_or(theme.font_size_label),
            edge_label_size: theme.font_size_edge_label,
            title_size: theme.font_size_title,
            formula_size: theme.font_size_formula,
            body_size: theme.font_size_body,
            line_height: theme.line_height,
        }
    }
}

fn parse_hex_rgb(value: &str) -> Option<(f32, f32, f32)> {
    let hex = value.trim().trim_start_matches('#');
    let hex = match hex.len() {
        6 => hex.to_string(),
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        _ => return None,
    };

    let channel = |range: std::ops::Range<usize>| -> Option<f32> {
        Some(u8::from_str_radix(hex.get(range)?, 16).ok()? as f32 / 255.0)
    };
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

fn relative_luminance(color: (f32, f32, f32)) -> f32 {
    let linear = |v: f32| {
        if v <= 0.03928 {
            v / 12.92
        } else {
            ((v + 0.055) / 1.055).powf(2.4)
        }
    };

    let (r, g, b) = color;
    0.2126 * linear(r) + 0.7152 * linear(g) + 0.0722 * linear(b)
}

fn contrast_ratio(a: &str, b: &str) -> Option<f32> {
    let l1 = relative_luminance(parse_hex_rgb(a)?);
    let l2 = relative_luminance(parse_hex_rgb(b)?);
    let (hi, lo) = if l1 >= l2 { (l1, l2) } else { (l2, l1) };
    Some((hi + 0.05) / (lo + 0.05))
}

fn pick_higher_contrast(base: &str, primary: &str, secondary: &str) -> String {
    let p = contrast_ratio(base, primary).unwrap_or(0.0);
    let s = contrast_ratio(base, secondary).unwrap_or(0.0);

    if s > p {
        secondary.to_string()
    } else {
        primary.to_string()
    }
}

/// XML 1.0 valid char ranges:
/// - 0x09, 0x0A, 0x0D
/// - 0x20..=0xD7FF
/// - 0xE000..=0xFFFD
/// - 0x10000..=0x10FFFF
fn is_valid_xml_char(c: char) -> bool {
    matches!(
        c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF
    )
}

/// Escape text for use in SVG content or attribute values, dropping
/// characters XML cannot carry.
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if !is_valid_xml_char(c) {
            continue;
        }
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Greedy word wrap of each `\n`-separated line to `max_width`. Blank lines
/// are kept; a single word wider than the limit gets a line to itself.
pub(crate) fn wrap_text<T: TextMeasure>(
    text: &str,
    max_width: f32,
    font_size: f32,
    style: TextStyle,
    measure: &mut T,
) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in text.lines() {
        let raw = raw.trim_end();
        if raw.is_empty() {
            lines.push(String::new());
            continue;
        }
        let mut current = String::new();
        for word in raw.split(' ').filter(|w| !w.is_empty()) {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            let (w, _) = measure.measure_text(&candidate, font_size, style);
            if w > max_width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current = word.to_string();
            } else {
                current = candidate;
            }
        }
        lines.push(current);
    }
    lines
}

/// Body of an SVG element group plus the size it occupies from its origin
#[derive(Debug, Clone, Default)]
pub(crate) struct Fragment {
    pub body: String,
    pub width: f32,
    pub height: f32,
}

/// A complete standalone SVG document
#[derive(Debug, Clone)]
pub struct RenderedSvg {
    pub svg: String,
    pub width: f32,
    pub height: f32,
}

fn defs(style: &DiagramStyle) -> String {
    let marker = |id: &str, color: &str| {
        format!(
            r#"<marker id="{}" viewBox="-10 -10 20 20" markerWidth="12.5" markerHeight="12.5" refX="0" refY="0" orient="auto-start-reverse" markerUnits="strokeWidth"><polyline points="-5,-4 0,0 -5,4 -5,-4" fill="{}" stroke="{}" stroke-width="1" stroke-linecap="round" stroke-linejoin="round"/></marker>"#,
            id,
            escape_xml(color),
            escape_xml(color)
        )
    };
    format!(
        concat!(
            "<defs>{}{}",
            r##"<filter id="shadow" x="-20%" y="-20%" width="140%" height="160%"><feDropShadow dx="0" dy="2" stdDeviation="3" flood-color="#000000" flood-opacity="0.12"/></filter>"##,
            r##"<filter id="shadow-lg" x="-30%" y="-30%" width="160%" height="190%"><feDropShadow dx="0" dy="8" stdDeviation="8" flood-color="#000000" flood-opacity="0.2"/></filter>"##,
            r#"<pattern id="dots" width="16" height="16" patternUnits="userSpaceOnUse"><circle cx="0.5" cy="0.5" r="0.5" fill="{}"/></pattern>"#,
            "</defs>"
        ),
        marker("arrow", &style.edge_stroke),
        marker("arrow-highlight", &style.accent),
        escape_xml(&style.grid)
    )
}

fn document(
    style: &DiagramStyle,
    config: &RenderConfig,
    width: f32,
    height: f32,
    content: &str,
) -> String {
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.2} {h:.2}">"#,
        w = width,
        h = height
    );
    svg.push_str(&defs(style));
    svg.push_str(&format!(
        r#"<rect x="0" y="0" width="{:.2}" height="{:.2}" fill="{}"/>"#,
        width,
        height,
        escape_xml(&style.background)
    ));
    if config.background_grid {
        svg.push_str(&format!(
            r#"<rect x="0" y="0" width="{:.2}" height="{:.2}" fill="url(#dots)"/>"#,
            width, height
        ));
    }
    svg.push_str(content);
    svg.push_str("</svg>");
    svg
}

/// Render the diagram, with the detail panel to its right when a model
/// node is selected. `highlight_path` outlines the ancestors of the
/// selection.
#[instrument(level = "debug", skip_all, fields(selected = ?view.selected(), highlight_path = highlight_path))]
pub fn render_view<T: TextMeasure>(
    view: &DiagramView,
    theme: &Theme,
    config: &RenderConfig,
    highlight_path: bool,
    measure: &mut T,
) -> RenderedSvg {
    let style = DiagramStyle::from_theme(theme, config);
    let highlight = if highlight_path {
        view.ancestors_of_selection()
    } else {
        Connected::default()
    };

    let diagram = diagram::render_diagram(view, &style, config, &highlight, measure);
    let panel = view
        .detail_panel()
        .map(|p| panel::render_panel(p, &style, config.panel_width, measure));

    let pad = config.padding;
    let mut width = pad * 2.0 + diagram.width;
    let mut height = diagram.height;
    let mut content = format!(
        r#"<g class="diagram" transform="translate({:.2},{:.2})">{}</g>"#,
        pad, pad, diagram.body
    );
    if let Some(panel) = panel {
        let x = pad + diagram.width + config.panel_gap;
        content.push_str(&format!(
            r#"<g class="detail-panel" transform="translate({:.2},{:.2})">{}</g>"#,
            x, pad, panel.body
        ));
        width += config.panel_gap + panel.width;
        height = height.max(panel.height);
    }
    height += pad * 2.0;

    debug!(width, height, "rendered view");
    RenderedSvg {
        svg: document(&style, config, width, height, &content),
        width,
        height,
    }
}

/// Render just the detail panel for one model, as `inspect -o` does.
pub fn render_panel_only<T: TextMeasure>(
    panel: &DetailPanel,
    theme: &Theme,
    config: &RenderConfig,
    measure: &mut T,
) -> RenderedSvg {
    let style = DiagramStyle::from_theme(theme, config);
    let fragment = panel::render_panel(panel, &style, config.panel_width, measure);
    let pad = config.padding;
    let width = fragment.width + pad * 2.0;
    let height = fragment.height + pad * 2.0;
    let content = format!(
        r#"<g class="detail-panel" transform="translate({:.2},{:.2})">{}</g>"#,
        pad, pad, fragment.body
    );
    let config = RenderConfig {
        background_grid: false,
        ..config.clone()
    };
    RenderedSvg {
        svg: document(&style, &config, width, height, &content),
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::ApproxMeasure;

    #[test]
    fn escape_drops_invalid_controls_and_escapes_markup() {
        assert_eq!(escape_xml("A\u{0007}B"), "AB");
        assert_eq!(
            escape_xml(r#"<a b="x&y">'z'"#),
            "&lt;a b=&quot;x&amp;y&quot;&gt;&apos;z&apos;"
        );
        assert_eq!(escape_xml("a\tb\nc"), "a\tb\nc");
    }

    #[test]
    fn contrast_prefers_dark_text_on_light_fill() {
        assert_eq!(pick_higher_contrast("#f8fafc", "#e6edf3", SLATE_800), SLATE_800);
        assert_eq!(pick_higher_contrast("#0d1117", "#e6edf3", SLATE_800), "#e6edf3");
    }

    #[test]
    fn short_hex_colours_parse() {
        assert_eq!(parse_hex_rgb("#fff"), Some((1.0, 1.0, 1.0)));
        assert_eq!(parse_hex_rgb("#aaaaaa"), parse_hex_rgb("#aaa"));
        assert_eq!(parse_hex_rgb("blue"), None);
    }

    #[test]
    fn dark_theme_keeps_node_text_readable() {
        let theme = Theme::from_builtin("github_dark").expect("theme");
        let style = DiagramStyle::from_theme(&theme, &RenderConfig::default());
        assert_eq!(style.node_text, SLATE_800);
    }

    #[test]
    fn wrap_splits_long_lines_and_keeps_blank_ones() {
        let lines = wrap_text(
            "one two three four\n\nfive",
            60.0,
            10.0,
            TextStyle::PLAIN,
            &mut ApproxMeasure,
        );
        assert_eq!(lines, vec!["one two", "three four", "", "five"]);
    }

    #[test]
    fn config_font_size_overrides_theme() {
        let config = RenderConfig {
            font_size: Some(16.0),
            ..RenderConfig::default()
        };
        let style = DiagramStyle::from_theme(&Theme::default(), &config);
        assert_eq!(style.label_size, 16.0);
    }
}
