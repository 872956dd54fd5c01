use tracing::warn;

use crate::fonts::{TextMeasure, TextStyle};
use crate::math::render_math;
use crate::view::DetailPanel;

use super::icons::Glyph;
use super::{DiagramStyle, Fragment, escape_xml, wrap_text};

const CARD_PADDING: f32 = 24.0;
const GLYPH_SIZE: f32 = 20.0;
const GLYPH_GAP: f32 = 12.0;
const SECTION_GAP: f32 = 12.0;
const BODY_LINE_HEIGHT: f32 = 20.0;

/// Card with the model's title, its formula in display style and the
/// description text. Height grows with the content; width is fixed.
pub(crate) fn render_panel<T: TextMeasure>(
    panel: &DetailPanel,
    style: &DiagramStyle,
    width: f32,
    measure: &mut T,
) -> Fragment {
    let content_width = (width - CARD_PADDING * 2.0).max(1.0);
    let mut body = String::new();
    let mut y = CARD_PADDING;

    // Title row
    let glyph = Glyph::from(panel.category);
    let title_x = CARD_PADDING + GLYPH_SIZE + GLYPH_GAP;
    let title_size = style.title_size;
    let title_lines = wrap_text(
        &panel.label,
        content_width - GLYPH_SIZE - GLYPH_GAP,
        title_size,
        TextStyle::bold(),
        measure,
    );
    let title_line_height = title_size * 1.3;
    let title_height = (title_lines.len() as f32 * title_line_height).max(GLYPH_SIZE);
    body.push_str(&glyph.svg(
        CARD_PADDING,
        y + (title_line_height - GLYPH_SIZE) / 2.0,
        GLYPH_SIZE,
        super::palette_for_category(panel.category).icon,
    ));
    for (i, line) in title_lines.iter().enumerate() {
        body.push_str(&format!(
            r#"<text class="panel-title" x="{:.2}" y="{:.2}" font-family="{}" font-size="{:.1}" font-weight="600" fill="{}">{}</text>"#,
            title_x,
            y + i as f32 * title_line_height + title_line_height / 2.0 + title_size * 0.35,
            style.font_family,
            title_size,
            escape_xml(&style.panel_title),
            escape_xml(line)
        ));
    }
    y += title_height + CARD_PADDING;

    // Formula, centred and shrunk to fit when wider than the card
    let formula_size = style.formula_size;
    match render_math(&panel.formula, formula_size, &style.panel_text, measure, true) {
        Ok(math) => {
            let scale = if math.width > content_width {
                content_width / math.width
            } else {
                1.0
            };
            let x = CARD_PADDING + (content_width - math.width * scale) / 2.0;
            let baseline = y + math.ascent * scale;
            body.push_str(&format!(
                r#"<g class="formula" transform="translate({:.2},{:.2}) scale({:.4})">{}</g>"#,
                x, baseline, scale, math.svg_fragment
            ));
            y += math.height() * scale;
        }
        Err(err) => {
            warn!(node = %panel.node_id, %err, "formula did not typeset, showing source");
            let size = style.body_size;
            let lines = wrap_text(&panel.formula, content_width, size, TextStyle::PLAIN, measure);
            for line in &lines {
                y += BODY_LINE_HEIGHT;
                body.push_str(&format!(
                    r#"<text class="formula-source" x="{:.2}" y="{:.2}" font-family="monospace" font-size="{:.1}" fill="{}">{}</text>"#,
                    CARD_PADDING,
                    y - BODY_LINE_HEIGHT * 0.3,
                    size,
                    escape_xml(&style.panel_text),
                    escape_xml(line)
                ));
            }
        }
    }
    y += SECTION_GAP;

    // Description, one text element per wrapped line
    let size = style.body_size;
    for line in wrap_text(&panel.description, content_width, size, TextStyle::PLAIN, measure) {
        y += BODY_LINE_HEIGHT;
        if line.is_empty() {
            continue;
        }
        body.push_str(&format!(
            r#"<text class="description" x="{:.2}" y="{:.2}" font-family="{}" font-size="{:.1}" fill="{}" xml:space="preserve">{}</text>"#,
            CARD_PADDING,
            y - BODY_LINE_HEIGHT * 0.3,
            style.font_family,
            size,
            escape_xml(&style.panel_text),
            escape_xml(&line)
        ));
    }
    let height = y + CARD_PADDING;

    let card = format!(
        r#"<rect x="0" y="0" width="{:.2}" height="{:.2}" rx="12" fill="{}" fill-opacity="0.9" stroke="{}" stroke-width="1" filter="url(#shadow-lg)"/>"#,
        width,
        height,
        escape_xml(&style.panel_bg),
        escape_xml(&style.panel_border)
    );

    Fragment {
        body: card + &body,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::ApproxMeasure;
    use crate::tree::Category;

    fn panel(formula: &str) -> DetailPanel {
        DetailPanel {
            node_id: "dcf".to_string(),
            category: Category::Income,
            label: "Discounted Cash‑Flow".to_string(),
            formula: formula.to_string(),
            description: "• one\n\nHow to use:\n\n• two".to_string(),
        }
    }

    #[test]
    fn panel_keeps_fixed_width_and_lists_description() {
        let style = DiagramStyle::default();
        let fragment = render_panel(
            &panel(r"V = \frac{CF_1}{k-g}"),
            &style,
            448.0,
            &mut ApproxMeasure,
        );
        assert_eq!(fragment.width, 448.0);
        assert!(fragment.body.contains("How to use:"));
        assert!(fragment.body.contains(r#"class="formula""#));
        assert!(fragment.height > 100.0);
    }

    #[test]
    fn wide_formula_is_scaled_down() {
        let style = DiagramStyle::default();
        let long = r"V = x + x + x + x + x + x + x + x + x + x + x + x + x + x + x + x + x + x";
        let fragment = render_panel(&panel(long), &style, 200.0, &mut ApproxMeasure);
        assert!(!fragment.body.contains("scale(1.0000)"));
    }
}
