use crate::tree::{Category, Node, NodeKind};

use super::escape_xml;

/// Small line-art glyph drawn beside node labels and panel titles. Paths are
/// on a 24-unit grid and stroked, not filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    Question,
    Income,
    Market,
    Asset,
    Option,
}

impl From<Category> for Glyph {
    fn from(category: Category) -> Self {
        match category {
            Category::Income => Glyph::Income,
            Category::Market => Glyph::Market,
            Category::Asset => Glyph::Asset,
            Category::Option => Glyph::Option,
        }
    }
}

impl Glyph {
    /// Start nodes carry no glyph.
    pub fn for_node(node: &Node) -> Option<Glyph> {
        match &node.kind {
            NodeKind::Start => None,
            NodeKind::Question => Some(Glyph::Question),
            NodeKind::Model(info) => Some(info.category.into()),
        }
    }

    fn body(&self) -> &'static str {
        match self {
            // circled question mark
            Glyph::Question => concat!(
                r#"<circle cx="12" cy="12" r="10"/>"#,
                r#"<path d="M9.09 9a3 3 0 0 1 5.83 1c0 2-3 3-3 3"/>"#,
                r#"<path d="M12 17h.01"/>"#
            ),
            // columned building under a pediment
            Glyph::Income => concat!(
                r#"<path d="M3 22h18"/>"#,
                r#"<path d="M6 18v-7"/><path d="M10 18v-7"/><path d="M14 18v-7"/><path d="M18 18v-7"/>"#,
                r#"<path d="M12 2l8 5H4z"/>"#
            ),
            // stacked crates
            Glyph::Market => concat!(
                r#"<rect x="2" y="13" width="9" height="8" rx="1"/>"#,
                r#"<rect x="13" y="13" width="9" height="8" rx="1"/>"#,
                r#"<rect x="7.5" y="3" width="9" height="8" rx="1"/>"#
            ),
            Glyph::Asset => concat!(
                r#"<path d="M6 22V4a2 2 0 0 1 2-2h8a2 2 0 0 1 2 2v18z"/>"#,
                r#"<path d="M6 12H4a2 2 0 0 0-2 2v6a2 2 0 0 0 2 2h2"/>"#,
                r#"<path d="M18 9h2a2 2 0 0 1 2 2v9a2 2 0 0 1-2 2h-2"/>"#,
                r#"<path d="M10 6h4"/><path d="M10 10h4"/><path d="M10 14h4"/><path d="M10 18h4"/>"#
            ),
            // rising trend line
            Glyph::Option => concat!(
                r#"<polyline points="22 7 13.5 15.5 8.5 10.5 2 17"/>"#,
                r#"<polyline points="16 7 22 7 22 13"/>"#
            ),
        }
    }

    /// Glyph scaled to `size` with its top-left corner at (`x`, `y`).
    pub fn svg(&self, x: f32, y: f32, size: f32, color: &str) -> String {
        format!(
            r#"<g class="glyph" transform="translate({:.2},{:.2}) scale({:.4})" fill="none" stroke="{}" stroke-width="2" stroke-linecap="round" stroke-linejoin="round">{}</g>"#,
            x,
            y,
            size / 24.0,
            escape_xml(color),
            self.body()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::valuation_tree;

    #[test]
    fn glyph_follows_node_kind() {
        let tree = valuation_tree();
        let glyph = |id: &str| tree.node(id).and_then(Glyph::for_node);
        assert_eq!(glyph("start"), None);
        assert_eq!(glyph("q2"), Some(Glyph::Question));
        assert_eq!(glyph("dcf"), Some(Glyph::Income));
        assert_eq!(glyph("market"), Some(Glyph::Market));
        assert_eq!(glyph("option"), Some(Glyph::Option));
    }

    #[test]
    fn glyph_is_scaled_to_size() {
        let svg = Glyph::Asset.svg(4.0, 8.0, 12.0, "#b45309");
        assert!(svg.contains("translate(4.00,8.00) scale(0.5000)"));
        assert!(svg.contains(r##"stroke="#b45309""##));
    }
}
