//! LaTeX typesetting into SVG. Formulas go through latex2mathml, the MathML
//! is read back with quick-xml into a small box tree, and the boxes are
//! positioned against a baseline.

use latex2mathml::{DisplayStyle, latex_to_mathml};
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event as XmlEvent;
use quick_xml::reader::Reader as XmlReader;
use tracing::trace;

use crate::error::{Result, TreeError};
use crate::fonts::{TextMeasure, TextStyle};
use crate::render::escape_xml;

const SCRIPT_SCALE: f32 = 0.7;
const LARGE_OP_SCALE: f32 = 1.4;
const ASCENT: f32 = 0.75;
const DESCENT: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Ident,
    Number,
    Operator,
    Text,
}

#[derive(Debug)]
enum MathNode {
    Row(Vec<MathNode>),
    Token {
        kind: TokenKind,
        text: String,
    },
    Scripts {
        base: Box<MathNode>,
        sub: Option<Box<MathNode>>,
        sup: Option<Box<MathNode>>,
    },
    /// Limits stacked above and below, as `\sum` gets in display style
    Limits {
        base: Box<MathNode>,
        under: Option<Box<MathNode>>,
        over: Option<Box<MathNode>>,
    },
    Frac {
        num: Box<MathNode>,
        den: Box<MathNode>,
    },
    Radical(Box<MathNode>),
    /// Horizontal space in em
    Space(f32),
}

/// A typeset formula. `svg_fragment` is positioned for the origin passed to
/// [`render_math_at`].
#[derive(Debug, Clone)]
pub struct MathResult {
    pub width: f32,
    pub ascent: f32,
    pub descent: f32,
    pub svg_fragment: String,
}

impl MathResult {
    pub fn height(&self) -> f32 {
        self.ascent + self.descent
    }
}

pub fn render_math<T: TextMeasure>(
    latex: &str,
    font_size: f32,
    color: &str,
    measure: &mut T,
    display: bool,
) -> Result<MathResult> {
    render_math_at(latex, font_size, color, measure, display, 0.0, 0.0)
}

#[allow(clippy::too_many_arguments)]
pub fn render_math_at<T: TextMeasure>(
    latex: &str,
    font_size: f32,
    color: &str,
    measure: &mut T,
    display: bool,
    x: f32,
    baseline_y: f32,
) -> Result<MathResult> {
    let style = if display {
        DisplayStyle::Block
    } else {
        DisplayStyle::Inline
    };
    let mathml = latex_to_mathml(latex, style)
        .map_err(|e| TreeError::Math(format!("{:?} in `{}`", e, latex)))?;
    trace!(%mathml, "converted formula");

    let root = parse_mathml(&mathml)?;
    let color = escape_xml(color);
    let mut typesetter = Typesetter {
        color: &color,
        measure,
    };
    let mbox = typesetter.layout(&root, font_size, x, baseline_y);

    Ok(MathResult {
        width: mbox.width,
        ascent: mbox.ascent,
        descent: mbox.descent,
        svg_fragment: mbox.svg,
    })
}

fn parse_mathml(mathml: &str) -> Result<MathNode> {
    let mut reader = XmlReader::from_str(mathml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<(String, Vec<MathNode>, Option<f32>)> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(XmlEvent::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let width = space_width(e);
                stack.push((name, Vec::new(), width));
            }
            Ok(XmlEvent::Text(ref e)) => {
                let text = e.decode().unwrap_or_default().to_string();
                if let Some((_, children, _)) = stack.last_mut()
                    && !text.is_empty()
                {
                    children.push(MathNode::Token {
                        kind: TokenKind::Text,
                        text,
                    });
                }
            }
            Ok(XmlEvent::GeneralRef(ref e)) => {
                // `&lt;` and `&#x2212;` arrive apart from the surrounding text
                let resolved = match e.resolve_char_ref() {
                    Ok(Some(c)) => Some(c.to_string()),
                    _ => e
                        .decode()
                        .ok()
                        .and_then(|name| resolve_predefined_entity(&name).map(str::to_string)),
                };
                if let (Some(text), Some((_, children, _))) = (resolved, stack.last_mut()) {
                    children.push(MathNode::Token {
                        kind: TokenKind::Text,
                        text,
                    });
                }
            }
            Ok(XmlEvent::End(_)) => {
                if let Some((tag, children, width)) = stack.pop() {
                    let node = build_node(&tag, children, width);
                    match stack.last_mut() {
                        Some((_, parent, _)) => parent.push(node),
                        None => return Ok(node),
                    }
                }
            }
            Ok(XmlEvent::Empty(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "mspace"
                    && let Some((_, parent, _)) = stack.last_mut()
                {
                    parent.push(MathNode::Space(space_width(e).unwrap_or(0.0)));
                }
            }
            Ok(XmlEvent::Eof) => break,
            Err(e) => return Err(TreeError::Math(format!("MathML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(MathNode::Row(Vec::new()))
}

/// `width="0.1667em"` on an element, in em.
fn space_width(e: &quick_xml::events::BytesStart) -> Option<f32> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == b"width")
        .and_then(|a| {
            String::from_utf8_lossy(&a.value)
                .strip_suffix("em")
                .and_then(|v| v.parse().ok())
        })
}

fn build_node(tag: &str, children: Vec<MathNode>, width: Option<f32>) -> MathNode {
    match tag {
        "mi" => token(TokenKind::Ident, &children),
        "mn" => token(TokenKind::Number, &children),
        "mo" => token(TokenKind::Operator, &children),
        "mtext" => token(TokenKind::Text, &children),
        "mspace" => MathNode::Space(width.unwrap_or(0.0)),
        "msub" => match <[MathNode; 2]>::try_from(children) {
            Ok([base, sub]) => scripts(base, Some(sub), None),
            Err(children) => row(children),
        },
        "msup" => match <[MathNode; 2]>::try_from(children) {
            Ok([base, sup]) => scripts(base, None, Some(sup)),
            Err(children) => row(children),
        },
        "msubsup" => match <[MathNode; 3]>::try_from(children) {
            Ok([base, sub, sup]) => scripts(base, Some(sub), Some(sup)),
            Err(children) => row(children),
        },
        "munder" => match <[MathNode; 2]>::try_from(children) {
            Ok([base, under]) => limits(base, Some(under), None),
            Err(children) => row(children),
        },
        "mover" => match <[MathNode; 2]>::try_from(children) {
            Ok([base, over]) => limits(base, None, Some(over)),
            Err(children) => row(children),
        },
        "munderover" => match <[MathNode; 3]>::try_from(children) {
            Ok([base, under, over]) => limits(base, Some(under), Some(over)),
            Err(children) => row(children),
        },
        "mfrac" => match <[MathNode; 2]>::try_from(children) {
            Ok([num, den]) => MathNode::Frac {
                num: Box::new(num),
                den: Box::new(den),
            },
            Err(children) => row(children),
        },
        "msqrt" => MathNode::Radical(Box::new(row(children))),
        _ => row(children),
    }
}

fn token(kind: TokenKind, children: &[MathNode]) -> MathNode {
    let text = children
        .iter()
        .filter_map(|c| match c {
            MathNode::Token { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    MathNode::Token { kind, text }
}

fn row(mut children: Vec<MathNode>) -> MathNode {
    if children.len() == 1
        && let Some(only) = children.pop()
    {
        return only;
    }
    MathNode::Row(children)
}

fn scripts(base: MathNode, sub: Option<MathNode>, sup: Option<MathNode>) -> MathNode {
    if is_large_operator_node(&base) {
        return limits(base, sub, sup);
    }
    MathNode::Scripts {
        base: Box::new(base),
        sub: sub.map(Box::new),
        sup: sup.map(Box::new),
    }
}

fn limits(base: MathNode, under: Option<MathNode>, over: Option<MathNode>) -> MathNode {
    MathNode::Limits {
        base: Box::new(base),
        under: under.map(Box::new),
        over: over.map(Box::new),
    }
}

fn is_large_operator(text: &str) -> bool {
    matches!(text, "∑" | "∏" | "∫" | "⋃" | "⋂")
}

fn is_large_operator_node(node: &MathNode) -> bool {
    matches!(node, MathNode::Token { kind: TokenKind::Operator, text } if is_large_operator(text))
}

/// Operators that get thick space on both sides
fn is_spaced_operator(text: &str) -> bool {
    matches!(
        text,
        "=" | "+" | "-" | "−" | "≈" | "×" | "·" | "<" | ">" | "≤" | "≥" | ":"
    )
}

struct MathBox {
    width: f32,
    ascent: f32,
    descent: f32,
    svg: String,
}

struct Typesetter<'a, T: TextMeasure> {
    color: &'a str,
    measure: &'a mut T,
}

impl<T: TextMeasure> Typesetter<'_, T> {
    fn layout(&mut self, node: &MathNode, size: f32, x: f32, baseline: f32) -> MathBox {
        match node {
            MathNode::Token { kind, text } => self.layout_token(*kind, text, size, x, baseline),
            MathNode::Space(em) => MathBox {
                width: size * em,
                ascent: 0.0,
                descent: 0.0,
                svg: String::new(),
            },
            MathNode::Row(children) => {
                let mut cursor = x;
                let mut ascent: f32 = size * ASCENT;
                let mut descent: f32 = size * DESCENT;
                let mut svg = String::new();
                for child in children {
                    let b = self.layout(child, size, cursor, baseline);
                    cursor += b.width;
                    ascent = ascent.max(b.ascent);
                    descent = descent.max(b.descent);
                    svg.push_str(&b.svg);
                }
                MathBox {
                    width: cursor - x,
                    ascent,
                    descent,
                    svg,
                }
            }
            MathNode::Scripts { base, sub, sup } => {
                let base_box = self.layout(base, size, x, baseline);
                let script_size = size * SCRIPT_SCALE;
                let script_x = x + base_box.width;
                let mut ascent = base_box.ascent;
                let mut descent = base_box.descent;
                let mut script_width: f32 = 0.0;
                let mut svg = base_box.svg;

                if let Some(sup) = sup {
                    let shift = base_box.ascent * 0.55;
                    let b = self.layout(sup, script_size, script_x, baseline - shift);
                    ascent = ascent.max(shift + b.ascent);
                    script_width = script_width.max(b.width);
                    svg.push_str(&b.svg);
                }
                if let Some(sub) = sub {
                    let shift = size * 0.25;
                    let b = self.layout(sub, script_size, script_x, baseline + shift);
                    descent = descent.max(shift + b.descent);
                    script_width = script_width.max(b.width);
                    svg.push_str(&b.svg);
                }

                MathBox {
                    width: base_box.width + script_width,
                    ascent,
                    descent,
                    svg,
                }
            }
            MathNode::Limits { base, under, over } => {
                // Measure first, then place everything centred on the widest part
                let base_probe = self.layout(base, size, 0.0, 0.0);
                let script_size = size * SCRIPT_SCALE;
                let under_probe = under
                    .as_ref()
                    .map(|n| self.layout(n, script_size, 0.0, 0.0));
                let over_probe = over.as_ref().map(|n| self.layout(n, script_size, 0.0, 0.0));

                let width = [&under_probe, &over_probe]
                    .into_iter()
                    .flatten()
                    .fold(base_probe.width, |w, b| w.max(b.width));
                let gap = size * 0.1;

                let base_x = x + (width - base_probe.width) / 2.0;
                let base_box = self.layout(base, size, base_x, baseline);
                let mut ascent = base_box.ascent;
                let mut descent = base_box.descent;
                let mut svg = base_box.svg;

                if let (Some(over), Some(probe)) = (over, over_probe) {
                    let over_baseline = baseline - base_box.ascent - gap - probe.descent;
                    let over_x = x + (width - probe.width) / 2.0;
                    let b = self.layout(over, script_size, over_x, over_baseline);
                    ascent = base_box.ascent + gap + probe.descent + b.ascent;
                    svg.push_str(&b.svg);
                }
                if let (Some(under), Some(probe)) = (under, under_probe) {
                    let under_baseline = baseline + base_box.descent + gap + probe.ascent;
                    let under_x = x + (width - probe.width) / 2.0;
                    let b = self.layout(under, script_size, under_x, under_baseline);
                    descent = base_box.descent + gap + probe.ascent + b.descent;
                    svg.push_str(&b.svg);
                }

                MathBox {
                    width,
                    ascent,
                    descent,
                    svg,
                }
            }
            MathNode::Frac { num, den } => {
                let inner = size * 0.9;
                let num_probe = self.layout(num, inner, 0.0, 0.0);
                let den_probe = self.layout(den, inner, 0.0, 0.0);
                let pad = size * 0.12;
                let width = num_probe.width.max(den_probe.width) + pad * 2.0;
                let axis = baseline - size * 0.28;
                let gap = size * 0.15;
                let rule = (size * 0.05).max(1.0);

                let num_baseline = axis - gap - num_probe.descent;
                let den_baseline = axis + gap + den_probe.ascent;
                let num_x = x + (width - num_probe.width) / 2.0;
                let den_x = x + (width - den_probe.width) / 2.0;
                let num_box = self.layout(num, inner, num_x, num_baseline);
                let den_box = self.layout(den, inner, den_x, den_baseline);

                let mut svg = num_box.svg;
                svg.push_str(&den_box.svg);
                svg.push_str(&format!(
                    r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="{:.2}"/>"#,
                    x + pad / 2.0,
                    axis,
                    x + width - pad / 2.0,
                    axis,
                    self.color,
                    rule
                ));

                MathBox {
                    width,
                    ascent: (baseline - num_baseline) + num_box.ascent,
                    descent: (den_baseline - baseline) + den_box.descent,
                    svg,
                }
            }
            MathNode::Radical(radicand) => {
                let sign_width = size * 0.6;
                let inner = self.layout(radicand, size, x + sign_width, baseline);
                let top = baseline - inner.ascent - size * 0.12;
                let bottom = baseline + inner.descent;
                let path = format!(
                    "M{:.2},{:.2} L{:.2},{:.2} L{:.2},{:.2} L{:.2},{:.2} L{:.2},{:.2}",
                    x,
                    baseline - size * 0.3,
                    x + sign_width * 0.3,
                    baseline - size * 0.4,
                    x + sign_width * 0.6,
                    bottom,
                    x + sign_width,
                    top,
                    x + sign_width + inner.width,
                    top
                );
                let mut svg = format!(
                    r#"<path d="{}" fill="none" stroke="{}" stroke-width="{:.2}"/>"#,
                    path,
                    self.color,
                    (size * 0.05).max(1.0)
                );
                svg.push_str(&inner.svg);
                MathBox {
                    width: sign_width + inner.width,
                    ascent: baseline - top + size * 0.05,
                    descent: inner.descent,
                    svg,
                }
            }
        }
    }

    fn layout_token(
        &mut self,
        kind: TokenKind,
        text: &str,
        size: f32,
        x: f32,
        baseline: f32,
    ) -> MathBox {
        let italic = kind == TokenKind::Ident
            && text.chars().count() == 1
            && text.chars().all(|c| c.is_alphabetic());
        let large = kind == TokenKind::Operator && is_large_operator(text);
        let font_size = if large { size * LARGE_OP_SCALE } else { size };
        let spacing = if kind == TokenKind::Operator && is_spaced_operator(text) {
            size * 0.22
        } else {
            0.0
        };

        let style = match kind {
            TokenKind::Text => TextStyle::PLAIN,
            _ => TextStyle::math(italic),
        };
        let (w, _) = self.measure.measure_text(text, font_size, style);
        let family = if kind == TokenKind::Text {
            "sans-serif"
        } else {
            "serif"
        };
        let y = if large {
            baseline + (font_size - size) * 0.25
        } else {
            baseline
        };
        let svg = format!(
            r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="{:.2}" fill="{}"{}>{}</text>"#,
            x + spacing,
            y,
            family,
            font_size,
            self.color,
            if italic { r#" font-style="italic""# } else { "" },
            escape_xml(text)
        );

        MathBox {
            width: w + spacing * 2.0,
            ascent: font_size * if large { 0.8 } else { ASCENT },
            descent: font_size * if large { 0.3 } else { DESCENT },
            svg,
        }
    }
}
