use std::collections::HashMap;

use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping, Style, Weight};

#[derive(Hash, PartialEq, Eq, Clone)]
struct MeasureKey {
    text: String,
    font_size_bits: u32,
    is_bold: bool,
    is_italic: bool,
    is_serif: bool,
}

/// Font flavour used for a run of text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    /// Serif face, used for typeset math
    pub serif: bool,
}

impl TextStyle {
    pub const PLAIN: TextStyle = TextStyle {
        bold: false,
        italic: false,
        serif: false,
    };

    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Self::PLAIN
        }
    }

    pub fn math(italic: bool) -> Self {
        Self {
            bold: false,
            italic,
            serif: true,
        }
    }
}

pub trait TextMeasure {
    /// Width and height of `text` laid out on a single line.
    fn measure_text(&mut self, text: &str, font_size: f32, style: TextStyle) -> (f32, f32);
}

/// Shapes text with cosmic-text against the system font database.
pub struct CosmicTextMeasure {
    font_system: FontSystem,
    cache: HashMap<MeasureKey, (f32, f32)>,
}

impl CosmicTextMeasure {
    pub fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            cache: HashMap::new(),
        }
    }
}

impl Default for CosmicTextMeasure {
    fn default() -> Self {
        Self::new()
    }
}

impl TextMeasure for CosmicTextMeasure {
    fn measure_text(&mut self, text: &str, font_size: f32, style: TextStyle) -> (f32, f32) {
        let key = MeasureKey {
            text: text.to_string(),
            font_size_bits: font_size.to_bits(),
            is_bold: style.bold,
            is_italic: style.italic,
            is_serif: style.serif,
        };

        if let Some(cached) = self.cache.get(&key) {
            return *cached;
        }

        let line_height = font_size * 1.2;
        let mut buffer = Buffer::new(
            &mut self.font_system,
            Metrics {
                font_size,
                line_height,
            },
        );
        buffer.set_size(&mut self.font_system, None, None);

        let attrs = Attrs::new()
            .family(if style.serif {
                Family::Serif
            } else {
                Family::SansSerif
            })
            .weight(if style.bold {
                Weight::BOLD
            } else {
                Weight::NORMAL
            })
            .style(if style.italic {
                Style::Italic
            } else {
                Style::Normal
            });

        buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, None);

        let mut total_width: f32 = 0.0;
        let mut total_height: f32 = 0.0;
        for run in buffer.layout_runs() {
            total_width = total_width.max(run.line_w);
            total_height += run.line_height;
        }

        // No usable font on this system: fall back to an estimate so boxes
        // still get sensible sizes.
        let measured = if total_width <= 0.0 && !text.trim().is_empty() {
            ApproxMeasure.measure_text(text, font_size, style)
        } else {
            (total_width, total_height)
        };
        self.cache.insert(key, measured);
        measured
    }
}

/// Character-count estimate of text extents. Deterministic and font-free.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxMeasure;

impl TextMeasure for ApproxMeasure {
    fn measure_text(&mut self, text: &str, font_size: f32, style: TextStyle) -> (f32, f32) {
        let factor = if style.bold { 0.6 } else { 0.55 };
        let width = text.chars().count() as f32 * font_size * factor;
        (width, font_size * 1.2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approx_measure_scales_with_length_and_size() {
        let mut m = ApproxMeasure;
        let (short, h) = m.measure_text("ab", 10.0, TextStyle::PLAIN);
        let (long, _) = m.measure_text("abcd", 10.0, TextStyle::PLAIN);
        let (big, _) = m.measure_text("ab", 20.0, TextStyle::PLAIN);
        assert!((long - 2.0 * short).abs() < 1e-4);
        assert!((big - 2.0 * short).abs() < 1e-4);
        assert!((h - 12.0).abs() < 1e-4);
    }

    #[test]
    fn bold_is_wider() {
        let mut m = ApproxMeasure;
        let (plain, _) = m.measure_text("Valuation", 14.0, TextStyle::PLAIN);
        let (bold, _) = m.measure_text("Valuation", 14.0, TextStyle::bold());
        assert!(bold > plain);
    }
}
