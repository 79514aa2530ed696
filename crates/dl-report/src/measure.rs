//! Text measurement for wrapping and alignment.

use serde::Serialize;
use unicode_width::UnicodeWidthStr;

/// Font weight. Maps onto the two base-14 faces the PDF writer embeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Font {
    Regular,
    Bold,
}

/// A font weight at a point size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FontSpec {
    pub font: Font,
    pub size: f32,
}

impl FontSpec {
    pub fn regular(size: f32) -> Self {
        Self {
            font: Font::Regular,
            size,
        }
    }

    pub fn bold(size: f32) -> Self {
        Self {
            font: Font::Bold,
            size,
        }
    }
}

/// Measures the rendered width of a string, in points.
pub trait TextMeasure {
    fn width(&self, text: &str, spec: FontSpec) -> f32;
}

/// Approximate metrics: display cells times an average glyph width.
///
/// Wide (CJK) characters count as two cells, zero-width characters as none.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproxMetrics {
    /// Average advance of a regular glyph, as a fraction of the font size.
    pub regular_em: f32,
    /// Average advance of a bold glyph, as a fraction of the font size.
    pub bold_em: f32,
}

impl Default for ApproxMetrics {
    fn default() -> Self {
        Self {
            regular_em: 0.52,
            bold_em: 0.56,
        }
    }
}

impl TextMeasure for ApproxMetrics {
    fn width(&self, text: &str, spec: FontSpec) -> f32 {
        let em = match spec.font {
            Font::Regular => self.regular_em,
            Font::Bold => self.bold_em,
        };
        text.width() as f32 * spec.size * em
    }
}

/// Shorten `text` with a trailing ellipsis until it fits `max_width`.
pub fn truncate_to_width(
    text: &str,
    max_width: f32,
    measure: &dyn TextMeasure,
    spec: FontSpec,
) -> String {
    if measure.width(text, spec) <= max_width {
        return text.to_string();
    }
    let mut chars: Vec<char> = text.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let candidate: String = chars.iter().collect::<String>() + "...";
        if measure.width(&candidate, spec) <= max_width {
            return candidate;
        }
    }
    String::new()
}
