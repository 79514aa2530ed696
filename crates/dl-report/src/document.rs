//! Laid-out pages as a display list.
//!
//! Coordinates are PDF points with the origin at the top-left corner of the
//! page and `y` growing downward. Text `y` is the baseline.

use serde::Serialize;

use crate::measure::FontSpec;
use crate::theme::Color;

/// Page canvas size and reserved margins, in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    /// Content starts here; the header bar lives above it.
    pub margin_top: f32,
    /// Content must end this far above the bottom edge; the footer bar lives below.
    pub margin_bottom: f32,
    pub header_height: f32,
    pub footer_height: f32,
}

impl PageGeometry {
    pub fn a4() -> Self {
        Self {
            width: 595.28,
            height: 841.89,
            margin_left: 40.0,
            margin_right: 40.0,
            margin_top: 92.0,
            margin_bottom: 56.0,
            header_height: 68.0,
            footer_height: 32.0,
        }
    }

    pub fn letter() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
            ..Self::a4()
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "a4" => Some(Self::a4()),
            "letter" => Some(Self::letter()),
            _ => None,
        }
    }

    pub fn content_top(&self) -> f32 {
        self.margin_top
    }

    /// Lowest `y` a content row may reach.
    pub fn content_bottom(&self) -> f32 {
        self.height - self.margin_bottom
    }

    pub fn content_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

/// One drawing primitive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DrawOp {
    /// Filled rectangle; `(x, y)` is the top-left corner.
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Color,
    },
    /// Stroked straight line.
    Rule {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
        color: Color,
    },
    /// Filled circle.
    Dot { cx: f32, cy: f32, r: f32, color: Color },
    /// A single line of text starting at `x` on baseline `y`.
    Text {
        x: f32,
        y: f32,
        text: String,
        font: FontSpec,
        color: Color,
    },
}

/// A laid-out page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    pub ops: Vec<DrawOp>,
    /// Text of each content row drawn on this page, top to bottom.
    pub rows: Vec<String>,
}

impl Page {
    pub fn new(number: usize) -> Self {
        Self {
            number,
            ops: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// All text drawn on the page (chrome included), in draw order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// A finalized multi-page document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub geometry: PageGeometry,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn content_rows(&self) -> usize {
        self.pages.iter().map(|p| p.rows.len()).sum()
    }
}
