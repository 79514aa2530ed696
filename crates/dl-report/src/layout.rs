//! Paginated layout of classified text rows.
//!
//! Rows are drawn top to bottom. Before every physical (post-wrap) row the
//! engine checks whether the row still fits above the bottom margin and, if
//! not, starts a new page with fresh header chrome. Footers carry "Page N of
//! M" and are stamped by [`finalize`] once the page count is known.

use tracing::debug;

use crate::classify::{classify_line, LineKind};
use crate::document::{Document, DrawOp, Page, PageGeometry};
use crate::measure::{FontSpec, TextMeasure};
use crate::theme::{Color, Theme};
use crate::wrap::wrap_to_width;

const EPSILON: f32 = 0.01;

/// Vertical rhythm and indentation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutMetrics {
    pub body_size: f32,
    pub header_size: f32,
    pub line_height: f32,
    /// Added after the last line of a header.
    pub header_extra: f32,
    /// Added to the line height for a blank line.
    pub blank_extra: f32,
    pub paragraph_indent: f32,
    pub header_indent: f32,
    pub bullet_indent: f32,
    pub number_indent: f32,
    /// Gap kept between text and the right edge of the row band.
    pub right_pad: f32,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            body_size: 10.0,
            header_size: 12.0,
            line_height: 15.0,
            header_extra: 6.0,
            blank_extra: 2.0,
            paragraph_indent: 6.0,
            header_indent: 10.0,
            bullet_indent: 20.0,
            number_indent: 26.0,
            right_pad: 6.0,
        }
    }
}

impl LayoutMetrics {
    /// Single-line rows that fit on one page.
    pub fn lines_per_page(&self, geometry: &PageGeometry) -> usize {
        let usable = geometry.content_bottom() - geometry.content_top();
        ((usable + EPSILON) / self.line_height).floor().max(1.0) as usize
    }
}

/// Labels painted as page chrome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chrome {
    pub title: String,
    pub subtitle: String,
    pub footer_label: String,
}

impl Chrome {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = subtitle.into();
        self
    }

    pub fn with_footer(mut self, footer_label: impl Into<String>) -> Self {
        self.footer_label = footer_label.into();
        self
    }
}

/// Write position on the current page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutCursor {
    pub x: f32,
    pub y: f32,
    pub geometry: PageGeometry,
}

impl LayoutCursor {
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            x: geometry.margin_left,
            y: geometry.content_top(),
            geometry,
        }
    }

    /// Whether a row of height `advance` fits above the bottom margin.
    pub fn fits(&self, advance: f32) -> bool {
        self.y + advance <= self.geometry.content_bottom() + EPSILON
    }

    /// True when nothing has been drawn on the page yet.
    pub fn at_top(&self) -> bool {
        self.y <= self.geometry.content_top() + EPSILON
    }

    pub fn reset(&mut self) {
        self.x = self.geometry.margin_left;
        self.y = self.geometry.content_top();
    }
}

/// Per-kind drawing parameters.
struct RowStyle {
    font: FontSpec,
    color: Color,
    indent: f32,
    banded: bool,
}

/// One layout run. Owns its cursor and pages; nothing is shared between runs.
pub struct Layout<'a> {
    theme: &'a Theme,
    chrome: &'a Chrome,
    measure: &'a dyn TextMeasure,
    metrics: LayoutMetrics,
    cursor: LayoutCursor,
    pages: Vec<Page>,
    /// Running band counter; not reset across page breaks.
    band: usize,
}

impl<'a> Layout<'a> {
    /// Start a layout with its first page already painted.
    pub fn new(
        geometry: PageGeometry,
        metrics: LayoutMetrics,
        theme: &'a Theme,
        chrome: &'a Chrome,
        measure: &'a dyn TextMeasure,
    ) -> Self {
        let mut layout = Self {
            theme,
            chrome,
            measure,
            metrics,
            cursor: LayoutCursor::new(geometry),
            pages: Vec::new(),
            band: 0,
        };
        layout.start_page();
        layout
    }

    pub fn cursor(&self) -> &LayoutCursor {
        &self.cursor
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.cursor.geometry
    }

    pub fn metrics(&self) -> &LayoutMetrics {
        &self.metrics
    }

    pub fn theme(&self) -> &Theme {
        self.theme
    }

    pub fn measure(&self) -> &dyn TextMeasure {
        self.measure
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Classify and lay out every line of `text`.
    pub fn push_text(&mut self, text: &str) {
        for line in text.lines() {
            self.push_line(&classify_line(line));
        }
    }

    /// Lay out one logical line.
    pub fn push_line(&mut self, kind: &LineKind) {
        match kind {
            LineKind::Blank => self.push_blank(),
            _ => self.push_row(kind),
        }
    }

    /// Start a new page unless a row of height `advance` still fits.
    ///
    /// A fresh page always accepts the row, so oversized rows are drawn
    /// rather than paginated forever. Returns true if a page was started.
    pub fn ensure_room(&mut self, advance: f32) -> bool {
        if self.cursor.fits(advance) || self.cursor.at_top() {
            return false;
        }
        self.start_page();
        true
    }

    pub fn draw(&mut self, op: DrawOp) {
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    pub fn advance(&mut self, dy: f32) {
        self.cursor.y += dy;
    }

    /// Record the text of a content row on the current page.
    pub fn record_row(&mut self, text: impl Into<String>) {
        if let Some(page) = self.pages.last_mut() {
            page.rows.push(text.into());
        }
    }

    /// Tint for the next banded row, advancing the running counter.
    pub fn next_band(&mut self) -> Color {
        let color = self.theme.band(self.band);
        self.band += 1;
        color
    }

    /// Pages laid out so far, footers not yet stamped.
    pub fn finish(self) -> Vec<Page> {
        self.pages
    }

    fn push_blank(&mut self) {
        let advance = self.metrics.line_height + self.metrics.blank_extra;
        // Spacing that would cross the margin is dropped rather than paginated.
        if self.cursor.fits(advance) {
            self.cursor.y += advance;
        }
    }

    fn push_row(&mut self, kind: &LineKind) {
        let style = self.row_style(kind);
        let geometry = self.cursor.geometry;
        let line_height = self.metrics.line_height;
        let text_x = geometry.margin_left + style.indent;
        let column = geometry.width - geometry.margin_right - self.metrics.right_pad - text_x;

        let lines = wrap_to_width(kind.text(), column, self.measure, style.font);
        let band = if style.banded { Some(self.next_band()) } else { None };
        let last = lines.len().saturating_sub(1);

        for (i, line) in lines.into_iter().enumerate() {
            let mut advance = line_height;
            if matches!(kind, LineKind::Header(_)) && i == last {
                advance += self.metrics.header_extra;
            }
            self.ensure_room(advance);

            let top = self.cursor.y;
            if let Some(color) = band {
                self.draw(DrawOp::Rect {
                    x: geometry.margin_left,
                    y: top,
                    w: geometry.content_width(),
                    h: line_height,
                    color,
                });
            }
            if i == 0 {
                self.draw_glyph(kind, top);
            }
            self.draw(DrawOp::Text {
                x: text_x,
                y: baseline(top, line_height, style.font.size),
                text: line.clone(),
                font: style.font,
                color: style.color,
            });
            self.record_row(line);
            self.cursor.y += advance;
        }
    }

    fn row_style(&self, kind: &LineKind) -> RowStyle {
        let m = &self.metrics;
        match kind {
            LineKind::Header(_) => RowStyle {
                font: FontSpec::bold(m.header_size),
                color: self.theme.heading,
                indent: m.header_indent,
                banded: false,
            },
            LineKind::Bullet(_) => RowStyle {
                font: FontSpec::regular(m.body_size),
                color: self.theme.text,
                indent: m.bullet_indent,
                banded: true,
            },
            LineKind::Numbered { .. } => RowStyle {
                font: FontSpec::regular(m.body_size),
                color: self.theme.text,
                indent: m.number_indent,
                banded: true,
            },
            LineKind::Paragraph(_) | LineKind::Blank => RowStyle {
                font: FontSpec::regular(m.body_size),
                color: self.theme.text,
                indent: m.paragraph_indent,
                banded: true,
            },
        }
    }

    /// Bullet dot, number badge, or header accent bar.
    fn draw_glyph(&mut self, kind: &LineKind, top: f32) {
        let left = self.cursor.geometry.margin_left;
        let line_height = self.metrics.line_height;
        match kind {
            LineKind::Header(_) => self.draw(DrawOp::Rect {
                x: left,
                y: top + 2.0,
                w: 3.0,
                h: line_height - 4.0,
                color: self.theme.accent,
            }),
            LineKind::Bullet(_) => self.draw(DrawOp::Dot {
                cx: left + self.metrics.bullet_indent / 2.0,
                cy: top + line_height / 2.0,
                r: 2.0,
                color: self.theme.accent,
            }),
            LineKind::Numbered { number, .. } => {
                let size = self.metrics.body_size - 2.0;
                let font = FontSpec::bold(size);
                let label_width = self.measure.width(number, font);
                let badge_width = (label_width + 6.0).max(16.0);
                self.draw(DrawOp::Rect {
                    x: left + 4.0,
                    y: top + 2.0,
                    w: badge_width,
                    h: line_height - 4.0,
                    color: self.theme.badge_fill,
                });
                self.draw(DrawOp::Text {
                    x: left + 4.0 + (badge_width - label_width) / 2.0,
                    y: baseline(top, line_height, size),
                    text: number.clone(),
                    font,
                    color: self.theme.badge_text,
                });
            }
            LineKind::Paragraph(_) | LineKind::Blank => {}
        }
    }

    fn start_page(&mut self) {
        let number = self.pages.len() + 1;
        debug!(page = number, "starting page");
        let mut page = Page::new(number);
        paint_header(&mut page, &self.cursor.geometry, self.theme, self.chrome);
        self.pages.push(page);
        self.cursor.reset();
    }
}

/// Baseline that vertically centres a `size` glyph in a row.
fn baseline(top: f32, line_height: f32, size: f32) -> f32 {
    top + (line_height + size * 0.7) / 2.0
}

fn paint_header(page: &mut Page, geometry: &PageGeometry, theme: &Theme, chrome: &Chrome) {
    page.ops.push(DrawOp::Rect {
        x: 0.0,
        y: 0.0,
        w: geometry.width,
        h: geometry.height,
        color: theme.background,
    });
    page.ops.push(DrawOp::Rect {
        x: 0.0,
        y: 0.0,
        w: geometry.width,
        h: geometry.header_height,
        color: theme.header_fill,
    });
    page.ops.push(DrawOp::Rule {
        x1: 0.0,
        y1: geometry.header_height,
        x2: geometry.width,
        y2: geometry.header_height,
        width: 2.0,
        color: theme.accent,
    });
    page.ops.push(DrawOp::Text {
        x: geometry.margin_left,
        y: geometry.header_height * 0.45,
        text: chrome.title.clone(),
        font: FontSpec::bold(16.0),
        color: theme.header_text,
    });
    if !chrome.subtitle.is_empty() {
        page.ops.push(DrawOp::Text {
            x: geometry.margin_left,
            y: geometry.header_height * 0.75,
            text: chrome.subtitle.clone(),
            font: FontSpec::regular(9.0),
            color: theme.header_subtext,
        });
    }
}

/// Stamp every page's footer with its final "Page N of M" label.
pub fn finalize(
    pages: Vec<Page>,
    geometry: PageGeometry,
    theme: &Theme,
    chrome: &Chrome,
    measure: &dyn TextMeasure,
) -> Document {
    let total = pages.len();
    let font = FontSpec::regular(8.0);
    let top = geometry.height - geometry.footer_height;
    let text_y = baseline(top, geometry.footer_height, font.size);

    let pages = pages
        .into_iter()
        .map(|mut page| {
            page.ops.push(DrawOp::Rect {
                x: 0.0,
                y: top,
                w: geometry.width,
                h: geometry.footer_height,
                color: theme.footer_fill,
            });
            if !chrome.footer_label.is_empty() {
                page.ops.push(DrawOp::Text {
                    x: geometry.margin_left,
                    y: text_y,
                    text: chrome.footer_label.clone(),
                    font,
                    color: theme.footer_text,
                });
            }
            let label = format!("Page {} of {}", page.number, total);
            let width = measure.width(&label, font);
            page.ops.push(DrawOp::Text {
                x: geometry.width - geometry.margin_right - width,
                y: text_y,
                text: label,
                font,
                color: theme.footer_text,
            });
            page
        })
        .collect();

    Document { geometry, pages }
}

/// Lay out a block of free text into a finished document.
pub fn layout_text(
    text: &str,
    geometry: PageGeometry,
    metrics: LayoutMetrics,
    theme: &Theme,
    chrome: &Chrome,
    measure: &dyn TextMeasure,
) -> Document {
    let mut layout = Layout::new(geometry, metrics, theme, chrome, measure);
    layout.push_text(text);
    let pages = layout.finish();
    debug!(pages = pages.len(), "text layout complete");
    finalize(pages, geometry, theme, chrome, measure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::ApproxMetrics;

    fn run(text: &str) -> Document {
        run_with(text, PageGeometry::a4(), LayoutMetrics::default())
    }

    fn run_with(text: &str, geometry: PageGeometry, metrics: LayoutMetrics) -> Document {
        let theme = Theme::executive();
        let chrome = Chrome::new("Oracle Analysis").with_footer("Confidential");
        layout_text(
            text,
            geometry,
            metrics,
            &theme,
            &chrome,
            &ApproxMetrics::default(),
        )
    }

    fn footer_label(page: &Page) -> String {
        page.texts()
            .filter(|t| t.starts_with("Page "))
            .last()
            .unwrap_or_default()
            .to_string()
    }

    #[test]
    fn empty_input_is_one_page_with_chrome() {
        let doc = run("");
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.content_rows(), 0);
        let texts: Vec<_> = doc.pages[0].texts().collect();
        assert!(texts.contains(&"Oracle Analysis"));
        assert!(texts.contains(&"Confidential"));
        assert_eq!(footer_label(&doc.pages[0]), "Page 1 of 1");
    }

    #[test]
    fn page_count_matches_capacity() {
        let geometry = PageGeometry::a4();
        let metrics = LayoutMetrics::default();
        let per_page = metrics.lines_per_page(&geometry);

        for n in [1, per_page - 1, per_page, per_page + 1, per_page * 3 + 2] {
            let text: Vec<String> = (0..n).map(|i| format!("Row {i}")).collect();
            let doc = run_with(&text.join("\n"), geometry, metrics);
            assert_eq!(doc.page_count(), n.div_ceil(per_page), "{n} rows");
            assert_eq!(doc.content_rows(), n);
            for page in &doc.pages[..doc.page_count() - 1] {
                assert_eq!(page.rows.len(), per_page);
            }
        }
    }

    #[test]
    fn headers_consume_extra_space() {
        let geometry = PageGeometry::a4();
        let metrics = LayoutMetrics::default();
        let per_page = metrics.lines_per_page(&geometry);

        // One header plus enough paragraphs to fill a page exactly without it.
        let mut text = vec!["Overview:".to_string()];
        text.extend((0..per_page - 1).map(|i| format!("Row {i}")));
        let doc = run_with(&text.join("\n"), geometry, metrics);
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.pages[1].rows.len(), 1);
    }

    #[test]
    fn layout_is_deterministic() {
        let text = "Summary:\n- Auto claims dominate reserve\n3. Review venue strategy\n\n"
            .repeat(40);
        let a = run(&text);
        let b = run(&text);
        assert_eq!(a, b);
        assert!(a.page_count() > 1);
    }

    #[test]
    fn footers_are_stamped_with_final_total() {
        let text = "Paragraph line\n".repeat(200);
        let doc = run(&text);
        let total = doc.page_count();
        assert!(total >= 3);
        for page in &doc.pages {
            assert_eq!(
                footer_label(page),
                format!("Page {} of {}", page.number, total)
            );
        }
    }

    #[test]
    fn cursor_never_crosses_bottom_margin() {
        let text = "## Heading\n- bullet with a fair amount of text that will wrap across the available column width more than once\n\n"
            .repeat(60);
        let doc = run(&text);
        let bottom = doc.geometry.content_bottom();
        for page in &doc.pages {
            for op in &page.ops {
                if let DrawOp::Rect { y, h, .. } = op {
                    if *y >= doc.geometry.content_top() && *y < bottom {
                        assert!(y + h <= bottom + 0.01, "row at {y} overflows");
                    }
                }
            }
        }
    }

    #[test]
    fn continuation_lines_keep_indent() {
        let long = format!("- {}", "exposure ".repeat(60));
        let doc = run(&long);
        let xs: Vec<f32> = doc.pages[0]
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { x, font, .. } if font.size == 10.0 => Some(*x),
                _ => None,
            })
            .collect();
        assert!(xs.len() > 1);
        assert!(xs.iter().all(|x| *x == xs[0]));
        assert_eq!(xs[0], 40.0 + LayoutMetrics::default().bullet_indent);
    }

    #[test]
    fn one_bullet_can_span_a_page_break() {
        let geometry = PageGeometry::a4();
        let metrics = LayoutMetrics::default();
        let per_page = metrics.lines_per_page(&geometry);
        let mut lines: Vec<String> = (0..per_page - 1).map(|i| format!("Row {i}")).collect();
        lines.push(format!("- {}", "word ".repeat(120)));
        let doc = run_with(&lines.join("\n"), geometry, metrics);
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.pages[0].rows.len(), per_page);
        assert!(doc.pages[1].rows[0].starts_with("word"));
    }

    #[test]
    fn banding_continues_across_pages() {
        let geometry = PageGeometry::a4();
        let metrics = LayoutMetrics::default();
        let per_page = metrics.lines_per_page(&geometry);
        let theme = Theme::executive();
        let text: Vec<String> = (0..per_page + 1).map(|i| format!("Row {i}")).collect();
        let doc = run_with(&text.join("\n"), geometry, metrics);

        let first_band_on_page_two = doc.pages[1]
            .ops
            .iter()
            .find_map(|op| match op {
                DrawOp::Rect { y, color, .. } if *y >= geometry.content_top() => Some(*color),
                _ => None,
            })
            .unwrap();
        assert_eq!(first_band_on_page_two, theme.band(per_page));
    }

    #[test]
    fn glyphs_for_each_kind() {
        let doc = run("Findings:\n- bullet\n12. numbered\nplain");
        let page = &doc.pages[0];
        assert!(page.ops.iter().any(|op| matches!(op, DrawOp::Dot { .. })));
        assert!(page.texts().any(|t| t == "12"));
        assert_eq!(page.rows, vec!["Findings:", "bullet", "numbered", "plain"]);
    }

    #[test]
    fn blank_lines_advance_without_rows() {
        let doc = run("a\n\n\nb");
        assert_eq!(doc.pages[0].rows, vec!["a", "b"]);
        let ys: Vec<f32> = doc.pages[0]
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { y, text, .. } if text == "a" || text == "b" => Some(*y),
                _ => None,
            })
            .collect();
        let metrics = LayoutMetrics::default();
        let expected = metrics.line_height * 3.0 + metrics.blank_extra * 2.0;
        assert!((ys[1] - ys[0] - expected).abs() < 0.01);
    }

    #[test]
    fn trailing_blank_lines_do_not_add_pages() {
        let geometry = PageGeometry::a4();
        let metrics = LayoutMetrics::default();
        let per_page = metrics.lines_per_page(&geometry);
        let mut text: Vec<String> = (0..per_page).map(|i| format!("Row {i}")).collect();
        text.extend(std::iter::repeat(String::new()).take(5));
        let doc = run_with(&text.join("\n"), geometry, metrics);
        assert_eq!(doc.page_count(), 1);
    }

    #[test]
    fn pathological_word_terminates() {
        let doc = run(&"x".repeat(20_000));
        assert!(doc.page_count() >= 1);
        let drawn: usize = doc
            .pages
            .iter()
            .flat_map(|p| p.rows.iter())
            .map(|r| r.chars().count())
            .sum();
        assert_eq!(drawn, 20_000);
    }

    #[test]
    fn tiny_page_still_terminates() {
        let geometry = PageGeometry {
            width: 60.0,
            height: 100.0,
            margin_left: 10.0,
            margin_right: 10.0,
            margin_top: 40.0,
            margin_bottom: 50.0,
            header_height: 20.0,
            footer_height: 10.0,
        };
        let doc = run_with("Heading:\n- some wrapped bullet text", geometry, LayoutMetrics::default());
        assert!(doc.page_count() >= 2);
        assert!(doc.content_rows() >= 2);
    }

    #[test]
    fn independent_runs_do_not_share_state() {
        let a = run("one\ntwo");
        let _ = run(&"filler\n".repeat(300));
        let c = run("one\ntwo");
        assert_eq!(a, c);
    }
}
