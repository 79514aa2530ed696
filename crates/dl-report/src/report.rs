//! Declarative reports: KPI cards, text sections and tables on one layout engine.

use serde::Serialize;
use tracing::debug;

use crate::classify::LineKind;
use crate::document::{Document, DrawOp, PageGeometry};
use crate::layout::{finalize, Chrome, Layout, LayoutMetrics};
use crate::measure::{truncate_to_width, ApproxMetrics, FontSpec, TextMeasure};
use crate::theme::{Color, Theme};

const KPI_PER_ROW: usize = 3;
const KPI_CARD_HEIGHT: f32 = 54.0;
const KPI_GAP: f32 = 10.0;
const CELL_PAD: f32 = 4.0;

/// A headline figure shown as a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Kpi {
    pub label: String,
    pub value: String,
    pub note: Option<String>,
}

impl Kpi {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// A heading followed by free text. The body is classified line by line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub heading: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub header: String,
    /// Share of the content width relative to the other columns.
    pub weight: f32,
    pub align: Align,
}

impl Column {
    pub fn left(header: impl Into<String>, weight: f32) -> Self {
        Self {
            header: header.into(),
            weight,
            align: Align::Left,
        }
    }

    pub fn right(header: impl Into<String>, weight: f32) -> Self {
        Self {
            header: header.into(),
            weight,
            align: Align::Right,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub title: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(title: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            title: title.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, cells: Vec<String>) -> Self {
        self.rows.push(cells);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Block {
    Section(Section),
    Table(Table),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub title: String,
    pub subtitle: String,
    pub footer_label: String,
    pub kpis: Vec<Kpi>,
    pub blocks: Vec<Block>,
}

impl Report {
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

    pub fn kpi(mut self, kpi: Kpi) -> Self {
        self.kpis.push(kpi);
        self
    }

    pub fn section(mut self, heading: impl Into<String>, body: impl Into<String>) -> Self {
        self.blocks.push(Block::Section(Section {
            heading: heading.into(),
            body: body.into(),
        }));
        self
    }

    pub fn table(mut self, table: Table) -> Self {
        self.blocks.push(Block::Table(table));
        self
    }

    fn chrome(&self) -> Chrome {
        Chrome::new(self.title.clone())
            .with_subtitle(self.subtitle.clone())
            .with_footer(self.footer_label.clone())
    }
}

/// Render with the default metrics and approximate glyph widths.
pub fn render_report(report: &Report, theme: &Theme, geometry: &PageGeometry) -> Document {
    render_report_with(
        report,
        theme,
        *geometry,
        LayoutMetrics::default(),
        &ApproxMetrics::default(),
    )
}

pub fn render_report_with(
    report: &Report,
    theme: &Theme,
    geometry: PageGeometry,
    metrics: LayoutMetrics,
    measure: &dyn TextMeasure,
) -> Document {
    let chrome = report.chrome();
    let mut layout = Layout::new(geometry, metrics, theme, &chrome, measure);

    for row in report.kpis.chunks(KPI_PER_ROW) {
        draw_kpi_row(&mut layout, row);
    }
    for block in &report.blocks {
        match block {
            Block::Section(section) => {
                layout.push_line(&LineKind::Header(section.heading.clone()));
                layout.push_text(&section.body);
                layout.push_line(&LineKind::Blank);
            }
            Block::Table(table) => draw_table(&mut layout, table),
        }
    }

    let pages = layout.finish();
    debug!(title = %report.title, pages = pages.len(), "report rendered");
    finalize(pages, geometry, theme, &chrome, measure)
}

fn draw_kpi_row(layout: &mut Layout<'_>, kpis: &[Kpi]) {
    layout.ensure_room(KPI_CARD_HEIGHT + KPI_GAP);

    let geometry = *layout.geometry();
    let theme = layout.theme().clone();
    let top = layout.cursor().y;
    let slots = KPI_PER_ROW as f32;
    let card_width = (geometry.content_width() - KPI_GAP * (slots - 1.0)) / slots;
    let inner = card_width - 2.0 * 10.0;

    for (i, kpi) in kpis.iter().enumerate() {
        let x = geometry.margin_left + i as f32 * (card_width + KPI_GAP);
        let label_font = FontSpec::regular(8.0);
        let value_font = FontSpec::bold(16.0);
        let label = truncate_to_width(&kpi.label, inner, layout.measure(), label_font);
        let value = truncate_to_width(&kpi.value, inner, layout.measure(), value_font);
        let note = kpi
            .note
            .as_deref()
            .map(|n| truncate_to_width(n, inner, layout.measure(), label_font));

        layout.draw(DrawOp::Rect {
            x,
            y: top,
            w: card_width,
            h: KPI_CARD_HEIGHT,
            color: theme.card_fill,
        });
        layout.draw(DrawOp::Rect {
            x,
            y: top,
            w: 3.0,
            h: KPI_CARD_HEIGHT,
            color: theme.accent,
        });
        layout.draw(DrawOp::Text {
            x: x + 10.0,
            y: top + 14.0,
            text: label,
            font: label_font,
            color: theme.muted,
        });
        layout.draw(DrawOp::Text {
            x: x + 10.0,
            y: top + 34.0,
            text: value,
            font: value_font,
            color: theme.heading,
        });
        if let Some(note) = note {
            layout.draw(DrawOp::Text {
                x: x + 10.0,
                y: top + 47.0,
                text: note,
                font: label_font,
                color: theme.muted,
            });
        }
        layout.record_row(format!("{}: {}", kpi.label, kpi.value));
    }

    layout.advance(KPI_CARD_HEIGHT + KPI_GAP);
}

fn column_widths(columns: &[Column], total: f32) -> Vec<f32> {
    let sum: f32 = columns.iter().map(|c| c.weight.max(0.0)).sum();
    if sum <= 0.0 {
        let even = total / columns.len().max(1) as f32;
        return vec![even; columns.len()];
    }
    columns
        .iter()
        .map(|c| total * c.weight.max(0.0) / sum)
        .collect()
}

fn draw_table(layout: &mut Layout<'_>, table: &Table) {
    if !table.title.is_empty() {
        layout.push_line(&LineKind::Header(table.title.clone()));
    }
    if table.columns.is_empty() {
        return;
    }

    let line_height = layout.metrics().line_height;
    let widths = column_widths(&table.columns, layout.geometry().content_width());

    // Keep the header together with at least one row.
    layout.ensure_room(line_height * 2.0);
    draw_table_header(layout, table, &widths);

    for cells in &table.rows {
        if layout.ensure_room(line_height) {
            draw_table_header(layout, table, &widths);
        }
        let band = layout.next_band();
        let top = layout.cursor().y;
        let geometry = *layout.geometry();
        layout.draw(DrawOp::Rect {
            x: geometry.margin_left,
            y: top,
            w: geometry.content_width(),
            h: line_height,
            color: band,
        });
        let font = FontSpec::regular(layout.metrics().body_size - 1.0);
        let color = layout.theme().text;
        draw_cells(layout, &table.columns, &widths, cells, top, font, color);
        layout.record_row(cells.join(" | "));
        layout.advance(line_height);
    }
    layout.push_line(&LineKind::Blank);
}

fn draw_table_header(layout: &mut Layout<'_>, table: &Table, widths: &[f32]) {
    let line_height = layout.metrics().line_height;
    let geometry = *layout.geometry();
    let top = layout.cursor().y;
    let fill = layout.theme().badge_fill;
    layout.draw(DrawOp::Rect {
        x: geometry.margin_left,
        y: top,
        w: geometry.content_width(),
        h: line_height,
        color: fill,
    });
    let headers: Vec<String> = table.columns.iter().map(|c| c.header.clone()).collect();
    let font = FontSpec::bold(layout.metrics().body_size - 1.0);
    let color = layout.theme().badge_text;
    draw_cells(layout, &table.columns, widths, &headers, top, font, color);
    layout.advance(line_height);
}

fn draw_cells(
    layout: &mut Layout<'_>,
    columns: &[Column],
    widths: &[f32],
    cells: &[String],
    top: f32,
    font: FontSpec,
    color: Color,
) {
    let line_height = layout.metrics().line_height;
    let baseline = top + (line_height + font.size * 0.7) / 2.0;
    let mut x = layout.geometry().margin_left;

    for (i, column) in columns.iter().enumerate() {
        let width = widths[i];
        let inner = width - 2.0 * CELL_PAD;
        let raw = cells.get(i).map(String::as_str).unwrap_or("");
        let text = truncate_to_width(raw, inner, layout.measure(), font);
        if !text.is_empty() {
            let text_x = match column.align {
                Align::Left => x + CELL_PAD,
                Align::Right => x + width - CELL_PAD - layout.measure().width(&text, font),
            };
            layout.draw(DrawOp::Text {
                x: text_x,
                y: baseline,
                text,
                font,
                color,
            });
        }
        x += width;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_table(rows: usize) -> Table {
        let mut table = Table::new(
            "Top exposures",
            vec![
                Column::left("Claim", 1.0),
                Column::left("Claimant", 2.0),
                Column::right("Exposure", 1.0),
            ],
        );
        for i in 0..rows {
            table = table.row(vec![
                format!("CLM-{i:04}"),
                format!("Claimant {i}"),
                format!("${},000", i * 3),
            ]);
        }
        table
    }

    fn header_count(page: &crate::document::Page) -> usize {
        page.texts().filter(|t| *t == "Exposure").count()
    }

    #[test]
    fn empty_report_has_one_page() {
        let doc = render_report(&Report::new("Empty"), &Theme::default(), &PageGeometry::a4());
        assert_eq!(doc.page_count(), 1);
        assert!(doc.pages[0].texts().any(|t| t == "Page 1 of 1"));
    }

    #[test]
    fn kpis_are_laid_out_three_per_row() {
        let report = Report::new("Portfolio")
            .kpi(Kpi::new("Claims", "1,204"))
            .kpi(Kpi::new("Reserve", "$12.4M").with_note("open + litigated"))
            .kpi(Kpi::new("Paid", "$3.1M"))
            .kpi(Kpi::new("Litigated", "87"));
        let doc = render_report(&report, &Theme::default(), &PageGeometry::a4());
        let page = &doc.pages[0];
        assert_eq!(page.rows.len(), 4);
        assert_eq!(page.rows[0], "Claims: 1,204");

        let value_ys: Vec<f32> = page
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { y, font, .. } if font.size == 16.0 && *y > 70.0 => Some(*y),
                _ => None,
            })
            .collect();
        assert_eq!(value_ys.len(), 4);
        assert_eq!(value_ys[0], value_ys[2]);
        assert!(value_ys[3] > value_ys[0]);
    }

    #[test]
    fn long_table_repeats_header_on_each_page() {
        let report = Report::new("Claims").table(claims_table(120));
        let doc = render_report(&report, &Theme::default(), &PageGeometry::a4());
        assert!(doc.page_count() >= 3);
        for page in &doc.pages {
            assert_eq!(header_count(page), 1, "page {}", page.number);
        }
        let data_rows = doc
            .pages
            .iter()
            .flat_map(|p| p.rows.iter())
            .filter(|r| r.starts_with("CLM-"))
            .count();
        assert_eq!(data_rows, 120);
    }

    #[test]
    fn cells_are_truncated_to_column() {
        let table = Table::new("Wide", vec![Column::left("Notes", 1.0), Column::left("x", 9.0)])
            .row(vec!["a very long note that cannot possibly fit".to_string(), String::new()]);
        let doc = render_report(&Report::new("T").table(table), &Theme::default(), &PageGeometry::a4());
        assert!(doc.pages[0].texts().any(|t| t.ends_with("...")));
    }

    #[test]
    fn themes_share_pagination() {
        let report = Report::new("Portfolio")
            .kpi(Kpi::new("Claims", "10"))
            .section("Summary", "Summary:\n- one\n- two\n".repeat(30))
            .table(claims_table(40));
        let geometry = PageGeometry::letter();
        let docs: Vec<Document> = Theme::NAMES
            .iter()
            .filter_map(|name| Theme::by_name(name))
            .map(|theme| render_report(&report, &theme, &geometry))
            .collect();
        assert_eq!(docs.len(), 3);
        for doc in &docs[1..] {
            assert_eq!(doc.page_count(), docs[0].page_count());
            let rows: Vec<_> = doc.pages.iter().map(|p| p.rows.clone()).collect();
            let base: Vec<_> = docs[0].pages.iter().map(|p| p.rows.clone()).collect();
            assert_eq!(rows, base);
        }
        assert_ne!(docs[0], docs[1]);
    }

    #[test]
    fn zero_weights_split_evenly() {
        let widths = column_widths(&[Column::left("a", 0.0), Column::left("b", 0.0)], 100.0);
        assert_eq!(widths, vec![50.0, 50.0]);
    }
}
