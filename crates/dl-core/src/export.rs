//! PDF export of Oracle replies and portfolio reports, plus the portfolio
//! workbook.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use dl_protocol::{Bucket, ClaimRecord, PortfolioSnapshot};
use dl_report::{
    layout_text, render_report, write_pdf, ApproxMetrics, Chrome, Color, Column, Document, Kpi,
    LayoutMetrics, PageGeometry, Report, Table, Theme,
};
use rust_xlsxwriter::{Format, FormatBorder, Workbook, Worksheet, XlsxError};
use thiserror::Error;
use tracing::debug;

const REPLY_TITLE: &str = "Oracle Analysis";
const FOOTER: &str = "DocketLens \u{b7} Confidential";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export")]
    Empty,
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },
}

/// `<prefix>-YYYY-MM-DD.pdf`
pub fn export_filename(prefix: &str, date: NaiveDate) -> String {
    dated_filename(prefix, date, "pdf")
}

fn dated_filename(prefix: &str, date: NaiveDate, extension: &str) -> String {
    format!("{prefix}-{}.{extension}", date.format("%Y-%m-%d"))
}

/// Lowercase ASCII words joined by `-`.
pub fn slug(title: &str) -> String {
    let words: Vec<String> = title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    if words.is_empty() {
        "report".to_string()
    } else {
        words.join("-")
    }
}

fn subtitle(date: NaiveDate) -> String {
    format!("Generated {}", date.format("%B %-d, %Y"))
}

/// Lay out an assistant reply and write it as `oracle-analysis-<date>.pdf`.
pub fn export_reply(
    text: &str,
    theme: &Theme,
    geometry: &PageGeometry,
    dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf, ExportError> {
    if text.trim().is_empty() {
        return Err(ExportError::Empty);
    }
    let chrome = Chrome::new(REPLY_TITLE)
        .with_subtitle(subtitle(date))
        .with_footer(FOOTER);
    let doc = layout_text(
        text,
        *geometry,
        LayoutMetrics::default(),
        theme,
        &chrome,
        &ApproxMetrics::default(),
    );
    let path = dir.join(export_filename("oracle-analysis", date));
    write_document(&doc, &path)?;
    Ok(path)
}

/// Render a declarative report and write it as `<slug>-<date>.pdf`.
pub fn export_report(
    report: &Report,
    theme: &Theme,
    geometry: &PageGeometry,
    dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf, ExportError> {
    let doc = render_report(report, theme, geometry);
    let path = dir.join(export_filename(&slug(&report.title), date));
    write_document(&doc, &path)?;
    Ok(path)
}

fn write_document(doc: &Document, path: &Path) -> Result<(), ExportError> {
    let io_err = |source: io::Error| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = File::create(path).map_err(io_err)?;
    write_pdf(doc, BufWriter::new(file)).map_err(io_err)?;
    debug!(path = %path.display(), pages = doc.page_count(), "exported PDF");
    Ok(())
}

const MONEY_FORMAT: &str = "$#,##0";
const CLAIM_HEADERS: [&str; 10] = [
    "Claim", "Claimant", "Category", "Status", "Venue", "Counsel", "Reserve", "Paid",
    "Exposure", "Opened",
];
const BUCKET_HEADERS: [&str; 4] = ["Claims", "Reserve", "Paid", "Exposure"];

/// Cell formats derived from a theme. Index 0 and 1 are the two row bands.
struct Styles {
    header: Format,
    text: [Format; 2],
    count: [Format; 2],
    money: [Format; 2],
}

impl Styles {
    fn new(theme: &Theme) -> Self {
        let band = |fill: Color| {
            Format::new()
                .set_font_color(xlsx_color(theme.text))
                .set_background_color(xlsx_color(fill))
        };
        let bands = [theme.band_even, theme.band_odd];
        Self {
            header: Format::new()
                .set_bold()
                .set_font_color(xlsx_color(theme.header_text))
                .set_background_color(xlsx_color(theme.header_fill))
                .set_border_bottom(FormatBorder::Medium)
                .set_border_bottom_color(xlsx_color(theme.accent)),
            text: bands.map(band),
            count: bands.map(|fill| band(fill).set_num_format("#,##0")),
            money: bands.map(|fill| band(fill).set_num_format(MONEY_FORMAT)),
        }
    }
}

fn xlsx_color(color: Color) -> rust_xlsxwriter::Color {
    let Color(r, g, b) = color;
    rust_xlsxwriter::Color::RGB(u32::from(r) << 16 | u32::from(g) << 8 | u32::from(b))
}

fn header_row(
    sheet: &mut Worksheet,
    headers: &[&str],
    styles: &Styles,
) -> Result<(), XlsxError> {
    for (col, header) in (0u16..).zip(headers) {
        sheet.write_string_with_format(0, col, *header, &styles.header)?;
    }
    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

fn summary_sheet(snapshot: &PortfolioSnapshot, styles: &Styles) -> Result<Worksheet, XlsxError> {
    let totals = &snapshot.totals;
    let mut sheet = Worksheet::new();
    sheet.set_name("Summary")?;
    header_row(&mut sheet, &["Metric", "Value"], styles)?;
    sheet.set_column_width(0, 22)?;
    sheet.set_column_width(1, 18)?;

    let counts = [
        ("Total claims", totals.claims),
        ("Open", totals.open),
        ("Litigated", totals.litigated),
    ];
    let amounts = [
        ("Reserve", totals.reserve),
        ("Paid", totals.paid),
        ("Exposure", totals.exposure),
    ];
    let mut row = 1u32;
    for (label, value) in counts {
        let band = (row as usize - 1) % 2;
        sheet.write_string_with_format(row, 0, label, &styles.text[band])?;
        sheet.write_number_with_format(row, 1, value as f64, &styles.count[band])?;
        row += 1;
    }
    for (label, value) in amounts {
        let band = (row as usize - 1) % 2;
        sheet.write_string_with_format(row, 0, label, &styles.text[band])?;
        sheet.write_number_with_format(row, 1, value, &styles.money[band])?;
        row += 1;
    }
    Ok(sheet)
}

fn bucket_sheet(
    name: &str,
    key_header: &str,
    buckets: &[(&String, &Bucket)],
    styles: &Styles,
) -> Result<Worksheet, XlsxError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(name)?;
    let mut headers = vec![key_header];
    headers.extend(BUCKET_HEADERS);
    header_row(&mut sheet, &headers, styles)?;
    sheet.set_column_width(0, 28)?;
    for col in 1..=4 {
        sheet.set_column_width(col, 16)?;
    }

    for (row, (key, bucket)) in (1u32..).zip(buckets) {
        let band = (row as usize - 1) % 2;
        sheet.write_string_with_format(row, 0, key.as_str(), &styles.text[band])?;
        sheet.write_number_with_format(row, 1, bucket.count as f64, &styles.count[band])?;
        sheet.write_number_with_format(row, 2, bucket.reserve, &styles.money[band])?;
        sheet.write_number_with_format(row, 3, bucket.paid, &styles.money[band])?;
        sheet.write_number_with_format(row, 4, bucket.exposure, &styles.money[band])?;
    }
    Ok(sheet)
}

fn claims_sheet(
    name: &str,
    claims: &[ClaimRecord],
    styles: &Styles,
) -> Result<Worksheet, XlsxError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(name)?;
    header_row(&mut sheet, &CLAIM_HEADERS, styles)?;
    for (col, width) in (0u16..).zip([12, 24, 14, 11, 24, 20, 14, 14, 14, 12]) {
        sheet.set_column_width(col, width)?;
    }

    for (row, claim) in (1u32..).zip(claims) {
        let band = (row as usize - 1) % 2;
        let text = &styles.text[band];
        let money = &styles.money[band];
        sheet.write_string_with_format(row, 0, &claim.id, text)?;
        sheet.write_string_with_format(row, 1, &claim.claimant, text)?;
        sheet.write_string_with_format(row, 2, &claim.category, text)?;
        sheet.write_string_with_format(row, 3, claim.status.label(), text)?;
        sheet.write_string_with_format(row, 4, &claim.venue, text)?;
        sheet.write_string_with_format(row, 5, &claim.counsel, text)?;
        sheet.write_number_with_format(row, 6, claim.reserve, money)?;
        sheet.write_number_with_format(row, 7, claim.paid, money)?;
        sheet.write_number_with_format(row, 8, claim.exposure, money)?;
        sheet.write_string_with_format(row, 9, &claim.opened, text)?;
    }
    Ok(sheet)
}

fn build_workbook(snapshot: &PortfolioSnapshot, theme: &Theme) -> Result<Workbook, XlsxError> {
    let styles = Styles::new(theme);
    let mut workbook = Workbook::new();
    workbook.push_worksheet(summary_sheet(snapshot, &styles)?);
    workbook.push_worksheet(bucket_sheet(
        "By category",
        "Category",
        &by_exposure(&snapshot.by_category),
        &styles,
    )?);
    workbook.push_worksheet(bucket_sheet(
        "By status",
        "Status",
        &by_exposure(&snapshot.by_status),
        &styles,
    )?);
    workbook.push_worksheet(bucket_sheet(
        "By venue",
        "Venue",
        &by_exposure(&snapshot.by_venue),
        &styles,
    )?);
    workbook.push_worksheet(claims_sheet("Top exposures", &snapshot.top_exposures, &styles)?);
    workbook.push_worksheet(claims_sheet("Sample", &snapshot.sample, &styles)?);
    Ok(workbook)
}

/// Write the snapshot as `portfolio-workbook-<date>.xlsx`: a summary sheet,
/// one sheet per breakdown, the top exposures and the record sample.
pub fn export_workbook(
    snapshot: &PortfolioSnapshot,
    theme: &Theme,
    dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf, ExportError> {
    let path = dir.join(dated_filename("portfolio-workbook", date, "xlsx"));
    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let workbook_err = |source: XlsxError| ExportError::Workbook {
        path: path.clone(),
        source,
    };
    let mut workbook = build_workbook(snapshot, theme).map_err(workbook_err)?;
    workbook.save(&path).map_err(workbook_err)?;
    debug!(path = %path.display(), sheets = 6, "exported workbook");
    Ok(path)
}

/// Whole dollars with thousands separators.
pub fn money(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

fn breakdown_table(title: &str, key_header: &str, buckets: &[(&String, &Bucket)]) -> Table {
    let mut table = Table::new(
        title,
        vec![
            Column::left(key_header, 3.0),
            Column::right("Claims", 1.0),
            Column::right("Reserve", 2.0),
            Column::right("Paid", 2.0),
            Column::right("Exposure", 2.0),
        ],
    );
    for (key, bucket) in buckets {
        table = table.row(vec![
            (*key).clone(),
            bucket.count.to_string(),
            money(bucket.reserve),
            money(bucket.paid),
            money(bucket.exposure),
        ]);
    }
    table
}

fn by_exposure<'a>(
    map: &'a std::collections::BTreeMap<String, Bucket>,
) -> Vec<(&'a String, &'a Bucket)> {
    let mut rows: Vec<_> = map.iter().collect();
    rows.sort_by(|a, b| b.1.exposure.total_cmp(&a.1.exposure));
    rows
}

/// KPI cards plus breakdown tables for a portfolio snapshot.
pub fn portfolio_report(snapshot: &PortfolioSnapshot, date: NaiveDate) -> Report {
    let totals = &snapshot.totals;
    let active = totals.open + totals.litigated;
    let litigated_share = if active == 0 {
        0.0
    } else {
        totals.litigated as f64 * 100.0 / active as f64
    };

    let mut report = Report::new("Portfolio Overview")
        .with_subtitle(subtitle(date))
        .with_footer(FOOTER)
        .kpi(Kpi::new("Total claims", totals.claims.to_string()))
        .kpi(Kpi::new("Open", totals.open.to_string()))
        .kpi(
            Kpi::new("Litigated", totals.litigated.to_string())
                .with_note(format!("{litigated_share:.0}% of active")),
        )
        .kpi(Kpi::new("Reserve", money(totals.reserve)))
        .kpi(Kpi::new("Paid", money(totals.paid)))
        .kpi(Kpi::new("Exposure", money(totals.exposure)));

    report = report.section("Highlights", highlights(snapshot, litigated_share));

    if !snapshot.top_exposures.is_empty() {
        let mut table = Table::new(
            "Top exposures",
            vec![
                Column::left("Claim", 2.0),
                Column::left("Claimant", 3.0),
                Column::left("Category", 2.0),
                Column::left("Status", 1.5),
                Column::left("Venue", 3.0),
                Column::right("Exposure", 2.0),
            ],
        );
        for claim in &snapshot.top_exposures {
            table = table.row(vec![
                claim.id.clone(),
                claim.claimant.clone(),
                claim.category.clone(),
                claim.status.label().to_string(),
                claim.venue.clone(),
                money(claim.exposure),
            ]);
        }
        report = report.table(table);
    }
    if !snapshot.by_category.is_empty() {
        report = report.table(breakdown_table(
            "By category",
            "Category",
            &by_exposure(&snapshot.by_category),
        ));
    }
    if !snapshot.by_status.is_empty() {
        report = report.table(breakdown_table(
            "By status",
            "Status",
            &by_exposure(&snapshot.by_status),
        ));
    }
    if !snapshot.by_venue.is_empty() {
        report = report.table(breakdown_table(
            "By venue",
            "Venue",
            &by_exposure(&snapshot.by_venue),
        ));
    }
    report
}

fn highlights(snapshot: &PortfolioSnapshot, litigated_share: f64) -> String {
    let totals = &snapshot.totals;
    if totals.claims == 0 {
        return "No claims loaded.".to_string();
    }
    let mut lines = vec![format!(
        "- {} claims with {} total exposure and {} in reserve.",
        totals.claims,
        money(totals.exposure),
        money(totals.reserve)
    )];
    if let Some((category, bucket)) = by_exposure(&snapshot.by_category).first() {
        lines.push(format!(
            "- Largest category by exposure: {category} ({} claims, {}).",
            bucket.count,
            money(bucket.exposure)
        ));
    }
    if let Some((venue, bucket)) = by_exposure(&snapshot.by_venue).first() {
        lines.push(format!(
            "- Most exposed venue: {venue} ({}).",
            money(bucket.exposure)
        ));
    }
    lines.push(format!(
        "- Litigated matters are {litigated_share:.0}% of active claims."
    ));
    lines.join("\n")
}
