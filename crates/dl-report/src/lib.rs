//! Paginated report layout and PDF output.
//!
//! Free text is classified line by line ([`classify_line`]), wrapped to the
//! column ([`wrap_to_width`]) and laid out onto pages by [`Layout`]. The
//! resulting [`Document`] is a display list that [`write_pdf`] serialises.

pub mod classify;
pub mod document;
pub mod layout;
pub mod measure;
pub mod pdf;
pub mod report;
pub mod theme;
pub mod wrap;

pub use classify::{classify_line, LineKind};
pub use document::{Document, DrawOp, Page, PageGeometry};
pub use layout::{finalize, layout_text, Chrome, Layout, LayoutCursor, LayoutMetrics};
pub use measure::{ApproxMetrics, Font, FontSpec, TextMeasure};
pub use pdf::write_pdf;
pub use report::{render_report, render_report_with, Align, Block, Column, Kpi, Report, Section, Table};
pub use theme::{Color, Theme};
pub use wrap::wrap_to_width;
