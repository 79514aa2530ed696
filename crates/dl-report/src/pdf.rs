//! Minimal PDF 1.4 serialisation of a [`Document`].
//!
//! Uses the base-14 Helvetica faces with WinAnsi encoding, so nothing is
//! embedded. Characters outside that encoding are written as `?`.

use std::io::{self, Write};

use tracing::debug;

use crate::document::{Document, DrawOp};
use crate::measure::Font;
use crate::theme::Color;

/// Control point offset for approximating a quarter circle with a cubic.
const KAPPA: f32 = 0.552_284_8;

const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const REGULAR_FONT_ID: usize = 3;
const BOLD_FONT_ID: usize = 4;
const FIRST_PAGE_ID: usize = 5;

/// Byte buffer that remembers where each object starts.
struct PdfBuffer {
    bytes: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfBuffer {
    fn new() -> Self {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            bytes,
            offsets: Vec::new(),
        }
    }

    fn object(&mut self, id: usize, body: &[u8]) {
        if self.offsets.len() < id {
            self.offsets.resize(id, 0);
        }
        self.offsets[id - 1] = self.bytes.len();
        self.bytes
            .extend_from_slice(format!("{id} 0 obj\n").as_bytes());
        self.bytes.extend_from_slice(body);
        self.bytes.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, id: usize, content: &[u8]) {
        let mut body = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(b"\nendstream");
        self.object(id, &body);
    }

    fn finish(mut self) -> Vec<u8> {
        let xref_at = self.bytes.len();
        let size = self.offsets.len() + 1;
        let mut xref = format!("xref\n0 {size}\n0000000000 65535 f \n");
        for offset in &self.offsets {
            xref.push_str(&format!("{offset:010} 00000 n \n"));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {size} /Root {CATALOG_ID} 0 R >>\nstartxref\n{xref_at}\n%%EOF\n"
        ));
        self.bytes.extend_from_slice(xref.as_bytes());
        self.bytes
    }
}

/// Serialise `doc` as a complete PDF file.
pub fn write_pdf<W: Write>(doc: &Document, mut out: W) -> io::Result<()> {
    let mut pdf = PdfBuffer::new();
    let page_ids: Vec<usize> = (0..doc.pages.len())
        .map(|i| FIRST_PAGE_ID + 2 * i)
        .collect();

    pdf.object(
        CATALOG_ID,
        format!("<< /Type /Catalog /Pages {PAGES_ID} 0 R >>").as_bytes(),
    );
    let kids: Vec<String> = page_ids.iter().map(|id| format!("{id} 0 R")).collect();
    pdf.object(
        PAGES_ID,
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            page_ids.len()
        )
        .as_bytes(),
    );
    pdf.object(REGULAR_FONT_ID, font_dict("Helvetica").as_bytes());
    pdf.object(BOLD_FONT_ID, font_dict("Helvetica-Bold").as_bytes());

    let height = doc.geometry.height;
    for (page, id) in doc.pages.iter().zip(&page_ids) {
        let content_id = id + 1;
        pdf.object(
            *id,
            format!(
                "<< /Type /Page /Parent {PAGES_ID} 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 {REGULAR_FONT_ID} 0 R /F2 {BOLD_FONT_ID} 0 R >> >> \
                 /Contents {content_id} 0 R >>",
                num(doc.geometry.width),
                num(height)
            )
            .as_bytes(),
        );
        let mut content = Vec::new();
        for op in &page.ops {
            write_op(&mut content, op, height);
        }
        pdf.stream(content_id, &content);
    }

    let bytes = pdf.finish();
    debug!(pages = doc.pages.len(), bytes = bytes.len(), "PDF serialised");
    out.write_all(&bytes)?;
    out.flush()
}

fn font_dict(base: &str) -> String {
    format!("<< /Type /Font /Subtype /Type1 /BaseFont /{base} /Encoding /WinAnsiEncoding >>")
}

fn write_op(out: &mut Vec<u8>, op: &DrawOp, page_height: f32) {
    let flip = |y: f32| page_height - y;
    let line = match op {
        DrawOp::Rect { x, y, w, h, color } => format!(
            "{} rg {} {} {} {} re f\n",
            rgb(*color),
            num(*x),
            num(flip(y + h)),
            num(*w),
            num(*h)
        ),
        DrawOp::Rule {
            x1,
            y1,
            x2,
            y2,
            width,
            color,
        } => format!(
            "{} RG {} w {} {} m {} {} l S\n",
            rgb(*color),
            num(*width),
            num(*x1),
            num(flip(*y1)),
            num(*x2),
            num(flip(*y2))
        ),
        DrawOp::Dot { cx, cy, r, color } => {
            format!("{} rg {}f\n", rgb(*color), circle_path(*cx, flip(*cy), *r))
        }
        DrawOp::Text {
            x,
            y,
            text,
            font,
            color,
        } => {
            let name = match font.font {
                Font::Regular => "F1",
                Font::Bold => "F2",
            };
            out.extend_from_slice(
                format!(
                    "BT /{name} {} Tf {} rg {} {} Td (",
                    num(font.size),
                    rgb(*color),
                    num(*x),
                    num(flip(*y))
                )
                .as_bytes(),
            );
            out.extend_from_slice(&encode_text(text));
            out.extend_from_slice(b") Tj ET\n");
            return;
        }
    };
    out.extend_from_slice(line.as_bytes());
}

/// Four cubic segments around `(cx, cy)` in PDF space.
fn circle_path(cx: f32, cy: f32, r: f32) -> String {
    let k = r * KAPPA;
    format!(
        "{} {} m {} {} {} {} {} {} c {} {} {} {} {} {} c {} {} {} {} {} {} c {} {} {} {} {} {} c ",
        num(cx + r),
        num(cy),
        num(cx + r),
        num(cy + k),
        num(cx + k),
        num(cy + r),
        num(cx),
        num(cy + r),
        num(cx - k),
        num(cy + r),
        num(cx - r),
        num(cy + k),
        num(cx - r),
        num(cy),
        num(cx - r),
        num(cy - k),
        num(cx - k),
        num(cy - r),
        num(cx),
        num(cy - r),
        num(cx + k),
        num(cy - r),
        num(cx + r),
        num(cy - k),
        num(cx + r),
        num(cy),
    )
}

fn rgb(color: Color) -> String {
    let (r, g, b) = color.unit();
    format!("{} {} {}", num(r), num(g), num(b))
}

/// Decimal with at most three places and no trailing zeros.
fn num(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let text = format!("{value:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Encode a string as escaped WinAnsi bytes for a literal string operand.
fn encode_text(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' | '(' | ')' => {
                bytes.push(b'\\');
                bytes.push(ch as u8);
            }
            '\t' => bytes.push(b' '),
            ' '..='~' => bytes.push(ch as u8),
            '\u{A0}'..='\u{FF}' => bytes.push(ch as u32 as u8),
            _ => bytes.push(win_ansi_extra(ch).unwrap_or(b'?')),
        }
    }
    bytes
}

/// WinAnsi code points in 0x80..0x9F that differ from Latin-1.
fn win_ansi_extra(ch: char) -> Option<u8> {
    Some(match ch {
        '€' => 0x80,
        '…' => 0x85,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '™' => 0x99,
        _ => return None,
    })
}
