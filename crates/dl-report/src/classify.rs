//! Per-line classification of free text into layout row kinds.
//!
//! Classification is stateless: each line is judged on its own.

/// Lines ending in `:` shorter than this (in characters) are section headers.
pub const HEADER_MAX_CHARS: usize = 60;

const BULLET_MARKERS: [&str; 3] = ["- ", "* ", "• "];

/// The kind of a logical input line, with its display payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Header(String),
    Bullet(String),
    Numbered { number: String, text: String },
    Paragraph(String),
}

impl LineKind {
    /// Payload text, empty for blank lines.
    pub fn text(&self) -> &str {
        match self {
            Self::Blank => "",
            Self::Header(text) | Self::Bullet(text) | Self::Paragraph(text) => text,
            Self::Numbered { text, .. } => text,
        }
    }
}

/// Classify one line. Checks run blank, bullet, numbered, header, paragraph.
pub fn classify_line(line: &str) -> LineKind {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }

    for marker in BULLET_MARKERS {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            return LineKind::Bullet(strip_emphasis(rest.trim()));
        }
    }

    if let Some((number, rest)) = split_numbered(trimmed) {
        return LineKind::Numbered {
            number: number.to_string(),
            text: strip_emphasis(rest.trim()),
        };
    }

    if let Some(heading) = markdown_heading(trimmed) {
        return LineKind::Header(strip_emphasis(heading));
    }

    let text = strip_emphasis(trimmed);
    if text.ends_with(':') && text.chars().count() < HEADER_MAX_CHARS {
        return LineKind::Header(text);
    }

    LineKind::Paragraph(text)
}

/// `^\d+\.` split into the digits and the remainder after the dot.
fn split_numbered(line: &str) -> Option<(&str, &str)> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = line[digits..].strip_prefix('.')?;
    Some((&line[..digits], rest))
}

/// `# Title` .. `###### Title`.
fn markdown_heading(line: &str) -> Option<&str> {
    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = line[hashes..].strip_prefix(' ')?.trim();
    (!rest.is_empty()).then_some(rest)
}

/// Drop markdown `**bold**` / `__bold__` markers.
fn strip_emphasis(text: &str) -> String {
    text.replace("**", "").replace("__", "")
}
