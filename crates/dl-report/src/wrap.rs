//! Greedy word wrapping against a measured column width.

use crate::measure::{FontSpec, TextMeasure};

/// Wrap `text` into lines no wider than `column_width` points.
///
/// Whitespace runs collapse to single spaces. A word is only split when it
/// alone is wider than the column; a single glyph wider than the column is
/// placed on a line by itself. Always returns at least one (possibly empty)
/// line.
pub fn wrap_to_width(
    text: &str,
    column_width: f32,
    measure: &dyn TextMeasure,
    spec: FontSpec,
) -> Vec<String> {
    if !(column_width > 0.0) {
        return vec![text.split_whitespace().collect::<Vec<_>>().join(" ")];
    }

    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() {
            let candidate = format!("{current} {word}");
            if measure.width(&candidate, spec) <= column_width {
                current = candidate;
                continue;
            }
            lines.push(std::mem::take(&mut current));
        }

        if measure.width(word, spec) > column_width {
            let mut pieces = break_word(word, column_width, measure, spec);
            // The tail of a broken word can share its line with what follows.
            current = pieces.pop().unwrap_or_default();
            lines.extend(pieces);
        } else {
            current = word.to_string();
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Split an over-wide word into column-sized pieces by character.
fn break_word(word: &str, column_width: f32, measure: &dyn TextMeasure, spec: FontSpec) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();

    for ch in word.chars() {
        piece.push(ch);
        if piece.chars().count() > 1 && measure.width(&piece, spec) > column_width {
            piece.pop();
            pieces.push(std::mem::take(&mut piece));
            piece.push(ch);
        }
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::ApproxMetrics;

    /// One point per character at any size.
    struct Mono;

    impl TextMeasure for Mono {
        fn width(&self, text: &str, _spec: FontSpec) -> f32 {
            text.chars().count() as f32
        }
    }

    fn wrap(text: &str, width: f32) -> Vec<String> {
        wrap_to_width(text, width, &Mono, FontSpec::regular(10.0))
    }

    #[test]
    fn short_text_is_one_line() {
        assert_eq!(wrap("reserve adequacy", 40.0), vec!["reserve adequacy"]);
    }

    #[test]
    fn greedy_breaks_at_spaces() {
        assert_eq!(
            wrap("the quick brown fox jumps over", 10.0),
            vec!["the quick", "brown fox", "jumps over"]
        );
    }

    #[test]
    fn exact_fit_stays_on_line() {
        assert_eq!(wrap("abcde fghij", 11.0), vec!["abcde fghij"]);
        assert_eq!(wrap("abcde fghij", 10.0), vec!["abcde", "fghij"]);
    }

    #[test]
    fn words_are_not_split_when_they_fit() {
        for line in wrap("litigation exposure concentrated in venue", 12.0) {
            assert!(!line.is_empty());
            assert!(line.chars().count() <= 12, "{line}");
        }
        let joined = wrap("litigation exposure concentrated", 12.0).join(" ");
        assert_eq!(joined, "litigation exposure concentrated");
    }

    #[test]
    fn oversized_word_is_broken() {
        assert_eq!(
            wrap("supercalifragilistic ok", 8.0),
            vec!["supercal", "ifragili", "stic ok"]
        );
    }

    #[test]
    fn glyph_wider_than_column_terminates() {
        let lines = wrap("abc", 0.5);
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_and_whitespace_give_one_empty_line() {
        assert_eq!(wrap("", 10.0), vec![""]);
        assert_eq!(wrap("   ", 10.0), vec![""]);
    }

    #[test]
    fn non_positive_width_does_not_wrap() {
        assert_eq!(wrap("a  b", 0.0), vec!["a b"]);
        assert_eq!(wrap("a b", f32::NAN), vec!["a b"]);
    }

    #[test]
    fn restartable() {
        let first = wrap("alpha beta gamma", 10.0);
        let _ = wrap("something else entirely", 5.0);
        assert_eq!(wrap("alpha beta gamma", 10.0), first);
    }

    #[test]
    fn approx_metrics_fit_column() {
        let m = ApproxMetrics::default();
        let spec = FontSpec::regular(10.0);
        let text = "Open litigated matters in Cook County carry the highest average exposure";
        for line in wrap_to_width(text, 120.0, &m, spec) {
            assert!(m.width(&line, spec) <= 120.0, "{line}");
        }
    }
}
