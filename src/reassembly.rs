//! Fragment reassembly and text canonicalization.
//!
//! Generators split sensitive strings across show operators for kerning, so
//! per-run matching misses them. Runs are joined into two buffer variants:
//! packed (no separator at all) and text-object spaced (one space wherever a
//! new BT block begins). A phrase split mid-word is caught by the first; a
//! phrase split across layout blocks by the second.

use crate::content::TextRun;
use unicode_normalization::UnicodeNormalization;

/// How adjacent runs are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStyle {
    /// Concatenate runs with nothing between them.
    Packed,
    /// Insert a single space before each run that opens a text object.
    TextObjectSpaced,
}

/// Canonical form used for matching: NFKD-decomposed and lowercased.
/// Idempotent, so pattern and text can both go through it.
pub fn canonicalize(text: &str) -> String {
    text.nfkd().collect::<String>().to_lowercase()
}

/// Join text runs into a single buffer.
pub fn assemble(runs: &[TextRun], style: JoinStyle) -> String {
    let mut out = String::with_capacity(runs.iter().map(|r| r.text.len()).sum());
    for (i, run) in runs.iter().enumerate() {
        if style == JoinStyle::TextObjectSpaced && run.starts_text_object && i > 0 {
            out.push(' ');
        }
        out.push_str(&run.text);
    }
    out
}

/// A text payload ready for matching: the raw form plus its canonical form.
#[derive(Debug, Clone)]
pub struct ScanText {
    /// Text as extracted.
    pub raw: String,
    /// Canonicalized form.
    pub canonical: String,
}

impl ScanText {
    /// Canonicalize once at construction.
    pub fn new(raw: String) -> Self {
        let canonical = canonicalize(&raw);
        Self { raw, canonical }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Rect;

    fn run(text: &str, starts: bool) -> TextRun {
        TextRun {
            text: text.to_string(),
            font: "F1".to_string(),
            starts_text_object: starts,
            bbox: Rect::from_corners(0.0, 0.0, 1.0, 1.0),
        }
    }

    #[test]
    fn test_packed_rejoins_split_word() {
        let runs = vec![run("Se", true), run("cr", false), run("et", false)];
        assert_eq!(assemble(&runs, JoinStyle::Packed), "Secret");
    }

    #[test]
    fn test_spaced_inserts_at_text_object_boundary() {
        let runs = vec![run("John", true), run("Doe", true)];
        assert_eq!(assemble(&runs, JoinStyle::Packed), "JohnDoe");
        assert_eq!(assemble(&runs, JoinStyle::TextObjectSpaced), "John Doe");
    }

    #[test]
    fn test_spaced_never_leads_with_a_space() {
        let runs = vec![run("only", true)];
        assert_eq!(assemble(&runs, JoinStyle::TextObjectSpaced), "only");
    }

    #[test]
    fn test_canonicalize_folds_case_and_compatibility_forms() {
        // U+FB01 LATIN SMALL LIGATURE FI decomposes to "fi"
        assert_eq!(canonicalize("Con\u{FB01}dential"), "confidential");
        // Fullwidth letters decompose to ASCII
        assert_eq!(canonicalize("\u{FF33}\u{FF33}\u{FF2E}"), "ssn");
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        let once = canonicalize("Áffaire \u{FB02}agrante");
        assert_eq!(canonicalize(&once), once);
    }

    #[test]
    fn test_scan_text_pairs_forms() {
        let s = ScanText::new("SSN 123".to_string());
        assert_eq!(s.raw, "SSN 123");
        assert_eq!(s.canonical, "ssn 123");
    }
}
