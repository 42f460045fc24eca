//! Per-document analysis and verdicts.
//!
//! The verdict model is fail-closed: a file is Pass only when every surface
//! was read and scanned clean. Anything that prevented a full read is Error,
//! never Pass, because "could not check" and "checked clean" must stay
//! distinguishable to whoever ships the document.

use crate::content::{self, InterpretedContent};
use crate::denylist::{Denylist, Finding};
use crate::document::Document;
use crate::error::Error;
use crate::ocr::{self, OcrConfig, PageOcr};
use crate::reassembly::{assemble, JoinStyle, ScanText};
use crate::surfaces::{self, Surface, SurfaceKind, SurfacePayload};
use std::path::Path;

/// Outcome for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Every surface read and scanned clean.
    Pass,
    /// At least one denylist pattern matched.
    Fail,
    /// The document could not be fully audited.
    Error,
}

impl Verdict {
    /// Process exit code for this verdict.
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Pass => 0,
            Verdict::Fail => 1,
            Verdict::Error => 2,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verdict::Pass => "pass",
            Verdict::Fail => "fail",
            Verdict::Error => "error",
        };
        f.write_str(s)
    }
}

/// Analysis knobs shared by every file in a batch.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Escalate partial reads (undecodable streams, damaged content) from
    /// warnings to Error.
    pub strict: bool,
    /// OCR configuration.
    pub ocr: OcrConfig,
}

/// Full audit result for one document.
#[derive(Debug, serde::Serialize)]
pub struct DocumentReport {
    /// Path as given on the command line.
    pub path: String,
    /// The verdict.
    pub verdict: Verdict,
    /// All deduplicated findings.
    pub findings: Vec<Finding>,
    /// Non-fatal anomalies observed along the way.
    pub warnings: Vec<String>,
    /// How many surfaces were scanned.
    pub surfaces_checked: usize,
    /// True when at least one page went through OCR.
    pub ocr_performed: bool,
    /// Set when the verdict is Error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentReport {
    fn error(path: &str, message: String) -> Self {
        Self {
            path: path.to_string(),
            verdict: Verdict::Error,
            findings: Vec::new(),
            warnings: Vec::new(),
            surfaces_checked: 0,
            ocr_performed: false,
            error: Some(message),
        }
    }
}

/// Audit one file on disk.
pub fn analyze_file(
    path: &Path,
    denylist: &Denylist,
    options: &AnalysisOptions,
    engine: &dyn PageOcr,
) -> DocumentReport {
    let label = path.display().to_string();
    match std::fs::read(path) {
        Ok(data) => analyze_bytes(&label, data, denylist, options, engine),
        Err(e) => DocumentReport::error(&label, format!("cannot read file: {}", e)),
    }
}

/// Audit a document already in memory.
pub fn analyze_bytes(
    path: &str,
    data: Vec<u8>,
    denylist: &Denylist,
    options: &AnalysisOptions,
    engine: &dyn PageOcr,
) -> DocumentReport {
    log::debug!("auditing {}", path);
    let doc = match Document::from_bytes(data) {
        Ok(doc) => doc,
        Err(e @ Error::UnsupportedEncryption) => {
            return DocumentReport::error(path, e.to_string());
        },
        Err(e) => return DocumentReport::error(path, format!("unreadable document: {}", e)),
    };

    let enumeration = surfaces::enumerate(&doc);
    let mut warnings = enumeration.warnings;
    let mut findings: Vec<Finding> = Vec::new();
    let mut surfaces_checked = 0usize;
    let mut ocr_performed = false;
    let mut combined_text = String::new();

    for surface in &enumeration.surfaces {
        surfaces_checked += 1;
        match &surface.payload {
            SurfacePayload::PageContent {
                content,
                resources,
                page_index,
            } => {
                let interpreted = content::interpret(&doc, content, resources);
                scan_page(
                    denylist,
                    surface,
                    &interpreted,
                    &mut findings,
                    &mut combined_text,
                );
                collect_page_warnings(surface, content, &interpreted, &mut warnings);

                // Appearance streams share the page's pixels; the page's
                // own content decides whether it gets rasterized.
                if surface.kind == SurfaceKind::ContentStream
                    && ocr::page_needs_ocr(&options.ocr, &interpreted)
                {
                    match engine.recognize_page(&doc, *page_index, options.ocr.zoom) {
                        Ok(Some(text)) => {
                            ocr_performed = true;
                            surfaces_checked += 1;
                            let label = format!("page {} ocr", page_index + 1);
                            scan_text(
                                denylist,
                                SurfaceKind::OcrSynthetic,
                                &label,
                                text,
                                &mut findings,
                                &mut combined_text,
                            );
                        },
                        Ok(None) => {},
                        Err(e) => {
                            warnings.push(format!("page {} ocr failed: {}", page_index + 1, e));
                        },
                    }
                }
            },
            SurfacePayload::Text(text) => {
                scan_text(
                    denylist,
                    surface.kind,
                    &surface.label,
                    text.clone(),
                    &mut findings,
                    &mut combined_text,
                );
            },
            SurfacePayload::Bytes(bytes) => {
                let mined = surfaces::printable_runs(bytes);
                scan_text(
                    denylist,
                    surface.kind,
                    &surface.label,
                    mined,
                    &mut findings,
                    &mut combined_text,
                );
            },
        }
    }

    // Cross-surface pass: a phrase can straddle surfaces (page text
    // continuing into an annotation, say). Only genuinely new snippets
    // are attributed to "multiple surfaces".
    let combined = ScanText::new(combined_text);
    for hit in denylist.scan(None, "multiple surfaces", &combined) {
        let seen = findings
            .iter()
            .any(|f| f.pattern == hit.pattern && f.snippet == hit.snippet);
        if !seen {
            findings.push(hit);
        }
    }

    let verdict = if !findings.is_empty() {
        Verdict::Fail
    } else if options.strict && !warnings.is_empty() {
        Verdict::Error
    } else {
        Verdict::Pass
    };
    let error = match verdict {
        Verdict::Error => Some(format!(
            "strict mode: {} unresolved warning(s), first: {}",
            warnings.len(),
            warnings.first().map(String::as_str).unwrap_or("")
        )),
        _ => None,
    };

    DocumentReport {
        path: path.to_string(),
        verdict,
        findings,
        warnings,
        surfaces_checked,
        ocr_performed,
        error,
    }
}

fn scan_page(
    denylist: &Denylist,
    surface: &Surface,
    interpreted: &InterpretedContent,
    findings: &mut Vec<Finding>,
    combined: &mut String,
) {
    let packed = assemble(&interpreted.runs, JoinStyle::Packed);
    let spaced = assemble(&interpreted.runs, JoinStyle::TextObjectSpaced);
    push_text(combined, &spaced);

    // The spaced variant is authoritative for offsets; the packed variant
    // only contributes matches whose separators were squeezed out, so a
    // hit it shares with the spaced pass is the same match shifted.
    let mut hits = denylist.scan(Some(surface.kind), &surface.label, &ScanText::new(spaced));
    for hit in denylist.scan(Some(surface.kind), &surface.label, &ScanText::new(packed)) {
        let seen = hits
            .iter()
            .any(|f| f.pattern == hit.pattern && f.snippet == hit.snippet);
        if !seen {
            hits.push(hit);
        }
    }
    hits.sort_by(|a, b| (a.start, a.end).cmp(&(b.start, b.end)));

    for hit in hits {
        if !findings.contains(&hit) {
            findings.push(hit);
        }
    }
}

fn scan_text(
    denylist: &Denylist,
    kind: SurfaceKind,
    label: &str,
    text: String,
    findings: &mut Vec<Finding>,
    combined: &mut String,
) {
    if text.is_empty() {
        return;
    }
    push_text(combined, &text);
    let text = ScanText::new(text);
    for hit in denylist.scan(Some(kind), label, &text) {
        if !findings.contains(&hit) {
            findings.push(hit);
        }
    }
}

fn push_text(combined: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if !combined.is_empty() {
        combined.push('\n');
    }
    combined.push_str(text);
}

fn collect_page_warnings(
    surface: &Surface,
    content: &[u8],
    interpreted: &InterpretedContent,
    warnings: &mut Vec<String>,
) {
    for w in &interpreted.warnings {
        warnings.push(format!("{}: {}", surface.label, w));
    }
    if interpreted.ops == 0 && !content.iter().all(u8::is_ascii_whitespace) {
        warnings.push(format!("{}: no operators recovered", surface.label));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::NoOpOcr;

    fn denylist(patterns: &[&str]) -> Denylist {
        let owned: Vec<String> = patterns.iter().map(|s| s.to_string()).collect();
        Denylist::load(&owned, None).unwrap()
    }

    /// Single page with the given content stream.
    fn pdf_with_content(content: &str) -> Vec<u8> {
        let mut data = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        let bodies = vec![
            "1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n".to_string(),
            "2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n".to_string(),
            "3 0 obj\n<< /Type /Page /Parent 2 0 R /Contents 4 0 R /Resources << >> >>\nendobj\n"
                .to_string(),
            format!(
                "4 0 obj\n<< /Length {} >>\nstream\n{}\nendstream\nendobj\n",
                content.len(),
                content
            ),
        ];
        for body in &bodies {
            offsets.push(data.len());
            data.extend_from_slice(body.as_bytes());
        }
        let xref_off = data.len();
        data.extend_from_slice(b"xref\n0 5\n0000000000 65535 f \n");
        for off in &offsets {
            data.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes());
        }
        data.extend_from_slice(b"trailer\n<< /Size 5 /Root 1 0 R >>\n");
        data.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref_off).as_bytes());
        data
    }

    fn analyze(content: &str, patterns: &[&str]) -> DocumentReport {
        analyze_bytes(
            "test.pdf",
            pdf_with_content(content),
            &denylist(patterns),
            &AnalysisOptions::default(),
            &NoOpOcr,
        )
    }

    #[test]
    fn test_clean_page_passes() {
        let report = analyze("BT /F1 12 Tf (Routine memo) Tj ET", &["John Doe"]);
        assert_eq!(report.verdict, Verdict::Pass);
        assert!(report.findings.is_empty());
        assert!(report.surfaces_checked > 0);
    }

    #[test]
    fn test_visible_leak_fails() {
        let report = analyze("BT (Contact John Doe now) Tj ET", &["John Doe"]);
        assert_eq!(report.verdict, Verdict::Fail);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].surface, "page 1 content");
    }

    #[test]
    fn test_fragmented_leak_found_by_packed_buffer() {
        let report = analyze("BT [(John ) ] TJ [(Do) -20 (e)] TJ ET", &["John Doe"]);
        assert_eq!(report.verdict, Verdict::Fail);
    }

    #[test]
    fn test_leak_split_across_text_objects() {
        let report = analyze("BT (John) Tj ET BT (Doe) Tj ET", &["John Doe"]);
        assert_eq!(report.verdict, Verdict::Fail);
    }

    #[test]
    fn test_unreadable_bytes_are_an_error() {
        let report = analyze_bytes(
            "junk.pdf",
            b"this is not a pdf".to_vec(),
            &denylist(&["x"]),
            &AnalysisOptions::default(),
            &NoOpOcr,
        );
        assert_eq!(report.verdict, Verdict::Error);
        assert_eq!(report.verdict.exit_code(), 2);
        assert!(report.error.is_some());
    }

    #[test]
    fn test_strict_escalates_warnings() {
        // A page whose content is binary garbage recovers zero operators
        let report = analyze_bytes(
            "damaged.pdf",
            pdf_with_content("\u{7f}\u{7f}\u{7f}\u{7f}"),
            &denylist(&["John Doe"]),
            &AnalysisOptions {
                strict: true,
                ..AnalysisOptions::default()
            },
            &NoOpOcr,
        );
        assert_eq!(report.verdict, Verdict::Error);
    }

    #[test]
    fn test_non_strict_keeps_warnings_as_pass() {
        let report = analyze("\u{7f}\u{7f}\u{7f}\u{7f}", &["John Doe"]);
        assert_eq!(report.verdict, Verdict::Pass);
        assert!(!report.warnings.is_empty());
    }

    #[test]
    fn test_findings_not_double_counted_across_variants() {
        let report = analyze("BT (John Doe) Tj ET", &["John Doe"]);
        assert_eq!(report.findings.len(), 1);
    }

    #[test]
    fn test_finding_carries_offsets_and_kind() {
        let report = analyze("BT (Contact John Doe now) Tj ET", &["John Doe"]);
        let finding = &report.findings[0];
        assert_eq!(finding.kind, Some(SurfaceKind::ContentStream));
        assert_eq!(finding.start, 8);
        assert_eq!(finding.end, 16);
    }

    #[test]
    fn test_repeated_phrase_reported_per_offset() {
        let report = analyze("BT (John Doe met John Doe) Tj ET", &["John Doe"]);
        assert_eq!(report.findings.len(), 2);
        assert!(report.findings[0].start < report.findings[1].start);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Verdict::Pass.exit_code(), 0);
        assert_eq!(Verdict::Fail.exit_code(), 1);
        assert_eq!(Verdict::Error.exit_code(), 2);
    }
}
