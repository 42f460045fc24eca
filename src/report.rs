//! Report rendering: a colorized human summary and a stable JSON shape for
//! CI pipelines.

use crate::denylist::Finding;
use crate::verdict::{DocumentReport, Verdict};
use std::io::IsTerminal;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Whether stdout wants ANSI color: a terminal, and NO_COLOR unset.
pub fn should_colorize() -> bool {
    std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
}

/// Render the human-readable report.
pub fn render_text(reports: &[DocumentReport], color: bool) -> String {
    let paint = |code: &str, text: &str| {
        if color {
            format!("{}{}{}", code, text, RESET)
        } else {
            text.to_string()
        }
    };

    let mut out = String::new();
    for report in reports {
        let tag = match report.verdict {
            Verdict::Pass => paint(GREEN, "PASS "),
            Verdict::Fail => paint(RED, "FAIL "),
            Verdict::Error => paint(YELLOW, "ERROR"),
        };
        out.push_str(&format!("{} {}\n", tag, report.path));

        if let Some(error) = &report.error {
            out.push_str(&format!("        {}\n", error));
        }
        for finding in &report.findings {
            out.push_str(&format!(
                "        pattern {:?} in {} at {}..{}: {:?}\n",
                finding.pattern, finding.surface, finding.start, finding.end, finding.snippet
            ));
        }
        for warning in &report.warnings {
            out.push_str(&format!("        note: {}\n", warning));
        }
    }

    let passed = reports.iter().filter(|r| r.verdict == Verdict::Pass).count();
    let failed = reports.iter().filter(|r| r.verdict == Verdict::Fail).count();
    let errors = reports.iter().filter(|r| r.verdict == Verdict::Error).count();
    out.push_str(&paint(
        BOLD,
        &format!("{} passed, {} failed, {} errors\n", passed, failed, errors),
    ));
    out
}

#[derive(serde::Serialize)]
struct JsonReport<'a> {
    timestamp: String,
    summary: JsonSummary,
    files: Vec<JsonFile<'a>>,
}

#[derive(serde::Serialize)]
struct JsonSummary {
    total: usize,
    passed: usize,
    failed: usize,
    errors: usize,
}

#[derive(serde::Serialize)]
struct JsonFile<'a> {
    path: &'a str,
    status: Verdict,
    exit_code: i32,
    surfaces_checked: usize,
    ocr_performed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    matches: Vec<&'a Finding>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<&'a str>,
}

/// Render the machine-readable report.
pub fn render_json(reports: &[DocumentReport]) -> serde_json::Result<String> {
    let doc = JsonReport {
        timestamp: chrono::Utc::now().to_rfc3339(),
        summary: JsonSummary {
            total: reports.len(),
            passed: reports.iter().filter(|r| r.verdict == Verdict::Pass).count(),
            failed: reports.iter().filter(|r| r.verdict == Verdict::Fail).count(),
            errors: reports.iter().filter(|r| r.verdict == Verdict::Error).count(),
        },
        files: reports
            .iter()
            .map(|r| JsonFile {
                path: &r.path,
                status: r.verdict,
                exit_code: r.verdict.exit_code(),
                surfaces_checked: r.surfaces_checked,
                ocr_performed: r.ocr_performed,
                error: r.error.as_deref(),
                matches: r.findings.iter().collect(),
                warnings: r.warnings.iter().map(String::as_str).collect(),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surfaces::SurfaceKind;

    fn report(verdict: Verdict) -> DocumentReport {
        DocumentReport {
            path: "a.pdf".to_string(),
            verdict,
            findings: match verdict {
                Verdict::Fail => vec![Finding {
                    pattern: "John Doe".to_string(),
                    kind: Some(SurfaceKind::ContentStream),
                    surface: "page 1 content".to_string(),
                    snippet: "john doe".to_string(),
                    start: 8,
                    end: 16,
                }],
                _ => Vec::new(),
            },
            warnings: Vec::new(),
            surfaces_checked: 3,
            ocr_performed: false,
            error: match verdict {
                Verdict::Error => Some("unreadable document: bad xref".to_string()),
                _ => None,
            },
        }
    }

    #[test]
    fn test_text_report_plain() {
        let reports = vec![report(Verdict::Pass), report(Verdict::Fail)];
        let text = render_text(&reports, false);
        assert!(text.contains("PASS  a.pdf"));
        assert!(text.contains("FAIL  a.pdf"));
        assert!(text.contains("\"John Doe\""));
        assert!(text.contains("1 passed, 1 failed, 0 errors"));
        assert!(!text.contains("\x1b["));
    }

    #[test]
    fn test_text_report_colored() {
        let text = render_text(&[report(Verdict::Fail)], true);
        assert!(text.contains(RED));
        assert!(text.contains(RESET));
    }

    #[test]
    fn test_json_shape() {
        let reports = vec![report(Verdict::Fail), report(Verdict::Error)];
        let json = render_json(&reports).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["summary"]["total"], 2);
        assert_eq!(value["summary"]["failed"], 1);
        assert_eq!(value["summary"]["errors"], 1);
        assert_eq!(value["files"][0]["status"], "fail");
        assert_eq!(value["files"][0]["exit_code"], 1);
        assert_eq!(value["files"][0]["matches"][0]["pattern"], "John Doe");
        assert_eq!(value["files"][0]["matches"][0]["kind"], "content_stream");
        assert_eq!(value["files"][0]["matches"][0]["start"], 8);
        assert_eq!(value["files"][0]["matches"][0]["end"], 16);
        assert!(value["files"][0].get("error").is_none());
        assert_eq!(value["files"][1]["error"], "unreadable document: bad xref");
        assert!(value["timestamp"].is_string());
    }
}
