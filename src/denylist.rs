//! Denylist patterns and matching.
//!
//! Literal patterns are canonicalization-aware: the pattern itself is
//! canonicalized, whitespace between its tokens matches any whitespace run,
//! and matching happens against the canonical buffer. Regex patterns run
//! exactly as authored, against both the raw and canonical buffers; authors
//! who write case-sensitive regexes get case-sensitive behavior, and the
//! canonical pass still catches compatibility-form evasion.

use crate::error::{Error, Result};
use crate::reassembly::{canonicalize, ScanText};
use crate::surfaces::SurfaceKind;
use regex::{Regex, RegexBuilder};
use std::path::Path;

/// Longest snippet carried into a finding.
const SNIPPET_LIMIT: usize = 120;

/// One pattern hit in one surface.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Finding {
    /// Pattern as the user wrote it.
    pub pattern: String,
    /// Kind of the surface the match was found in. Absent for matches that
    /// straddle surfaces and only appear in the combined pass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<SurfaceKind>,
    /// Label of the surface it matched in.
    pub surface: String,
    /// The matched text, truncated.
    pub snippet: String,
    /// Byte offset where the match starts in the scanned buffer.
    pub start: usize,
    /// Byte offset just past the match.
    pub end: usize,
}

/// One matcher hit, before surface attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// The matched text, truncated.
    pub snippet: String,
    /// Byte range of the match within the scanned buffer.
    pub start: usize,
    /// End of that range.
    pub end: usize,
}

/// A compiled denylist pattern.
pub trait Matcher: Send + Sync {
    /// Pattern as authored.
    fn pattern(&self) -> &str;

    /// All matches in the given text, with offsets.
    fn find_all(&self, text: &ScanText) -> Vec<Match>;
}

struct LiteralMatcher {
    pattern: String,
    regex: Regex,
}

impl LiteralMatcher {
    fn compile(pattern: &str) -> Result<Self> {
        let canonical = canonicalize(pattern);
        let tokens: Vec<String> = canonical
            .split_whitespace()
            .map(|t| regex::escape(t))
            .collect();
        if tokens.is_empty() {
            return Err(Error::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "pattern is empty".to_string(),
            });
        }
        let source = tokens.join(r"\s+");
        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }
}

impl Matcher for LiteralMatcher {
    fn pattern(&self) -> &str {
        &self.pattern
    }

    fn find_all(&self, text: &ScanText) -> Vec<Match> {
        self.regex
            .find_iter(&text.canonical)
            .map(|m| Match {
                snippet: snippet(m.as_str()),
                start: m.start(),
                end: m.end(),
            })
            .collect()
    }
}

struct RegexMatcher {
    pattern: String,
    regex: Regex,
}

impl RegexMatcher {
    fn compile(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }
}

impl Matcher for RegexMatcher {
    fn pattern(&self) -> &str {
        &self.pattern
    }

    fn find_all(&self, text: &ScanText) -> Vec<Match> {
        let mut hits: Vec<Match> = self
            .regex
            .find_iter(&text.raw)
            .chain(self.regex.find_iter(&text.canonical))
            .map(|m| Match {
                snippet: snippet(m.as_str()),
                start: m.start(),
                end: m.end(),
            })
            .collect();
        hits.sort_by(|a, b| (a.start, a.end, &a.snippet).cmp(&(b.start, b.end, &b.snippet)));
        hits.dedup();
        hits
    }
}

fn snippet(matched: &str) -> String {
    if matched.len() <= SNIPPET_LIMIT {
        return matched.to_string();
    }
    let mut end = SNIPPET_LIMIT;
    while !matched.is_char_boundary(end) {
        end -= 1;
    }
    matched[..end].to_string()
}

/// The compiled set of patterns to audit against.
pub struct Denylist {
    matchers: Vec<Box<dyn Matcher>>,
}

impl Denylist {
    /// Compile literal patterns given on the command line plus an optional
    /// pattern file. All compilation errors fire before any document is
    /// opened.
    pub fn load(literals: &[String], file: Option<&Path>) -> Result<Self> {
        let mut matchers: Vec<Box<dyn Matcher>> = Vec::new();

        for pattern in literals {
            matchers.push(Box::new(LiteralMatcher::compile(pattern)?));
        }

        if let Some(path) = file {
            let body = std::fs::read_to_string(path).map_err(|e| Error::DenylistFile {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            for line in body.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some(expr) = line.strip_prefix("regex:") {
                    matchers.push(Box::new(RegexMatcher::compile(expr.trim())?));
                } else {
                    matchers.push(Box::new(LiteralMatcher::compile(line)?));
                }
            }
        }

        Ok(Self { matchers })
    }

    /// Number of compiled patterns.
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    /// True when no patterns were given.
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Scan one surface's text, producing deduplicated findings ordered by
    /// match offset.
    pub fn scan(&self, kind: Option<SurfaceKind>, surface: &str, text: &ScanText) -> Vec<Finding> {
        let mut findings = Vec::new();
        for matcher in &self.matchers {
            for hit in matcher.find_all(text) {
                let finding = Finding {
                    pattern: matcher.pattern().to_string(),
                    kind,
                    surface: surface.to_string(),
                    snippet: hit.snippet,
                    start: hit.start,
                    end: hit.end,
                };
                if !findings.contains(&finding) {
                    findings.push(finding);
                }
            }
        }
        findings.sort_by(|a, b| (a.start, a.end).cmp(&(b.start, b.end)));
        findings
    }
}
