//! Redaction leak auditor for PDF files.
//!
//! Checks whether denylisted text is still recoverable from a "redacted"
//! PDF. Extraction is exhaustive rather than faithful: page content is
//! interpreted with fragment reassembly, and annotations, form fields,
//! metadata, layers, embedded files, and unreferenced streams are all
//! scanned, visible or not. Verdicts are fail-closed; a file the auditor
//! cannot fully read is never reported clean.
//!
//! ```no_run
//! use redact_check::{AnalysisOptions, Denylist, NoOpOcr};
//!
//! let denylist = Denylist::load(&["John Doe".to_string()], None)?;
//! let report = redact_check::analyze_file(
//!     std::path::Path::new("filing.pdf"),
//!     &denylist,
//!     &AnalysisOptions::default(),
//!     &NoOpOcr,
//! );
//! println!("{}: {}", report.path, report.verdict);
//! # Ok::<(), redact_check::Error>(())
//! ```

pub mod batch;
pub mod content;
pub mod decoders;
pub mod denylist;
pub mod document;
pub mod error;
pub mod fonts;
pub mod lexer;
pub mod object;
pub mod objstm;
pub mod ocr;
pub mod parser;
pub mod reassembly;
pub mod report;
pub mod surfaces;
pub mod verdict;
pub mod xref;

pub use batch::{batch_exit_code, run as run_batch};
pub use denylist::{Denylist, Finding, Match, Matcher};
pub use document::Document;
pub use error::{Error, Result};
pub use object::{Object, ObjectRef};
pub use ocr::{NoOpOcr, OcrConfig, OcrMode, PageOcr};
pub use surfaces::SurfaceKind;
pub use verdict::{analyze_bytes, analyze_file, AnalysisOptions, DocumentReport, Verdict};
