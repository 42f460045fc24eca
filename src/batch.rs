//! Batch orchestration.
//!
//! Files are audited in parallel with bounded concurrency, results come
//! back in input order, and a panic while parsing one hostile file becomes
//! that file's Error instead of taking the process down.

use crate::denylist::Denylist;
use crate::ocr::PageOcr;
use crate::verdict::{analyze_file, AnalysisOptions, DocumentReport, Verdict};
use rayon::prelude::*;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;

/// Audit a batch of files. `jobs` caps worker threads; `None` leaves the
/// choice to the thread pool.
pub fn run(
    paths: &[PathBuf],
    denylist: &Denylist,
    options: &AnalysisOptions,
    engine: &dyn PageOcr,
    jobs: Option<usize>,
) -> Vec<DocumentReport> {
    let audit = |path: &PathBuf| -> DocumentReport {
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            analyze_file(path, denylist, options, engine)
        }));
        match result {
            Ok(report) => report,
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                log::error!("panic while auditing {}: {}", path.display(), detail);
                DocumentReport {
                    path: path.display().to_string(),
                    verdict: Verdict::Error,
                    findings: Vec::new(),
                    warnings: Vec::new(),
                    surfaces_checked: 0,
                    ocr_performed: false,
                    error: Some(format!("internal error: {}", detail)),
                }
            },
        }
    };

    match jobs {
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(n.max(1)).build();
            match pool {
                Ok(pool) => pool.install(|| paths.par_iter().map(audit).collect()),
                Err(e) => {
                    log::warn!("thread pool setup failed ({}), running sequentially", e);
                    paths.iter().map(audit).collect()
                },
            }
        },
        None => paths.par_iter().map(audit).collect(),
    }
}

/// Exit code for a whole batch: the worst per-file code, Error over Fail
/// over Pass.
pub fn batch_exit_code(reports: &[DocumentReport]) -> i32 {
    reports
        .iter()
        .map(|r| r.verdict.exit_code())
        .max()
        .unwrap_or(0)
}
