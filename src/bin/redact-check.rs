//! Command-line front end.

use clap::Parser;
use redact_check::ocr::OcrMode;
use redact_check::{
    batch_exit_code, report, run_batch, AnalysisOptions, Denylist, NoOpOcr, OcrConfig,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

/// Audit redacted PDFs for text that should no longer be recoverable.
#[derive(Parser, Debug)]
#[command(name = "redact-check", version, about)]
struct Args {
    /// PDF files to audit.
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Denylisted phrase, repeatable. Matched case- and
    /// normalization-insensitively.
    #[arg(short = 'd', long = "deny", value_name = "PHRASE")]
    deny: Vec<String>,

    /// File of patterns, one per line. Lines starting with '#' are
    /// comments; a 'regex:' prefix marks a raw regular expression.
    #[arg(long = "denyfile", value_name = "PATH")]
    denyfile: Option<PathBuf>,

    /// Treat partially-readable files as errors instead of warnings.
    #[arg(long)]
    strict: bool,

    /// When to OCR pages: off, auto (on draw-over geometry), or always.
    #[arg(long, value_name = "MODE", default_value = "off",
          value_parser = ["off", "auto", "always"])]
    ocr: String,

    /// Emit the JSON report instead of text.
    #[arg(long)]
    json: bool,

    /// Worker threads for the batch.
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    jobs: Option<usize>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    if args.deny.is_empty() && args.denyfile.is_none() {
        eprintln!("error: no patterns given; use --deny or --denyfile");
        return ExitCode::from(2);
    }

    let denylist = match Denylist::load(&args.deny, args.denyfile.as_deref()) {
        Ok(list) => list,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(2);
        },
    };
    if denylist.is_empty() {
        eprintln!("error: pattern sources were empty");
        return ExitCode::from(2);
    }

    // The value_parser restricts the string, so this cannot fail
    let mode = OcrMode::from_str(&args.ocr).unwrap_or(OcrMode::Off);
    let options = AnalysisOptions {
        strict: args.strict,
        ocr: OcrConfig {
            mode,
            ..OcrConfig::default()
        },
    };

    let reports = run_batch(&args.files, &denylist, &options, &NoOpOcr, args.jobs);

    if args.json {
        match report::render_json(&reports) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("error: cannot serialize report: {}", e);
                return ExitCode::from(2);
            },
        }
    } else {
        print!("{}", report::render_text(&reports, report::should_colorize()));
    }

    ExitCode::from(batch_exit_code(&reports).clamp(0, 255) as u8)
}
