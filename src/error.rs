//! Error types for the redaction auditor.
//!
//! The taxonomy mirrors the verdict model: parse-class errors mean the
//! document could not be read to a trustworthy completion and always surface
//! as an Error verdict; pattern and denylist errors are configuration
//! problems that abort the whole invocation before any document is opened.

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while auditing a document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The '%PDF-' marker was not found near the start of the file
    #[error("Invalid PDF header: '%PDF-' marker not found")]
    InvalidHeader,

    /// Parse failure at a specific byte offset
    #[error("Failed to parse object at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where the failure occurred
        offset: usize,
        /// What went wrong
        reason: String,
    },

    /// The cross-reference structure could not be located or read
    #[error("Invalid cross-reference table")]
    InvalidXref,

    /// The file ends before a structure it promises
    #[error("File truncated: {0}")]
    TruncatedFile(String),

    /// The trailer carries /Encrypt. This tool is analyze-only and exposes
    /// no credential mechanism, so an encrypted document is unreadable by
    /// definition and fails closed.
    #[error("Document is encrypted and cannot be audited without credentials")]
    UnsupportedEncryption,

    /// Invalid PDF structure (generic)
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// Stream decoding failure
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// A filter this tool does not implement
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// A denylist pattern failed to compile
    #[error("Invalid denylist pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern as authored
        pattern: String,
        /// Compiler message
        reason: String,
    },

    /// The denylist file could not be read
    #[error("Cannot read denylist file '{path}': {reason}")]
    DenylistFile {
        /// Path as given on the command line
        path: String,
        /// Underlying reason
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is a global configuration problem that must abort
    /// the whole invocation rather than fail a single document.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::InvalidPattern { .. } | Error::DenylistFile { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encryption_error_message() {
        let err = Error::UnsupportedEncryption;
        let msg = format!("{}", err);
        assert!(msg.contains("encrypted"));
    }

    #[test]
    fn test_parse_error_carries_offset() {
        let err = Error::ParseError {
            offset: 512,
            reason: "unexpected token".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("512"));
        assert!(msg.contains("unexpected token"));
    }

    #[test]
    fn test_invalid_pattern_error() {
        let err = Error::InvalidPattern {
            pattern: "regex:[".to_string(),
            reason: "unclosed character class".to_string(),
        };
        assert!(err.is_config_error());
        assert!(format!("{}", err).contains("regex:["));
    }

    #[test]
    fn test_parse_errors_are_not_config_errors() {
        assert!(!Error::InvalidXref.is_config_error());
        assert!(!Error::UnsupportedEncryption.is_config_error());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
