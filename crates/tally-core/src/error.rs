//! Error types for the tally-core library.

use thiserror::Error;

/// Main error type for the tally library.
#[derive(Error, Debug)]
pub enum TallyError {
    /// Receipt extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON input or configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to receipt field extraction.
///
/// Noisy OCR never produces one of these: unparseable numerals, missed
/// tables and missing fields are reported as warnings on the result. Only a
/// broken upstream contract is an error.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The OCR collaborator handed over neither lines nor text.
    #[error("no OCR lines or text supplied")]
    NoInput,

    /// A line carries a confidence outside [0, 1] or a degenerate box.
    #[error("invalid OCR line {index}: {reason}")]
    InvalidLine { index: usize, reason: String },
}

/// Result type for the tally library.
pub type Result<T> = std::result::Result<T, TallyError>;
