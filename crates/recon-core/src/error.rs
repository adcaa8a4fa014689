//! Error types for the recon-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the recon library.
///
/// Only batch-setup failures surface as `ReconError`. Failures that concern a
/// single document, field or override are absorbed into the data model
/// (error strings, empty fields, notes) and never abort a run.
#[derive(Error, Debug)]
pub enum ReconError {
    /// Ledger file or corpus root is missing.
    #[error("input not found: {0}")]
    InputNotFound(PathBuf),

    /// The ledger could not be interpreted.
    #[error("ledger error: {0}")]
    Ledger(String),

    /// Document processing error (only surfaced by single-document APIs).
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// CSV read/write error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Spreadsheet read error.
    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// Archive extraction error.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Per-document failures. These are recorded on the document's index record.
#[derive(Error, Debug, Clone)]
pub enum DocumentError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// The file exceeds the configured size limit.
    #[error("file too large: {size_mb:.1}MB > {limit_mb}MB")]
    TooLarge { size_mb: f64, limit_mb: u64 },

    /// Text extraction did not finish within the configured time.
    #[error("timed out after {0}s")]
    Timeout(u64),

    /// The OCR collaborator failed.
    #[error("OCR failed: {0}")]
    Ocr(String),

    /// I/O error while reading the document.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for DocumentError {
    fn from(e: std::io::Error) -> Self {
        DocumentError::Io(e.to_string())
    }
}

/// Result type for the recon library.
pub type Result<T> = std::result::Result<T, ReconError>;
