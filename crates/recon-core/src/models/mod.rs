//! Data models for ledger rows, indexed documents, verdicts and configuration.

pub mod config;
pub mod document;
pub mod ledger;
pub mod verdict;

pub use config::{
    CompareConfig, ExtractionConfig, MatchConfig, OcrConfig, PdfConfig, RecheckConfig,
    ReconConfig, ReportConfig,
};
pub use document::DocumentRecord;
pub use ledger::{LedgerRow, Override};
pub use verdict::{
    AnywhereHit, Criterion, ExtractedFields, FieldCheck, FieldComparisons, MatchCandidate,
    MismatchReason, Overall, Verdict,
};
