//! Core library for invoice reconciliation.
//!
//! This crate provides:
//! - Ledger loading from CSV and spreadsheet workbooks
//! - PDF text access with per-document limits and an OCR fallback
//! - Heuristic extraction of invoice number, date and net amount
//! - Document indexing, ledger-to-document matching and field comparison
//! - Verdict logs, run summaries and collision-safe document renaming

pub mod error;
pub mod extract;
pub mod index;
pub mod ledger;
pub mod matching;
pub mod models;
pub mod normalize;
pub mod pdf;
pub mod pipeline;
pub mod report;

pub use error::{DocumentError, ReconError, Result};
pub use extract::{CandidateExtractor, Candidates, Expected, Scored};
pub use index::{Corpus, DocumentIndex, DocumentIndexer};
pub use ledger::{load_ledger, load_overrides};
pub use matching::{AnywhereRecheck, Comparator, MatchResolver};
pub use models::{DocumentRecord, LedgerRow, Overall, ReconConfig, Verdict};
pub use pdf::{DocumentReader, DocumentText, DocumentTextCache, TextSource};
pub use pipeline::{Reconciler, RunOptions, RunOutcome};
pub use report::{ReportAggregator, Summary};
