//! Expected transactions from the audited entity's bookkeeping export.

use std::path::PathBuf;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One expected transaction. Parsed once from the ledger and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    /// Ledger section (worksheet name, e.g. "Koszty").
    pub section: String,

    /// Stable row identifier within the run.
    pub row_id: String,

    /// Document number as written in the ledger (normalized on use).
    pub expected_number: Option<String>,

    /// Document date.
    pub expected_date: Option<NaiveDate>,

    /// Net value of the document.
    pub expected_amount: Option<Decimal>,

    /// Attachment reference (file name or index) from the ledger.
    pub attachment_hint: Option<String>,
}

impl LedgerRow {
    /// Create a row with only its identity set.
    pub fn new(section: impl Into<String>, row_id: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            row_id: row_id.into(),
            expected_number: None,
            expected_date: None,
            expected_amount: None,
            attachment_hint: None,
        }
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.expected_number = Some(number.into());
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.expected_date = Some(date);
        self
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.expected_amount = Some(amount);
        self
    }

    pub fn with_attachment(mut self, attachment: impl Into<String>) -> Self {
        self.attachment_hint = Some(attachment.into());
        self
    }
}

/// Human-supplied mapping of a ledger row directly to a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Override {
    pub row_id: String,
    pub document_path: PathBuf,
}
