//! Flat index record for one document of the corpus.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fields extracted (unbiased) from one PDF. Read-only after indexing.
///
/// The serialized field names are the columns of the index CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    #[serde(rename = "path")]
    pub source_path: PathBuf,

    pub filename: String,

    #[serde(rename = "invoice_number")]
    pub extracted_number: Option<String>,

    #[serde(rename = "issue_date")]
    pub extracted_date: Option<NaiveDate>,

    #[serde(rename = "net_amount")]
    pub extracted_amount: Option<Decimal>,

    pub currency: Option<String>,

    pub seller_guess: Option<String>,

    /// Why the document could not be read, if it could not.
    pub error: Option<String>,
}

impl DocumentRecord {
    /// An empty record for `path`; all extracted fields unset.
    pub fn empty(path: &Path) -> Self {
        Self {
            source_path: path.to_path_buf(),
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            extracted_number: None,
            extracted_date: None,
            extracted_amount: None,
            currency: None,
            seller_guess: None,
            error: None,
        }
    }

    /// An empty record carrying a per-document failure.
    pub fn failed(path: &Path, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::empty(path)
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_record_keeps_filename() {
        let record = DocumentRecord::failed(Path::new("/corpus/a/fv 1.pdf"), "PDF is encrypted");
        assert_eq!(record.filename, "fv 1.pdf");
        assert!(record.is_failed());
        assert!(record.extracted_number.is_none());
    }
}
