//! Match candidates and per-row verdicts.

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which resolver strategy produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Override,
    Number,
    DateAmount,
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Criterion::Override => "override",
            Criterion::Number => "number",
            Criterion::DateAmount => "date_amount",
        };
        f.write_str(name)
    }
}

/// The resolver's choice of document for one ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub ledger_row_id: String,

    /// Path of the chosen document.
    pub document_ref: PathBuf,

    pub criterion: Criterion,

    /// Self-reported certainty in `[0, 1]`; not a probability.
    pub confidence: f32,

    /// Number of equally qualified documents the choice was made from.
    pub ambiguous_count: usize,
}

/// Why a field check failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "why", rename_all = "snake_case")]
pub enum MismatchReason {
    /// Nothing usable was found in the document.
    NotFound { expected: Option<String> },

    /// A value was found but it disagrees with the ledger.
    ValueMismatch {
        expected: String,
        found: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

/// Outcome of comparing one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCheck {
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<MismatchReason>,
}

impl FieldCheck {
    pub fn pass() -> Self {
        Self {
            passed: true,
            reason: None,
        }
    }

    pub fn fail(reason: MismatchReason) -> Self {
        Self {
            passed: false,
            reason: Some(reason),
        }
    }
}

/// Per-field outcomes for one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldComparisons {
    pub number: FieldCheck,
    pub date: FieldCheck,
    pub amount: FieldCheck,
}

impl FieldComparisons {
    pub fn all_passed(&self) -> bool {
        self.number.passed && self.date.passed && self.amount.passed
    }

    /// Names of the fields that failed, in `number, date, amount` order.
    pub fn failing_fields(&self) -> Vec<&'static str> {
        [
            ("number", &self.number),
            ("date", &self.date),
            ("amount", &self.amount),
        ]
        .into_iter()
        .filter(|(_, check)| !check.passed)
        .map(|(name, _)| name)
        .collect()
    }
}

/// Overall verdict for a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Overall {
    Ok,
    Mismatch,
    MissingPdf,
}

impl fmt::Display for Overall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Overall::Ok => "ok",
            Overall::Mismatch => "mismatch",
            Overall::MissingPdf => "missing_pdf",
        };
        f.write_str(name)
    }
}

/// Number, date and amount as a triple; used for expected and extracted values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub number: Option<String>,
    pub date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
}

/// Audit trail of the anywhere recheck for one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnywhereHit {
    /// Closest amount found anywhere in the document.
    pub value: Decimal,
    /// 1-based page the value was found on.
    pub page: u32,
    /// Distance from the expected amount, in percent.
    pub diff_pct: Decimal,
    pub within_tolerance: bool,
}

/// The single, append-only verdict for one ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub ledger_row_id: String,
    pub section: String,
    pub expected: ExtractedFields,
    pub match_candidate: Option<MatchCandidate>,
    pub extracted: ExtractedFields,

    /// Absent when the matched document is missing.
    pub field_comparisons: Option<FieldComparisons>,

    pub overall: Overall,

    /// Set by the anywhere recheck; never replaces `overall`.
    pub alternate_status: Option<String>,

    pub anywhere: Option<AnywhereHit>,

    /// Canonical file name proposed for the matched document.
    pub proposed_name: Option<String>,

    pub notes: Vec<String>,
}

impl Verdict {
    /// Alternate status when one was granted, else the overall verdict.
    pub fn effective_status(&self) -> String {
        self.alternate_status
            .clone()
            .unwrap_or_else(|| self.overall.to_string())
    }

    pub fn failing_fields(&self) -> Vec<&'static str> {
        self.field_comparisons
            .as_ref()
            .map(FieldComparisons::failing_fields)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failing_fields_order() {
        let comparisons = FieldComparisons {
            number: FieldCheck::pass(),
            date: FieldCheck::fail(MismatchReason::NotFound { expected: None }),
            amount: FieldCheck::fail(MismatchReason::ValueMismatch {
                expected: "1000.00".to_string(),
                found: "1050.00".to_string(),
                detail: None,
            }),
        };
        assert!(!comparisons.all_passed());
        assert_eq!(comparisons.failing_fields(), vec!["date", "amount"]);
    }

    #[test]
    fn test_serialized_names() {
        assert_eq!(serde_json::to_string(&Overall::MissingPdf).unwrap(), "\"missing_pdf\"");
        assert_eq!(serde_json::to_string(&Criterion::DateAmount).unwrap(), "\"date_amount\"");

        let reason = MismatchReason::NotFound { expected: Some("FV/1".to_string()) };
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["why"], "not_found");
    }
}
