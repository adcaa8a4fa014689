//! Matching ledger rows to documents and judging the match.

mod compare;
mod recheck;
mod resolver;

pub use compare::{Comparator, compare_amount, compare_date, compare_number};
pub use recheck::AnywhereRecheck;
pub use resolver::{MatchResolver, Resolution};

use crate::models::{ExtractedFields, LedgerRow, MatchCandidate, Overall, Verdict};

/// The ledger's own values for a row, in comparison form.
pub fn expected_fields(row: &LedgerRow) -> ExtractedFields {
    ExtractedFields {
        number: row.expected_number.clone(),
        date: row.expected_date,
        amount: row.expected_amount,
    }
}

/// Build the verdict for one row.
///
/// `extracted` is `None` when there is no document to compare against; the
/// row is then `missing_pdf` and no field checks are recorded.
pub fn judge(
    row: &LedgerRow,
    candidate: Option<MatchCandidate>,
    extracted: Option<ExtractedFields>,
    comparator: &Comparator,
    notes: Vec<String>,
) -> Verdict {
    let expected = expected_fields(row);

    let (extracted, field_comparisons, overall) = match extracted {
        Some(found) => {
            let comparisons = comparator.compare(&expected, &found);
            let overall = if comparisons.all_passed() {
                Overall::Ok
            } else {
                Overall::Mismatch
            };
            (found, Some(comparisons), overall)
        }
        None => (ExtractedFields::default(), None, Overall::MissingPdf),
    };

    Verdict {
        ledger_row_id: row.row_id.clone(),
        section: row.section.clone(),
        expected,
        match_candidate: candidate,
        extracted,
        field_comparisons,
        overall,
        alternate_status: None,
        anywhere: None,
        proposed_name: None,
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::CompareConfig;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn row() -> LedgerRow {
        LedgerRow::new("Koszty", "1")
            .with_number("FV/12/2024")
            .with_date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
            .with_amount(Decimal::new(100000, 2))
    }

    #[test]
    fn test_judge_missing_document() {
        let verdict = judge(&row(), None, None, &Comparator::new(&CompareConfig::default()), vec![]);
        assert_eq!(verdict.overall, Overall::MissingPdf);
        assert!(verdict.field_comparisons.is_none());
        assert_eq!(verdict.expected.number.as_deref(), Some("FV/12/2024"));
    }

    #[test]
    fn test_judge_ok_and_mismatch() {
        let comparator = Comparator::new(&CompareConfig::default());
        let found = expected_fields(&row());

        let ok = judge(&row(), None, Some(found.clone()), &comparator, vec![]);
        assert_eq!(ok.overall, Overall::Ok);

        let off = ExtractedFields {
            amount: Some(Decimal::new(105000, 2)),
            ..found
        };
        let mismatch = judge(&row(), None, Some(off), &comparator, vec!["note".to_string()]);
        assert_eq!(mismatch.overall, Overall::Mismatch);
        assert_eq!(mismatch.failing_fields(), vec!["amount"]);
        assert_eq!(mismatch.notes, vec!["note"]);
    }
}
