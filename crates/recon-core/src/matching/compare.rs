//! Field-by-field comparison of ledger values against a document.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::config::CompareConfig;
use crate::models::{ExtractedFields, FieldCheck, FieldComparisons, MismatchReason};
use crate::normalize::{drop_alpha_prefix, normalize_number, strip_separators};

/// Compares expected and found values using the configured tolerances.
#[derive(Debug, Clone)]
pub struct Comparator {
    config: CompareConfig,
}

impl Comparator {
    pub fn new(config: &CompareConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn compare(&self, expected: &ExtractedFields, found: &ExtractedFields) -> FieldComparisons {
        FieldComparisons {
            number: compare_number(expected.number.as_deref(), found.number.as_deref()),
            date: compare_date(expected.date, found.date, self.config.date_window_days),
            amount: compare_amount(
                expected.amount,
                found.amount,
                self.config.abs_tolerance,
                self.config.rel_tolerance,
            ),
        }
    }
}

/// Numbers agree when their canonical forms are equal, when they differ only
/// in separators, or when they agree after dropping the alphabetic prefix.
pub fn compare_number(expected: Option<&str>, found: Option<&str>) -> FieldCheck {
    let expected_norm = expected.map(normalize_number).unwrap_or_default();
    if expected_norm.is_empty() {
        return FieldCheck::pass();
    }

    let Some(found_raw) = found else {
        return FieldCheck::fail(MismatchReason::NotFound {
            expected: expected.map(str::to_string),
        });
    };
    let found_norm = normalize_number(found_raw);

    let same = expected_norm == found_norm
        || strip_separators(&expected_norm) == strip_separators(&found_norm)
        || {
            let a = strip_separators(drop_alpha_prefix(&expected_norm));
            !a.is_empty() && a == strip_separators(drop_alpha_prefix(&found_norm))
        };

    if same {
        FieldCheck::pass()
    } else {
        FieldCheck::fail(MismatchReason::ValueMismatch {
            expected: expected_norm,
            found: found_norm,
            detail: None,
        })
    }
}

/// Dates agree when at most `window_days` apart.
pub fn compare_date(expected: Option<NaiveDate>, found: Option<NaiveDate>, window_days: i64) -> FieldCheck {
    let Some(expected) = expected else {
        return FieldCheck::pass();
    };
    let Some(found) = found else {
        return FieldCheck::fail(MismatchReason::NotFound {
            expected: Some(expected.to_string()),
        });
    };

    let delta = (found - expected).num_days();
    if delta.abs() <= window_days {
        FieldCheck::pass()
    } else {
        FieldCheck::fail(MismatchReason::ValueMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
            detail: Some(format!("delta_days={}", delta)),
        })
    }
}

/// Amounts agree when `|found - expected| <= max(abs_tol, rel_tol * |expected|)`.
pub fn compare_amount(
    expected: Option<Decimal>,
    found: Option<Decimal>,
    abs_tol: Decimal,
    rel_tol: Decimal,
) -> FieldCheck {
    let Some(expected) = expected else {
        return FieldCheck::pass();
    };
    let Some(found) = found else {
        return FieldCheck::fail(MismatchReason::NotFound {
            expected: Some(expected.to_string()),
        });
    };

    let diff = (found - expected).abs();
    let allowed = abs_tol.max(rel_tol * expected.abs());
    if diff <= allowed {
        FieldCheck::pass()
    } else {
        FieldCheck::fail(MismatchReason::ValueMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
            detail: Some(format!("abs_diff={}", diff)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(s: &str) -> Option<NaiveDate> {
        NaiveDate::from_str(s).ok()
    }

    #[test]
    fn test_number_variants() {
        assert!(compare_number(Some("FV/12/2024"), Some("fv 12/2024")).passed);
        assert!(compare_number(Some("FV/012/2024"), Some("FV/12/2024")).passed);
        assert!(compare_number(Some("FV-12-2024"), Some("FV12/2024")).passed);
        assert!(compare_number(Some("FV/12/2024"), Some("FA/12/2024")).passed);
        assert!(compare_number(None, None).passed);

        let check = compare_number(Some("FV/12/2024"), Some("FV/13/2024"));
        assert_eq!(
            check.reason,
            Some(MismatchReason::ValueMismatch {
                expected: "FV/12/2024".to_string(),
                found: "FV/13/2024".to_string(),
                detail: None,
            })
        );

        let check = compare_number(Some("FV/12/2024"), None);
        assert_eq!(
            check.reason,
            Some(MismatchReason::NotFound {
                expected: Some("FV/12/2024".to_string())
            })
        );
    }

    #[test]
    fn test_letters_only_numbers_do_not_match_by_prefix_rule() {
        assert!(!compare_number(Some("ABC"), Some("XYZ")).passed);
    }

    #[test]
    fn test_date_window() {
        assert!(compare_date(date("2024-03-01"), date("2024-03-06"), 5).passed);
        assert!(compare_date(date("2024-03-06"), date("2024-03-01"), 5).passed);
        assert!(compare_date(None, None, 5).passed);

        let check = compare_date(date("2024-03-01"), date("2024-03-07"), 5);
        assert!(!check.passed);
        assert_eq!(
            check.reason,
            Some(MismatchReason::ValueMismatch {
                expected: "2024-03-01".to_string(),
                found: "2024-03-07".to_string(),
                detail: Some("delta_days=6".to_string()),
            })
        );

        assert!(!compare_date(date("2024-03-01"), None, 5).passed);
    }

    #[test]
    fn test_amount_tolerances() {
        let abs = dec("5.0");
        let rel = dec("0.01");

        assert!(compare_amount(Some(dec("100.00")), Some(dec("100.04")), abs, rel).passed);
        assert!(!compare_amount(Some(dec("100.00")), Some(dec("200.00")), abs, rel).passed);
        assert!(compare_amount(Some(dec("100000")), Some(dec("100900")), abs, rel).passed);
        assert!(!compare_amount(Some(dec("1000.00")), Some(dec("1050.00")), abs, rel).passed);
        assert!(compare_amount(None, Some(dec("1")), abs, rel).passed);

        let check = compare_amount(Some(dec("1000.00")), Some(dec("1050.00")), abs, rel);
        match check.reason {
            Some(MismatchReason::ValueMismatch { detail, .. }) => {
                assert_eq!(detail.as_deref(), Some("abs_diff=50.00"));
            }
            other => panic!("unexpected reason: {:?}", other),
        }
    }

    #[test]
    fn test_comparator_uses_config() {
        let comparator = Comparator::new(&CompareConfig {
            date_window_days: 0,
            ..CompareConfig::default()
        });
        let expected = ExtractedFields {
            number: Some("FV/1/2024".to_string()),
            date: date("2024-03-01"),
            amount: Some(dec("10.00")),
        };
        let found = ExtractedFields {
            date: date("2024-03-02"),
            ..expected.clone()
        };

        let result = comparator.compare(&expected, &found);
        assert_eq!(result.failing_fields(), vec!["date"]);
    }
}
