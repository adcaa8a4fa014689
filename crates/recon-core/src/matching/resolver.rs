//! Ledger row to document resolution.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::index::DocumentIndex;
use crate::models::config::MatchConfig;
use crate::models::{Criterion, DocumentRecord, LedgerRow, MatchCandidate, Override};
use crate::normalize::normalize_number;

/// The outcome of resolving one row: the chosen document, if any, plus notes
/// explaining anything unusual that happened on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub candidate: Option<MatchCandidate>,
    pub notes: Vec<String>,
}

/// Picks the document for each ledger row.
///
/// Strategies are tried in order and the first one that yields anything
/// wins: override, exact number, then date plus amount.
#[derive(Debug, Clone)]
pub struct MatchResolver {
    config: MatchConfig,
    overrides: HashMap<String, PathBuf>,
}

impl MatchResolver {
    pub fn new(config: &MatchConfig) -> Self {
        Self {
            config: config.clone(),
            overrides: HashMap::new(),
        }
    }

    /// Register overrides. Relative paths are taken relative to `base`.
    pub fn with_overrides(mut self, overrides: &[Override], base: Option<&Path>) -> Self {
        for o in overrides {
            let path = match base {
                Some(base) if o.document_path.is_relative() => base.join(&o.document_path),
                _ => o.document_path.clone(),
            };
            if self.overrides.insert(o.row_id.clone(), path).is_some() {
                warn!("Row {} has more than one override, using the last", o.row_id);
            }
        }
        self
    }

    /// Resolve every row in ledger order, applying the shared-document policy.
    ///
    /// A document already claimed by an earlier row can still be matched, but
    /// the claim's confidence is multiplied by `shared_document_penalty`.
    /// Override matches are never penalized.
    pub fn resolve_all(&self, rows: &[LedgerRow], index: &DocumentIndex) -> Vec<Resolution> {
        let mut claims: HashMap<PathBuf, String> = HashMap::new();

        rows.iter()
            .map(|row| {
                let mut resolution = self.resolve(row, index);
                if let Some(candidate) = resolution.candidate.as_mut() {
                    match claims.get(&candidate.document_ref) {
                        Some(first) if candidate.criterion != Criterion::Override => {
                            candidate.confidence *= self.config.shared_document_penalty;
                            resolution.notes.push(format!("document_shared_with:{}", first));
                            debug!(
                                "Row {} shares {} with row {}",
                                row.row_id,
                                candidate.document_ref.display(),
                                first
                            );
                        }
                        Some(_) => {}
                        None => {
                            claims.insert(candidate.document_ref.clone(), row.row_id.clone());
                        }
                    }
                }
                resolution
            })
            .collect()
    }

    /// Resolve a single row without regard to other rows.
    pub fn resolve(&self, row: &LedgerRow, index: &DocumentIndex) -> Resolution {
        let mut notes = Vec::new();

        if let Some(path) = self.overrides.get(&row.row_id) {
            if path.is_file() {
                let confidence = self.config.override_confidence;
                return Resolution {
                    candidate: Some(self.candidate(row, path, Criterion::Override, confidence, 1)),
                    notes,
                };
            }
            warn!("Override for row {} points to a missing file: {}", row.row_id, path.display());
            notes.push(format!("override_missing:{}", path.display()));
        }

        let candidate = self
            .by_number(row, index)
            .or_else(|| self.by_date_amount(row, index));
        if candidate.is_none() {
            debug!("No document found for row {}", row.row_id);
        }

        Resolution { candidate, notes }
    }

    fn by_number(&self, row: &LedgerRow, index: &DocumentIndex) -> Option<MatchCandidate> {
        let key = normalize_number(row.expected_number.as_deref()?);
        if key.is_empty() {
            return None;
        }

        let mut hits = index.by_number(&key);
        let best = pick_closest(&mut hits, row.expected_amount)?;
        let (confidence, count) = if hits.len() == 1 {
            (self.config.number_unique, 1)
        } else {
            (self.config.number_ambiguous, hits.len())
        };
        Some(self.candidate(row, &best.source_path, Criterion::Number, confidence, count))
    }

    fn by_date_amount(&self, row: &LedgerRow, index: &DocumentIndex) -> Option<MatchCandidate> {
        let date = row.expected_date?;
        let amount = row.expected_amount?;
        let tolerance = self.config.date_amount_tolerance;

        let mut hits: Vec<&DocumentRecord> = index
            .by_date(date)
            .filter(|r| r.extracted_amount.is_some_and(|a| (a - amount).abs() <= tolerance))
            .collect();
        let best = pick_closest(&mut hits, Some(amount))?;
        let (confidence, count) = if hits.len() == 1 {
            (self.config.date_amount_unique, 1)
        } else {
            (self.config.date_amount_ambiguous, hits.len())
        };
        Some(self.candidate(row, &best.source_path, Criterion::DateAmount, confidence, count))
    }

    fn candidate(
        &self,
        row: &LedgerRow,
        path: &Path,
        criterion: Criterion,
        confidence: f32,
        ambiguous_count: usize,
    ) -> MatchCandidate {
        MatchCandidate {
            ledger_row_id: row.row_id.clone(),
            document_ref: path.to_path_buf(),
            criterion,
            confidence,
            ambiguous_count,
        }
    }
}

/// Order `hits` by amount distance (unknown amounts last), then by path, and
/// return the first.
fn pick_closest<'a>(hits: &mut [&'a DocumentRecord], expected: Option<Decimal>) -> Option<&'a DocumentRecord> {
    let delta = |r: &DocumentRecord| -> Option<Decimal> {
        Some((r.extracted_amount? - expected?).abs())
    };
    hits.sort_by(|a, b| match (delta(*a), delta(*b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
    .then_with(|| a.source_path.cmp(&b.source_path)));
    hits.first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn doc(path: &str, number: Option<&str>, date: Option<NaiveDate>, amount: Option<Decimal>) -> DocumentRecord {
        let mut r = DocumentRecord::empty(Path::new(path));
        r.extracted_number = number.map(str::to_string);
        r.extracted_date = date;
        r.extracted_amount = amount;
        r
    }

    fn march(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn resolver() -> MatchResolver {
        MatchResolver::new(&MatchConfig::default())
    }

    #[test]
    fn test_unique_number_match() {
        let index = DocumentIndex::new(vec![
            doc("/c/a.pdf", Some("FV/12/2024"), None, None),
            doc("/c/b.pdf", Some("FV/13/2024"), None, None),
        ]);
        let row = LedgerRow::new("Koszty", "1").with_number("fv/012/2024");

        let resolution = resolver().resolve(&row, &index);
        let candidate = resolution.candidate.unwrap();
        assert_eq!(candidate.document_ref, PathBuf::from("/c/a.pdf"));
        assert_eq!(candidate.criterion, Criterion::Number);
        assert_eq!(candidate.confidence, 1.0);
        assert_eq!(candidate.ambiguous_count, 1);
    }

    #[test]
    fn test_ambiguous_number_prefers_closest_amount_then_path() {
        let index = DocumentIndex::new(vec![
            doc("/c/c.pdf", Some("1/2024"), None, Some(Decimal::new(900, 0))),
            doc("/c/b.pdf", Some("1/2024"), None, Some(Decimal::new(1001, 0))),
            doc("/c/a.pdf", Some("1/2024"), None, Some(Decimal::new(999, 0))),
            doc("/c/0.pdf", Some("1/2024"), None, None),
        ]);
        let row = LedgerRow::new("Koszty", "1")
            .with_number("1/2024")
            .with_amount(Decimal::new(1000, 0));

        let candidate = resolver().resolve(&row, &index).candidate.unwrap();
        assert_eq!(candidate.document_ref, PathBuf::from("/c/a.pdf"));
        assert_eq!(candidate.confidence, 0.8);
        assert_eq!(candidate.ambiguous_count, 4);
    }

    #[test]
    fn test_date_amount_fallback() {
        let index = DocumentIndex::new(vec![
            doc("/c/a.pdf", None, Some(march(1)), Some(Decimal::new(100000, 2))),
            doc("/c/b.pdf", None, Some(march(1)), Some(Decimal::new(100002, 2))),
            doc("/c/c.pdf", None, Some(march(2)), Some(Decimal::new(100000, 2))),
        ]);
        let row = LedgerRow::new("Koszty", "1")
            .with_number("NOT/IN/INDEX")
            .with_date(march(1))
            .with_amount(Decimal::new(100000, 2));

        let candidate = resolver().resolve(&row, &index).candidate.unwrap();
        assert_eq!(candidate.document_ref, PathBuf::from("/c/a.pdf"));
        assert_eq!(candidate.criterion, Criterion::DateAmount);
        assert_eq!(candidate.confidence, 0.6);

        let index = DocumentIndex::new(vec![
            doc("/c/b.pdf", None, Some(march(1)), Some(Decimal::new(100001, 2))),
            doc("/c/a.pdf", None, Some(march(1)), Some(Decimal::new(100001, 2))),
        ]);
        let candidate = resolver().resolve(&row, &index).candidate.unwrap();
        assert_eq!(candidate.document_ref, PathBuf::from("/c/a.pdf"));
        assert_eq!(candidate.confidence, 0.55);
        assert_eq!(candidate.ambiguous_count, 2);
    }

    #[test]
    fn test_no_match() {
        let index = DocumentIndex::new(vec![doc("/c/a.pdf", Some("X/1"), Some(march(1)), None)]);
        let row = LedgerRow::new("Koszty", "1").with_number("Y/2").with_date(march(1));
        assert_eq!(resolver().resolve(&row, &index), Resolution::default());
    }

    #[test]
    fn test_override_wins_regardless_of_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("chosen.pdf"), "x").unwrap();

        let index = DocumentIndex::new(vec![doc("/c/a.pdf", Some("FV/1"), None, None)]);
        let row = LedgerRow::new("Koszty", "7").with_number("FV/1");
        let resolver = resolver().with_overrides(
            &[Override {
                row_id: "7".to_string(),
                document_path: PathBuf::from("chosen.pdf"),
            }],
            Some(dir.path()),
        );

        let candidate = resolver.resolve(&row, &index).candidate.unwrap();
        assert_eq!(candidate.document_ref, dir.path().join("chosen.pdf"));
        assert_eq!(candidate.criterion, Criterion::Override);
        assert_eq!(candidate.confidence, 1.0);
    }

    #[test]
    fn test_missing_override_falls_through() {
        let index = DocumentIndex::new(vec![doc("/c/a.pdf", Some("FV/1"), None, None)]);
        let row = LedgerRow::new("Koszty", "7").with_number("FV/1");
        let resolver = resolver().with_overrides(
            &[Override {
                row_id: "7".to_string(),
                document_path: PathBuf::from("/nowhere/missing.pdf"),
            }],
            None,
        );

        let resolution = resolver.resolve(&row, &index);
        assert_eq!(resolution.candidate.unwrap().criterion, Criterion::Number);
        assert_eq!(resolution.notes, vec!["override_missing:/nowhere/missing.pdf"]);
    }

    #[test]
    fn test_shared_document_penalty() {
        let index = DocumentIndex::new(vec![doc("/c/a.pdf", Some("FV/1"), None, None)]);
        let rows = vec![
            LedgerRow::new("Koszty", "1").with_number("FV/1"),
            LedgerRow::new("Koszty", "2").with_number("FV/1"),
        ];

        let resolutions = resolver().resolve_all(&rows, &index);
        assert_eq!(resolutions[0].candidate.as_ref().unwrap().confidence, 1.0);
        assert!(resolutions[0].notes.is_empty());

        let second = resolutions[1].candidate.as_ref().unwrap();
        assert!((second.confidence - 0.9).abs() < 1e-6);
        assert_eq!(resolutions[1].notes, vec!["document_shared_with:1"]);
    }
}
