//! Heuristic candidate extraction of invoice number, date and amount.
//!
//! Every field is produced by a prioritized list of [`CandidateRule`]s. The
//! first rule that yields anything wins and its best-ranked candidate is the
//! field's value. Extraction never fails; an unrecognizable document simply
//! produces empty fields.

pub mod amount;
pub mod date;
pub mod number;
pub mod party;
pub mod patterns;

pub use amount::{AmountScanRule, VerbatimAmountRule};
pub use date::{DateScanRule, VerbatimDateRule};
pub use number::{ExpectedPatternRule, HeuristicNumberRule, LabelledNumberRule, similarity};
pub use party::{detect_currency, guess_seller};

use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::trace;

use crate::models::config::ExtractionConfig;
use crate::models::{DocumentRecord, ExtractedFields, LedgerRow};

/// A ranked candidate value produced by one rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Name of the rule that produced the value.
    pub rule: &'static str,
    /// Byte span in the source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> Scored<T> {
    pub fn new(value: T, confidence: f32, rule: &'static str, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            rule,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}

/// Values the extraction may be biased towards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expected {
    pub number: Option<String>,
    pub date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
}

impl Expected {
    /// No bias; used while indexing.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_row(row: &LedgerRow) -> Self {
        Self {
            number: row.expected_number.clone(),
            date: row.expected_date,
            amount: row.expected_amount,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.number.is_none() && self.date.is_none() && self.amount.is_none()
    }
}

/// A single extraction rule.
pub trait CandidateRule: Send + Sync {
    /// The type of value this rule produces.
    type Output;

    /// Short identifier recorded on every candidate.
    fn name(&self) -> &'static str;

    /// All candidates found in `text`, best first.
    fn candidates(&self, text: &str, expected: &Expected) -> Vec<Scored<Self::Output>>;
}

type RuleList<T> = Vec<Box<dyn CandidateRule<Output = T>>>;

fn first_hit<T>(rules: &RuleList<T>, text: &str, expected: &Expected) -> Option<Scored<T>> {
    rules.iter().find_map(|rule| {
        let hit = rule.candidates(text, expected).into_iter().next();
        if let Some(ref scored) = hit {
            trace!("rule {} accepted {:?} ({:.2})", rule.name(), scored.source, scored.confidence);
        }
        hit
    })
}

/// Best-guess fields of one document.
#[derive(Debug, Clone, Default)]
pub struct Candidates {
    pub number: Option<Scored<String>>,
    pub date: Option<Scored<NaiveDate>>,
    pub amount: Option<Scored<Decimal>>,
    pub currency: Option<String>,
    pub seller: Option<String>,
}

impl Candidates {
    /// The bare values, without scores.
    pub fn fields(&self) -> ExtractedFields {
        ExtractedFields {
            number: self.number.as_ref().map(|s| s.value.clone()),
            date: self.date.as_ref().map(|s| s.value),
            amount: self.amount.as_ref().map(|s| s.value),
        }
    }
}

/// Extracts number, date and amount candidates from document text.
pub struct CandidateExtractor {
    number_rules: RuleList<String>,
    date_rules: RuleList<NaiveDate>,
    amount_rules: RuleList<Decimal>,
    default_currency: String,
}

impl CandidateExtractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            number_rules: vec![
                Box::new(LabelledNumberRule),
                Box::new(ExpectedPatternRule),
                Box::new(HeuristicNumberRule::new(
                    config.number_similarity_threshold,
                    config.segmented_similarity_threshold,
                )),
            ],
            date_rules: vec![Box::new(VerbatimDateRule), Box::new(DateScanRule)],
            amount_rules: vec![Box::new(VerbatimAmountRule), Box::new(AmountScanRule)],
            default_currency: config.default_currency.clone(),
        }
    }

    /// Extract all fields, biased by `expected` where given.
    pub fn extract(&self, text: &str, expected: &Expected) -> Candidates {
        Candidates {
            number: first_hit(&self.number_rules, text, expected),
            date: first_hit(&self.date_rules, text, expected),
            amount: first_hit(&self.amount_rules, text, expected),
            currency: Some(
                detect_currency(text)
                    .unwrap_or(self.default_currency.as_str())
                    .to_string(),
            ),
            seller: guess_seller(text),
        }
    }

    /// Unbiased extraction turned into an index record for `path`.
    pub fn record(&self, path: &Path, text: &str) -> DocumentRecord {
        let candidates = self.extract(text, &Expected::none());
        let fields = candidates.fields();
        DocumentRecord {
            extracted_number: fields.number,
            extracted_date: fields.date,
            extracted_amount: fields.amount,
            currency: candidates.currency,
            seller_guess: candidates.seller,
            ..DocumentRecord::empty(path)
        }
    }
}

impl Default for CandidateExtractor {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}
