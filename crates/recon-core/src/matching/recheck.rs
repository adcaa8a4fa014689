//! Second chance for amount mismatches: look for the expected amount anywhere
//! in the document, ignoring labels.

use rust_decimal::Decimal;
use tracing::debug;

use crate::extract::patterns::numeric_tokens;
use crate::models::config::RecheckConfig;
use crate::models::{AnywhereHit, Overall, Verdict};
use crate::normalize::normalize_amount;
use crate::pdf::DocumentText;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Scans mismatched documents for any number close to the expected amount.
///
/// The recheck only ever adds an alternate status next to the original
/// verdict; it never touches `overall`.
#[derive(Debug, Clone)]
pub struct AnywhereRecheck {
    tolerance_pct: Decimal,
}

impl AnywhereRecheck {
    pub fn new(config: &RecheckConfig) -> Self {
        Self {
            tolerance_pct: config.tolerance_pct,
        }
    }

    /// Alternate status granted by this recheck, e.g. `ok_anywhere_1p`.
    pub fn status_label(&self) -> String {
        format!("ok_anywhere_{}p", self.tolerance_pct.normalize())
    }

    /// The numeric token closest to `expected`, with its 1-based page.
    ///
    /// Returns `None` when `expected` is zero or the text has no numbers.
    pub fn scan(&self, expected: Decimal, pages: &[String]) -> Option<AnywhereHit> {
        if expected.is_zero() {
            return None;
        }

        let mut best: Option<AnywhereHit> = None;
        for (page_idx, page) in pages.iter().enumerate() {
            for token in numeric_tokens(page) {
                let Some(value) = normalize_amount(token.text) else { continue };
                let diff_pct = ((value - expected).abs() / expected.abs() * HUNDRED).round_dp(4);
                if best.as_ref().is_some_and(|b| b.diff_pct <= diff_pct) {
                    continue;
                }
                best = Some(AnywhereHit {
                    value,
                    page: page_idx as u32 + 1,
                    diff_pct,
                    within_tolerance: diff_pct <= self.tolerance_pct,
                });
            }
        }
        best
    }

    /// Recheck one verdict against the matched document's text.
    ///
    /// Only rows that are `mismatch` and carry a non-zero expected amount are
    /// considered.
    pub fn apply(&self, verdict: &mut Verdict, text: &DocumentText) {
        if verdict.overall != Overall::Mismatch {
            return;
        }
        let Some(expected) = verdict.expected.amount else { return };

        let Some(hit) = self.scan(expected, &text.pages) else {
            debug!("Recheck found no numbers for row {}", verdict.ledger_row_id);
            return;
        };

        if hit.within_tolerance {
            debug!(
                "Row {}: {} found on page {} ({}% off)",
                verdict.ledger_row_id, hit.value, hit.page, hit.diff_pct
            );
            verdict.alternate_status = Some(self.status_label());
        }
        verdict.anywhere = Some(hit);
    }
}
