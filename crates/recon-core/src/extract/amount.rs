//! Net amount rules.

use rust_decimal::Decimal;

use super::patterns::{
    AMOUNT_NET_MENTION, AMOUNT_NET_TOTAL, AMOUNT_NET_VALUE, AMOUNT_TOTAL_NET, numeric_tokens,
};
use super::{CandidateRule, Expected, Scored};
use crate::normalize::normalize_amount;

/// Confidence per label level: explicit net total, net mention, bare number.
fn level_confidence(level: u8) -> f32 {
    match level {
        3 => 0.95,
        2 => 0.85,
        _ => 0.6,
    }
}

/// Textual renderings of an amount as invoices print it.
pub fn renderings(amount: Decimal) -> Vec<String> {
    let fixed = format!("{:.2}", amount.abs().round_dp(2));
    let Some((int_part, frac)) = fixed.split_once('.') else {
        return vec![fixed];
    };

    let grouped = |sep: &str| -> String {
        let digits: Vec<char> = int_part.chars().collect();
        let mut out = String::new();
        for (i, c) in digits.iter().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push_str(sep);
            }
            out.push(*c);
        }
        out
    };

    let mut variants = vec![
        format!("{},{}", grouped("."), frac),
        format!("{},{}", int_part, frac),
        format!("{}.{}", int_part, frac),
        format!("{}.{}", grouped(","), frac),
        format!("{},{}", grouped(" "), frac),
    ];
    variants.dedup();
    variants
}

/// The expected amount present verbatim in the text.
pub struct VerbatimAmountRule;

impl CandidateRule for VerbatimAmountRule {
    type Output = Decimal;

    fn name(&self) -> &'static str {
        "verbatim_amount"
    }

    fn candidates(&self, text: &str, expected: &Expected) -> Vec<Scored<Decimal>> {
        let Some(amount) = expected.amount else {
            return Vec::new();
        };
        let text = text.replace('\u{00a0}', " ");

        for rendering in renderings(amount) {
            for (start, matched) in text.match_indices(&rendering) {
                let end = start + matched.len();
                let glued_before = text[..start].chars().next_back().is_some_and(|c| c.is_ascii_digit());
                let glued_after = text[end..].chars().next().is_some_and(|c| c.is_ascii_digit());
                if !glued_before && !glued_after {
                    return vec![Scored::new(amount, 1.0, self.name(), matched).with_position(start, end)];
                }
            }
        }
        Vec::new()
    }
}

/// Amount tokens bucketed by label level.
///
/// With an expected amount, the closest value of the highest populated level
/// ranks first; without one, the first value of that level.
pub struct AmountScanRule;

impl AmountScanRule {
    /// All labelled and unlabelled amounts, deduplicated per level, highest level first.
    pub fn leveled(text: &str) -> Vec<(u8, Scored<Decimal>)> {
        let mut raw: Vec<(u8, usize, usize, String)> = Vec::new();

        for pattern in [&*AMOUNT_TOTAL_NET, &*AMOUNT_NET_TOTAL, &*AMOUNT_NET_VALUE] {
            for caps in pattern.captures_iter(text) {
                if let Some(m) = caps.get(1) {
                    raw.push((3, m.start(), m.end(), m.as_str().to_string()));
                }
            }
        }
        for caps in AMOUNT_NET_MENTION.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                raw.push((2, m.start(), m.end(), m.as_str().to_string()));
            }
        }
        for token in numeric_tokens(text) {
            raw.push((1, token.start, token.end, token.text.to_string()));
        }

        let mut seen: Vec<(u8, Decimal)> = Vec::new();
        let mut out = Vec::new();
        for (level, start, end, source) in raw {
            let Some(value) = normalize_amount(&source) else { continue };
            let key = (level, value.round_dp(2));
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            out.push((
                level,
                Scored::new(value, level_confidence(level), "amount_scan", source).with_position(start, end),
            ));
        }
        out
    }
}

impl CandidateRule for AmountScanRule {
    type Output = Decimal;

    fn name(&self) -> &'static str {
        "amount_scan"
    }

    fn candidates(&self, text: &str, expected: &Expected) -> Vec<Scored<Decimal>> {
        let mut leveled = Self::leveled(text);
        match expected.amount {
            Some(target) => leveled.sort_by(|(la, a), (lb, b)| {
                lb.cmp(la).then((a.value - target).abs().cmp(&(b.value - target).abs()))
            }),
            None => leveled.sort_by(|(la, _), (lb, _)| lb.cmp(la)),
        }
        leveled.into_iter().map(|(_, scored)| scored).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_renderings() {
        let variants = renderings(dec("1234.5"));
        assert!(variants.contains(&"1.234,50".to_string()));
        assert!(variants.contains(&"1234,50".to_string()));
        assert!(variants.contains(&"1234.50".to_string()));
        assert!(variants.contains(&"1,234.50".to_string()));
        assert!(variants.contains(&"1 234,50".to_string()));
    }

    #[test]
    fn test_verbatim_requires_number_boundary() {
        let expected = Expected {
            amount: Some(dec("100")),
            ..Expected::default()
        };
        assert!(VerbatimAmountRule.candidates("Razem 1100,00", &expected).is_empty());
        let found = VerbatimAmountRule.candidates("Netto: 100,00 zł", &expected);
        assert_eq!(found[0].value, dec("100"));
    }

    #[test]
    fn test_label_levels() {
        let text = "Pozycja 1: 10,00\nNetto 80,00\nRazem netto: 1 000,00\n";
        let found = AmountScanRule.candidates(text, &Expected::none());
        assert_eq!(found[0].value, dec("1000.00"));
        assert_eq!(found[0].confidence, 0.95);
    }

    #[test]
    fn test_closest_within_highest_level() {
        let text = "Netto 500,00 ... netto 950,00\nRazem 990,00";
        let expected = Expected {
            amount: Some(dec("1000")),
            ..Expected::default()
        };
        let found = AmountScanRule.candidates(text, &expected);
        assert_eq!(found[0].value, dec("950.00"));
        assert_eq!(found[0].confidence, 0.85);
    }

    #[test]
    fn test_unlabelled_amounts() {
        let found = AmountScanRule.candidates("kwota 42,50 do zapłaty", &Expected::none());
        assert_eq!(found[0].value, dec("42.50"));
        assert_eq!(found[0].confidence, 0.6);
    }
}
