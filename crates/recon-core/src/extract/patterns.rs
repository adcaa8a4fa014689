//! Regex tables shared by the extraction rules.
//!
//! The `regex` crate has no lookaround, so numeric boundaries (`not preceded
//! or followed by a digit`) are checked by the callers.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Invoice number, label before the value: "Faktura VAT nr FV/1/2024", "Invoice no: 123"
    pub static ref NUMBER_LABEL_BEFORE: Regex = Regex::new(
        r"(?i)(?:faktur[a-z]*|invoice)[^\n]{0,50}?\b(?:nr|no|number|numer)\b\.?\s*[:\-#]?\s*([A-Z0-9][A-Z0-9/_\-]{2,})"
    ).unwrap();

    // "Nr faktury: FV/1/2024"
    pub static ref NUMBER_LABEL_NR_FIRST: Regex = Regex::new(
        r"(?i)\b(?:nr|numer)\s+faktury\s*[:\-]?\s*([A-Z0-9][A-Z0-9/_\-]{2,})"
    ).unwrap();

    // Label after the value: "Nr 12/2024 ... faktura"
    pub static ref NUMBER_LABEL_AFTER: Regex = Regex::new(
        r"(?i)\b(?:nr|no|number|numer)\b\.?\s*[:\-]?\s*([A-Z0-9][A-Z0-9/_\-]{2,})[^\n]{0,50}?(?:faktur[a-z]*|invoice)"
    ).unwrap();

    // "FV/12/2024", "FV7-2024", "12/2024/A"
    pub static ref NUMBER_SEGMENTED: Regex = Regex::new(
        r"\b(?:[A-Z]{1,5}[/_\-]?)?\d{1,6}(?:[/_\-][A-Za-z0-9]{1,6}){1,4}\b"
    ).unwrap();

    pub static ref NUMBER_DIGIT_RUN: Regex = Regex::new(r"\b\d{6,12}\b").unwrap();

    pub static ref ALNUM_TOKEN: Regex = Regex::new(r"(?i)\b[A-Z0-9]{3,}\b").unwrap();

    pub static ref DATE_LIKE: Regex = Regex::new(
        r"^\d{1,4}[\-_./]\d{1,2}[\-_./]\d{1,4}$"
    ).unwrap();

    // Amounts: "1 234,56", "1.234,56", "1234.56", "-99,90"
    pub static ref AMOUNT_TOKEN: Regex = Regex::new(
        r"-?(?:\d{1,3}(?:[ .\u{00a0}]\d{3})+|\d+)(?:[.,]\d{2})?"
    ).unwrap();

    // Label level 3: explicit net total
    pub static ref AMOUNT_TOTAL_NET: Regex = Regex::new(
        r"(?i)(?:razem|suma|total)[^\n]{0,40}?(?:netto|net\b)\D{0,20}?(-?(?:\d{1,3}(?:[ .\u{00a0}]\d{3})+|\d+)(?:[.,]\d{2})?)"
    ).unwrap();

    pub static ref AMOUNT_NET_TOTAL: Regex = Regex::new(
        r"(?i)(?:netto\s*razem|razem\s*netto)\D{0,20}?(-?(?:\d{1,3}(?:[ .\u{00a0}]\d{3})+|\d+)(?:[.,]\d{2})?)"
    ).unwrap();

    pub static ref AMOUNT_NET_VALUE: Regex = Regex::new(
        r"(?i)warto(?:ść|sc)[^\n]{0,40}?netto\D{0,20}?(-?(?:\d{1,3}(?:[ .\u{00a0}]\d{3})+|\d+)(?:[.,]\d{2})?)"
    ).unwrap();

    // Label level 2: any "netto" followed by a number on the same line
    pub static ref AMOUNT_NET_MENTION: Regex = Regex::new(
        r"(?i)netto[^\n]{0,40}?(-?(?:\d{1,3}(?:[ .\u{00a0}]\d{3})+|\d+)(?:[.,]\d{2})?)"
    ).unwrap();

    // Dates
    pub static ref DATE_DMY: Regex = Regex::new(
        r"\b(\d{1,2})[./\-](\d{1,2})[./\-](\d{4}|\d{2})\b"
    ).unwrap();

    pub static ref DATE_YMD: Regex = Regex::new(
        r"\b(\d{4})[./\-](\d{1,2})[./\-](\d{1,2})\b"
    ).unwrap();

    pub static ref DATE_POLISH_LONG: Regex = Regex::new(
        r"(?i)\b(\d{1,2})\s+(stycznia|lutego|marca|kwietnia|maja|czerwca|lipca|sierpnia|wrze[śs]nia|pa[źz]dziernika|listopada|grudnia)\s+(\d{4})"
    ).unwrap();

    // Parties
    pub static ref SELLER_LABEL: Regex = Regex::new(
        r"(?im)^[^\S\n]*(?:sprzedawca|seller|supplier|wystawca|dostawca)[^\S\n]*:?[^\S\n]*(.*)$"
    ).unwrap();

    // Currencies
    pub static ref CURRENCY_PLN: Regex = Regex::new(r"(?i)\bPLN\b|zł").unwrap();
    pub static ref CURRENCY_EUR: Regex = Regex::new(r"(?i)\bEUR\b|€").unwrap();
    pub static ref CURRENCY_USD: Regex = Regex::new(r"(?i)\bUSD\b|\$").unwrap();
    pub static ref CURRENCY_GBP: Regex = Regex::new(r"(?i)\bGBP\b|£").unwrap();
}

/// Three numeric groups (`01/03/2024`, `2024-03-01`); never an invoice number.
pub fn is_date_like(s: &str) -> bool {
    DATE_LIKE.is_match(s.trim())
}

/// A numeric token found by [`numeric_tokens`].
#[derive(Debug, Clone, PartialEq)]
pub struct NumericToken<'a> {
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
}

/// All amount-shaped tokens not glued to other digits.
///
/// When the greedy match runs into a following digit, the token falls back to
/// its leading digit run.
pub fn numeric_tokens(text: &str) -> Vec<NumericToken<'_>> {
    let mut tokens = Vec::new();

    for m in AMOUNT_TOKEN.find_iter(text) {
        let preceded_by_digit = text[..m.start()]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_digit());
        if preceded_by_digit {
            continue;
        }

        let followed_by_digit = text[m.end()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit());

        let end = if followed_by_digit {
            let sign = usize::from(m.as_str().starts_with('-'));
            let digits = m.as_str()[sign..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .count();
            m.start() + sign + digits
        } else {
            m.end()
        };

        tokens.push(NumericToken {
            start: m.start(),
            end,
            text: &text[m.start()..end],
        });
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_tokens_boundaries() {
        let found: Vec<&str> = numeric_tokens("Netto 1 234,56 zł, VAT 23% 283,95")
            .into_iter()
            .map(|t| t.text)
            .collect();
        assert_eq!(found, vec!["1 234,56", "23", "283,95"]);
    }

    #[test]
    fn test_numeric_tokens_fall_back_to_digit_run() {
        let found: Vec<&str> = numeric_tokens("12,345").into_iter().map(|t| t.text).collect();
        assert_eq!(found, vec!["12"]);
    }

    #[test]
    fn test_is_date_like() {
        assert!(is_date_like("01/03/2024"));
        assert!(is_date_like("2024-03-01"));
        assert!(!is_date_like("12/2024"));
        assert!(!is_date_like("FV/12/2024"));
    }

    #[test]
    fn test_segmented_number_keeps_prefix() {
        let m = NUMBER_SEGMENTED.find("FAKTURA FV/12/2024 z dnia").unwrap();
        assert_eq!(m.as_str(), "FV/12/2024");
    }
}
