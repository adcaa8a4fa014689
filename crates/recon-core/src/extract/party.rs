//! Seller and currency guesses.

use super::patterns::{CURRENCY_EUR, CURRENCY_GBP, CURRENCY_PLN, CURRENCY_USD, SELLER_LABEL};

/// First currency named in the text, checked in PLN, EUR, USD, GBP order.
pub fn detect_currency(text: &str) -> Option<&'static str> {
    [
        (&*CURRENCY_PLN, "PLN"),
        (&*CURRENCY_EUR, "EUR"),
        (&*CURRENCY_USD, "USD"),
        (&*CURRENCY_GBP, "GBP"),
    ]
    .into_iter()
    .find(|(pattern, _)| pattern.is_match(text))
    .map(|(_, code)| code)
}

/// Seller name: the rest of the label line, or the next non-empty line.
pub fn guess_seller(text: &str) -> Option<String> {
    let caps = SELLER_LABEL.captures(text)?;
    let inline = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
    if inline.chars().filter(|c| c.is_alphanumeric()).count() >= 2 {
        return Some(collapse_spaces(inline));
    }

    let label_end = caps.get(0)?.end();
    text[label_end..]
        .lines()
        .map(str::trim)
        .find(|line| line.chars().filter(|c| c.is_alphanumeric()).count() >= 2)
        .map(collapse_spaces)
}

fn collapse_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_currency() {
        assert_eq!(detect_currency("Razem 100,00 zł"), Some("PLN"));
        assert_eq!(detect_currency("Total € 12.00"), Some("EUR"));
        assert_eq!(detect_currency("Amount due: 5 USD"), Some("USD"));
        assert_eq!(detect_currency("nothing here"), None);
    }

    #[test]
    fn test_seller_inline_and_next_line() {
        assert_eq!(
            guess_seller("Sprzedawca: Hurtownia  Nowak\nNabywca: Kowalski"),
            Some("Hurtownia Nowak".to_string())
        );
        assert_eq!(
            guess_seller("Seller:\n\n  ACME Ltd\n"),
            Some("ACME Ltd".to_string())
        );
        assert_eq!(guess_seller("Nabywca: Kowalski"), None);
    }
}
