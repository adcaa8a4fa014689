//! Canonical forms for invoice numbers, dates and amounts.
//!
//! Both sides of a comparison (ledger and document) go through the same
//! functions, so a value only has to be recognized once to match anywhere.
//! None of these functions fail: unusable input yields an empty string or
//! `None`.

use std::str::FromStr;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;

lazy_static! {
    static ref DATE_LIKE_NUMBER: Regex =
        Regex::new(r"^0*\d{1,4}[-_./]\d{1,2}[-_./]\d{1,4}$").unwrap();

    static ref ISO_DATE: Regex =
        Regex::new(r"^(\d{4})[-./](\d{1,2})[-./](\d{1,2})(?:[T ].*)?$").unwrap();

    static ref DAY_FIRST_DATE: Regex =
        Regex::new(r"^(\d{1,2})[-./](\d{1,2})[-./](\d{4}|\d{2})(?:[T ].*)?$").unwrap();

    static ref LONG_DATE: Regex = Regex::new(
        r"(?i)^(\d{1,2})\s+(stycznia|lutego|marca|kwietnia|maja|czerwca|lipca|sierpnia|wrze[śs]nia|pa[źz]dziernika|listopada|grudnia)\s+(\d{4})"
    ).unwrap();

    static ref CURRENCY_WORDS: Regex = Regex::new(r"(?i)PLN|Z[ŁL]|EUR|USD|GBP|[€$£]").unwrap();
}

/// Canonical invoice number.
///
/// Upper-cases, drops whitespace and characters outside `[A-Z0-9/_-]`,
/// rewrites `_` and `-` to `/` when the value is date-like or already
/// contains a `/`, and strips leading zeros from every `/` segment.
pub fn normalize_number(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .replace('\\', "/")
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-' | '.'))
        .collect();

    let without_dots: String = cleaned.chars().filter(|c| *c != '.').collect();
    let unify = cleaned.contains('/')
        || DATE_LIKE_NUMBER.is_match(&cleaned)
        || DATE_LIKE_NUMBER.is_match(&without_dots);
    let cleaned: String = if unify {
        cleaned
            .chars()
            .map(|c| if matches!(c, '_' | '-' | '.') { '/' } else { c })
            .collect()
    } else {
        without_dots
    };

    cleaned
        .split('/')
        .map(strip_leading_zeros)
        .collect::<Vec<_>>()
        .join("/")
}

fn strip_leading_zeros(segment: &str) -> &str {
    let stripped = segment.trim_start_matches('0');
    if stripped.is_empty() && !segment.is_empty() {
        "0"
    } else {
        stripped
    }
}

/// Upper-case alphanumerics only; separator style is ignored.
pub fn strip_separators(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_uppercase())
        .collect()
}

/// Everything from the first digit on (`FV/12/2024` -> `12/2024`).
pub fn drop_alpha_prefix(s: &str) -> &str {
    match s.find(|c: char| c.is_ascii_digit()) {
        Some(idx) => &s[idx..],
        None => "",
    }
}

/// Parse a date in ISO (`YYYY-MM-DD`) or day-first (`DD.MM.YYYY`) form.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(caps) = ISO_DATE.captures(s) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = DAY_FIRST_DATE.captures(s) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year = parse_year(&caps[3])?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = LONG_DATE.captures(s) {
        let day: u32 = caps[1].parse().ok()?;
        let month = polish_month_to_number(&caps[2])?;
        let year: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    None
}

/// Two-digit years: 00-50 are 20xx, 51-99 are 19xx.
pub(crate) fn parse_year(s: &str) -> Option<i32> {
    let year: i32 = s.parse().ok()?;
    Some(match (s.len(), year) {
        (2, y) if y <= 50 => 2000 + y,
        (2, y) => 1900 + y,
        (_, y) => y,
    })
}

pub(crate) fn polish_month_to_number(month: &str) -> Option<u32> {
    let month = month.to_lowercase();
    let number = match month.as_str() {
        "stycznia" => 1,
        "lutego" => 2,
        "marca" => 3,
        "kwietnia" => 4,
        "maja" => 5,
        "czerwca" => 6,
        "lipca" => 7,
        "sierpnia" => 8,
        "września" | "wrzesnia" => 9,
        "października" | "pazdziernika" => 10,
        "listopada" => 11,
        "grudnia" => 12,
        _ => return None,
    };
    Some(number)
}

/// Parse a money amount written in Polish or English convention.
///
/// `"1 234,56"`, `"1.234,56"`, `"1,234.56"`, `"1234.56 zł"` all yield
/// `1234.56`. A lone comma followed by exactly two digits is a decimal
/// comma; any other lone comma groups thousands.
pub fn normalize_amount(raw: &str) -> Option<Decimal> {
    let without_currency = CURRENCY_WORDS.replace_all(raw, "");
    let cleaned: String = without_currency
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    let negative = cleaned.starts_with('-');
    let cleaned = cleaned.trim_start_matches('-');
    if cleaned.is_empty() || cleaned.contains('-') {
        return None;
    }

    let commas = cleaned.matches(',').count();
    let dots = cleaned.matches('.').count();

    let canonical = match (commas, dots) {
        (0, 0) => cleaned.to_string(),
        (c, d) if c > 0 && d > 0 => {
            let comma_pos = cleaned.rfind(',')?;
            let dot_pos = cleaned.rfind('.')?;
            if comma_pos > dot_pos {
                cleaned.replace('.', "").replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (1, 0) => {
            let (_, fraction) = cleaned.split_once(',')?;
            if fraction.len() == 2 {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (_, 0) => cleaned.replace(',', ""),
        (0, 1) => cleaned.to_string(),
        (0, _) => cleaned.replace('.', ""),
        _ => return None,
    };

    let value = Decimal::from_str(&canonical).ok()?;
    Some(if negative { -value } else { value })
}

/// Render an amount with two decimals and a decimal comma (`500,50`).
pub fn format_amount_comma(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2)).replace('.', ",")
}

/// Make a value safe to use inside a file name.
pub fn sanitize_for_filename(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_normalize_number_segments() {
        assert_eq!(normalize_number(" fv/01/2024 "), "FV/1/2024");
        assert_eq!(normalize_number("FV-12-2024/A"), "FV/12/2024/A");
        assert_eq!(normalize_number("2024-03-01"), "2024/3/1");
        assert_eq!(normalize_number("FV 12\\2024"), "FV12/2024");
        assert_eq!(normalize_number("INV-0042"), "INV-0042");
        assert_eq!(normalize_number("000123"), "123");
        assert_eq!(normalize_number("FV/000/2024"), "FV/0/2024");
        assert_eq!(normalize_number(""), "");
    }

    #[test]
    fn test_normalize_number_idempotent() {
        for raw in [
            "FV/01/2024",
            "fv_01_2024/x",
            "2024-03-01",
            "INV-0042",
            "0/0/0",
            "A.B.C",
            "12.03.2024",
            "  f v - 7 ",
            "1.2-3-4",
            "00012-3-4",
        ] {
            let once = normalize_number(raw);
            assert_eq!(normalize_number(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_normalize_date_variants() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1);
        assert_eq!(normalize_date("2024-03-01"), expected);
        assert_eq!(normalize_date("2024/3/1"), expected);
        assert_eq!(normalize_date("01.03.2024"), expected);
        assert_eq!(normalize_date("1/3/2024"), expected);
        assert_eq!(normalize_date("01-03-24"), expected);
        assert_eq!(normalize_date("2024-03-01 00:00:00"), expected);
        assert_eq!(normalize_date("1 marca 2024"), expected);
    }

    #[test]
    fn test_normalize_date_unparseable() {
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("yesterday"), None);
        assert_eq!(normalize_date("31.02.2024"), None);
        assert_eq!(normalize_date("2024-13-01"), None);
    }

    #[test]
    fn test_normalize_amount_locales() {
        assert_eq!(normalize_amount("1 234,56"), Some(dec("1234.56")));
        assert_eq!(normalize_amount("1234.56"), Some(dec("1234.56")));
        assert_eq!(normalize_amount("1 234,56"), normalize_amount("1234.56"));
        assert_eq!(normalize_amount("1.234,56"), Some(dec("1234.56")));
        assert_eq!(normalize_amount("1,234.56"), Some(dec("1234.56")));
        assert_eq!(normalize_amount("1\u{00a0}234,56 zł"), Some(dec("1234.56")));
        assert_eq!(normalize_amount("PLN 500,50"), Some(dec("500.50")));
        assert_eq!(normalize_amount("1,234"), Some(dec("1234")));
        assert_eq!(normalize_amount("12,34"), Some(dec("12.34")));
        assert_eq!(normalize_amount("1.234.567"), Some(dec("1234567")));
        assert_eq!(normalize_amount("-99,90 EUR"), Some(dec("-99.90")));
    }

    #[test]
    fn test_normalize_amount_garbage() {
        assert_eq!(normalize_amount(""), None);
        assert_eq!(normalize_amount("n/a"), None);
        assert_eq!(normalize_amount("12-34"), None);
    }

    #[test]
    fn test_filename_helpers() {
        assert_eq!(format_amount_comma(dec("500.5")), "500,50");
        assert_eq!(sanitize_for_filename("FV/01/2024"), "FV_01_2024");
        assert_eq!(strip_separators("fv/01-2024"), "FV012024");
        assert_eq!(drop_alpha_prefix("FV/12/2024"), "12/2024");
    }
}
