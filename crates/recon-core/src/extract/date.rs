//! Date rules.

use chrono::NaiveDate;

use super::patterns::{DATE_DMY, DATE_POLISH_LONG, DATE_YMD};
use super::{CandidateRule, Expected, Scored};
use crate::normalize::{parse_year, polish_month_to_number};

/// The expected date written verbatim in one of the common layouts.
pub struct VerbatimDateRule;

impl CandidateRule for VerbatimDateRule {
    type Output = NaiveDate;

    fn name(&self) -> &'static str {
        "verbatim_date"
    }

    fn candidates(&self, text: &str, expected: &Expected) -> Vec<Scored<NaiveDate>> {
        let Some(date) = expected.date else {
            return Vec::new();
        };

        ["%d.%m.%Y", "%d-%m-%Y", "%d/%m/%Y", "%Y-%m-%d"]
            .into_iter()
            .map(|layout| date.format(layout).to_string())
            .find_map(|rendered| {
                text.find(&rendered).map(|start| {
                    Scored::new(date, 1.0, self.name(), rendered.as_str())
                        .with_position(start, start + rendered.len())
                })
            })
            .into_iter()
            .collect()
    }
}

/// Every parseable date in the text; nearest to the expected date first,
/// otherwise in reading order.
pub struct DateScanRule;

impl DateScanRule {
    /// All dates in reading order, deduplicated.
    pub fn all_dates(text: &str) -> Vec<Scored<NaiveDate>> {
        let mut results: Vec<Scored<NaiveDate>> = Vec::new();

        for caps in DATE_DMY.captures_iter(text) {
            let day: u32 = caps[1].parse().unwrap_or(0);
            let month: u32 = caps[2].parse().unwrap_or(0);
            let Some(year) = parse_year(&caps[3]) else { continue };
            if let (Some(date), Some(m)) = (NaiveDate::from_ymd_opt(year, month, day), caps.get(0)) {
                results.push(Scored::new(date, 0.9, "date_scan", m.as_str()).with_position(m.start(), m.end()));
            }
        }

        for caps in DATE_YMD.captures_iter(text) {
            let year: i32 = caps[1].parse().unwrap_or(0);
            let month: u32 = caps[2].parse().unwrap_or(0);
            let day: u32 = caps[3].parse().unwrap_or(0);
            if let (Some(date), Some(m)) = (NaiveDate::from_ymd_opt(year, month, day), caps.get(0)) {
                results.push(Scored::new(date, 0.9, "date_scan", m.as_str()).with_position(m.start(), m.end()));
            }
        }

        for caps in DATE_POLISH_LONG.captures_iter(text) {
            let day: u32 = caps[1].parse().unwrap_or(0);
            let Some(month) = polish_month_to_number(&caps[2]) else { continue };
            let year: i32 = caps[3].parse().unwrap_or(0);
            if let (Some(date), Some(m)) = (NaiveDate::from_ymd_opt(year, month, day), caps.get(0)) {
                results.push(Scored::new(date, 0.95, "date_scan", m.as_str()).with_position(m.start(), m.end()));
            }
        }

        results.sort_by_key(|r| r.position.map(|(start, _)| start));
        let mut seen = Vec::new();
        results.retain(|r| {
            if seen.contains(&r.value) {
                false
            } else {
                seen.push(r.value);
                true
            }
        });
        results
    }
}

impl CandidateRule for DateScanRule {
    type Output = NaiveDate;

    fn name(&self) -> &'static str {
        "date_scan"
    }

    fn candidates(&self, text: &str, expected: &Expected) -> Vec<Scored<NaiveDate>> {
        let mut dates = Self::all_dates(text);
        if let Some(target) = expected.date {
            // Stable sort keeps reading order among equally distant dates.
            dates.sort_by_key(|d| (d.value - target).num_days().abs());
        }
        dates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_all_dates_in_reading_order() {
        let text = "Termin płatności 2024-04-15\nData wystawienia 01.03.2024, sprzedaż 28 lutego 2024";
        let dates: Vec<NaiveDate> = DateScanRule::all_dates(text).into_iter().map(|d| d.value).collect();
        assert_eq!(dates, vec![date(2024, 4, 15), date(2024, 3, 1), date(2024, 2, 28)]);
    }

    #[test]
    fn test_scan_prefers_nearest_to_expected() {
        let text = "Termin 15.04.2024, wystawiono 02.03.2024";
        let expected = Expected {
            date: Some(date(2024, 3, 1)),
            ..Expected::default()
        };
        let found = DateScanRule.candidates(text, &expected);
        assert_eq!(found[0].value, date(2024, 3, 2));
    }

    #[test]
    fn test_verbatim_date() {
        let expected = Expected {
            date: Some(date(2024, 1, 5)),
            ..Expected::default()
        };
        let found = VerbatimDateRule.candidates("z dnia 05-01-2024 r.", &expected);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].confidence, 1.0);

        assert!(VerbatimDateRule.candidates("z dnia 06-01-2024", &expected).is_empty());
    }

    #[test]
    fn test_invalid_dates_skipped() {
        assert!(DateScanRule::all_dates("31.02.2024 oraz 99/99/99").is_empty());
    }
}
