//! Invoice number rules.

use std::collections::HashSet;

use regex::Regex;

use super::patterns::{
    ALNUM_TOKEN, NUMBER_DIGIT_RUN, NUMBER_LABEL_AFTER, NUMBER_LABEL_BEFORE, NUMBER_LABEL_NR_FIRST,
    NUMBER_SEGMENTED, is_date_like,
};
use super::{CandidateRule, Expected, Scored};
use crate::normalize::{normalize_number, strip_separators};

const SEPARATORS: [char; 3] = ['/', '-', '_'];

fn has_separator(s: &str) -> bool {
    s.contains(SEPARATORS)
}

/// Labelled number: "Faktura VAT nr …", "Nr faktury …", "Invoice no …".
pub struct LabelledNumberRule;

impl CandidateRule for LabelledNumberRule {
    type Output = String;

    fn name(&self) -> &'static str {
        "labelled_number"
    }

    fn candidates(&self, text: &str, _expected: &Expected) -> Vec<Scored<String>> {
        let mut results: Vec<Scored<String>> = Vec::new();

        for pattern in [&*NUMBER_LABEL_BEFORE, &*NUMBER_LABEL_NR_FIRST, &*NUMBER_LABEL_AFTER] {
            for caps in pattern.captures_iter(text) {
                let Some(value) = caps.get(1) else { continue };
                let candidate = value.as_str().trim_end_matches(SEPARATORS);
                if is_date_like(candidate) || !candidate.chars().any(|c| c.is_ascii_digit()) {
                    continue;
                }
                if results.iter().any(|r| r.value == candidate) {
                    continue;
                }
                results.push(
                    Scored::new(candidate.to_string(), 0.9, self.name(), value.as_str())
                        .with_position(value.start(), value.start() + candidate.len()),
                );
            }
        }

        results.sort_by_key(|r| r.position.map(|(start, _)| start));
        results
    }
}

/// The expected number, searched for with separator style ignored.
pub struct ExpectedPatternRule;

impl ExpectedPatternRule {
    /// Token-wise pattern for `expected`; `FV/12/2024` also matches `12/2024`.
    ///
    /// Leading zeros are tolerated only in the prefixed form.
    pub fn build_pattern(expected: &str) -> Option<Regex> {
        let normalized = normalize_number(expected);
        let tokens = tokenize(&normalized);
        if tokens.is_empty() {
            return None;
        }

        let join = |tokens: &[&str], pad: bool| -> String {
            tokens
                .iter()
                .map(|t| {
                    if pad && t.starts_with(|c: char| c.is_ascii_digit()) {
                        format!("0*{}", regex::escape(t))
                    } else {
                        regex::escape(t)
                    }
                })
                .collect::<Vec<_>>()
                .join(r"[\s._/\-]*")
        };

        let full = format!(r"\b{}\b", join(&tokens, true));
        let pattern = if tokens.len() > 1 && tokens[0].starts_with(|c: char| c.is_ascii_alphabetic()) {
            format!(r"(?i)(?:{}|\b{}\b)", full, join(&tokens[1..], false))
        } else {
            format!("(?i){}", full)
        };

        Regex::new(&pattern).ok()
    }
}

fn tokenize(normalized: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start: Option<(usize, bool)> = None;

    for (idx, c) in normalized.char_indices() {
        let kind = if c.is_ascii_digit() {
            Some(true)
        } else if c.is_ascii_alphabetic() {
            Some(false)
        } else {
            None
        };

        match (start, kind) {
            (Some((_, digit)), Some(k)) if digit == k => {}
            (Some((s, _)), k) => {
                tokens.push(&normalized[s..idx]);
                start = k.map(|k| (idx, k));
            }
            (None, k) => start = k.map(|k| (idx, k)),
        }
    }
    if let Some((s, _)) = start {
        tokens.push(&normalized[s..]);
    }
    tokens
}

impl CandidateRule for ExpectedPatternRule {
    type Output = String;

    fn name(&self) -> &'static str {
        "expected_pattern"
    }

    fn candidates(&self, text: &str, expected: &Expected) -> Vec<Scored<String>> {
        let Some(pattern) = expected.number.as_deref().and_then(Self::build_pattern) else {
            return Vec::new();
        };

        pattern
            .find_iter(text)
            .filter(|m| !inside_date(text, m.start(), m.end()))
            .map(|m| {
                Scored::new(m.as_str().to_string(), 0.95, self.name(), m.as_str())
                    .with_position(m.start(), m.end())
            })
            .collect()
    }
}

/// Whether `text[start..end]` belongs to a date-like run such as `15.01.2024`.
fn inside_date(text: &str, start: usize, end: usize) -> bool {
    let in_run = |c: char| c.is_ascii_digit() || matches!(c, '.' | '/' | '-');
    let run_start = text[..start]
        .char_indices()
        .rev()
        .take_while(|(_, c)| in_run(*c))
        .last()
        .map_or(start, |(idx, _)| idx);
    let run_end = text[end..]
        .char_indices()
        .take_while(|(_, c)| in_run(*c))
        .last()
        .map_or(end, |(idx, c)| end + idx + c.len_utf8());
    let run = text[run_start..run_end].trim_matches(|c: char| matches!(c, '.' | '/' | '-'));
    is_date_like(run)
}

/// Unlabelled number-shaped fragments, scored against the expected number
/// when one is known.
pub struct HeuristicNumberRule {
    threshold: f32,
    segmented_threshold: f32,
}

impl HeuristicNumberRule {
    pub fn new(threshold: f32, segmented_threshold: f32) -> Self {
        Self {
            threshold,
            segmented_threshold,
        }
    }

    fn fragments<'a>(&self, text: &'a str) -> Vec<(usize, &'a str)> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for m in NUMBER_SEGMENTED.find_iter(text) {
            let value = m.as_str().trim();
            if is_date_like(value) {
                continue;
            }
            if seen.insert(value.to_uppercase()) {
                found.push((m.start(), value));
            }
        }

        for m in NUMBER_DIGIT_RUN.find_iter(text) {
            if seen.insert(m.as_str().to_string()) {
                found.push((m.start(), m.as_str()));
            }
        }

        if found.is_empty() {
            let longest = ALNUM_TOKEN
                .find_iter(text)
                .filter(|m| {
                    let s = m.as_str();
                    s.chars().any(|c| c.is_ascii_digit())
                        && !is_year(s)
                        && !glued_to_number(text, m.start(), m.end())
                })
                .max_by_key(|m| (m.as_str().len(), std::cmp::Reverse(m.start())));
            if let Some(m) = longest {
                found.push((m.start(), m.as_str()));
            }
        }

        found
    }
}

fn is_year(s: &str) -> bool {
    s.len() == 4 && s.parse::<u16>().is_ok_and(|y| (1990..=2099).contains(&y))
}

/// Part of an amount or date: `1000` in `1000,00`, `2024` in `01.03.2024`.
fn glued_to_number(text: &str, start: usize, end: usize) -> bool {
    let mut before = text[..start].chars().rev();
    let mut after = text[end..].chars();
    let glue = |sep: Option<char>, digit: Option<char>| {
        matches!(sep, Some('.' | ',')) && digit.is_some_and(|c| c.is_ascii_digit())
    };
    glue(before.next(), before.next()) || glue(after.next(), after.next())
}

impl Default for HeuristicNumberRule {
    fn default() -> Self {
        Self::new(0.75, 0.90)
    }
}

impl CandidateRule for HeuristicNumberRule {
    type Output = String;

    fn name(&self) -> &'static str {
        "heuristic_number"
    }

    fn candidates(&self, text: &str, expected: &Expected) -> Vec<Scored<String>> {
        let fragments = self.fragments(text);
        if fragments.is_empty() {
            return Vec::new();
        }

        let heuristic = |(start, value): &(usize, &str)| {
            Scored::new(value.to_uppercase(), 0.5, self.name(), *value)
                .with_position(*start, *start + value.len())
        };

        // Plain ranking: most segments, then longest, then first seen.
        let mut ranked: Vec<&(usize, &str)> = fragments.iter().collect();
        ranked.sort_by(|a, b| {
            let segments = |s: &str| s.split(SEPARATORS).count();
            segments(b.1)
                .cmp(&segments(a.1))
                .then(strip_separators(b.1).len().cmp(&strip_separators(a.1).len()))
                .then(a.0.cmp(&b.0))
        });

        let Some(expected_number) = expected.number.as_deref().filter(|e| !e.trim().is_empty()) else {
            return ranked.into_iter().map(heuristic).collect();
        };

        let segmented = has_separator(expected_number);
        let mut pool: Vec<&(usize, &str)> = fragments.iter().collect();
        if segmented && pool.iter().any(|(_, v)| has_separator(v)) {
            pool.retain(|(_, v)| has_separator(v));
        }

        let expected_key = strip_separators(expected_number);
        let mut scored: Vec<(bool, bool, f32, usize, &(usize, &str))> = pool
            .into_iter()
            .map(|fragment| {
                let key = strip_separators(fragment.1);
                (
                    !expected_key.is_empty() && key.contains(&expected_key),
                    has_separator(fragment.1),
                    similarity(&expected_key, &key),
                    key.len(),
                    fragment,
                )
            })
            .collect();
        scored.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then(b.1.cmp(&a.1))
                .then(b.2.total_cmp(&a.2))
                .then(b.3.cmp(&a.3))
                .then(a.4.0.cmp(&b.4.0))
        });

        let threshold = if segmented {
            self.segmented_threshold
        } else {
            self.threshold
        };

        match scored.first() {
            Some((_, _, ratio, _, fragment)) if *ratio >= threshold => {
                let mut accepted = heuristic(fragment);
                accepted.confidence = *ratio;
                let mut results = vec![accepted];
                results.extend(ranked.into_iter().filter(|f| f.0 != fragment.0).map(heuristic));
                results
            }
            _ => ranked.into_iter().map(heuristic).collect(),
        }
    }
}

/// Longest-common-subsequence ratio of two strings, in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut row = vec![0usize; b.len() + 1];
    for ca in &a {
        let mut diagonal = 0;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == cb {
                diagonal + 1
            } else {
                above.max(row[j])
            };
            diagonal = above;
        }
    }

    (2 * row[b.len()]) as f32 / (a.len() + b.len()) as f32
}
