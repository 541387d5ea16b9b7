//! Date extraction and Buddhist-era conversion for Thai slips.

use tracing::debug;

use super::FieldExtractor;
use super::patterns::{
    BUDDHIST_YEAR_SIGNAL, DATE_PATTERNS, FOUR_DIGIT_BE_YEAR, THAI_MONTHS, TWO_DIGIT_BE_YEAR,
    WHITESPACE,
};

/// Offset between Buddhist-era and Gregorian years.
const BUDDHIST_ERA_OFFSET: i32 = 543;

/// Date field extractor.
///
/// Matched dates that carry a Buddhist-era signal are normalized to a
/// slash-separated Gregorian form; everything else is returned verbatim.
#[derive(Debug)]
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = String;

    fn extract(&self, text: &str) -> Option<String> {
        DATE_PATTERNS
            .iter()
            .find_map(|pattern| pattern.find(text))
            .map(|found| normalize_date(found.as_str()))
    }

    fn extract_all(&self, text: &str) -> Vec<String> {
        let mut results = Vec::new();
        for pattern in DATE_PATTERNS.iter() {
            for found in pattern.find_iter(text) {
                results.push(normalize_date(found.as_str()));
            }
        }
        results
    }
}

fn normalize_date(raw: &str) -> String {
    if contains_buddhist_year(raw) {
        let converted = convert_buddhist_to_gregorian(raw);
        debug!("converted date '{}' to '{}'", raw, converted);
        converted
    } else {
        raw.to_string()
    }
}

/// True when the text carries a Buddhist-era year signal. False hits are
/// harmless: conversion rewrites nothing it does not recognize.
pub fn contains_buddhist_year(text: &str) -> bool {
    BUDDHIST_YEAR_SIGNAL.is_match(text)
}

/// Rewrite Thai month abbreviations and Buddhist-era years into a
/// slash-separated Gregorian date, e.g. "15 มิ.ย. 68" -> "15/06/2025".
pub fn convert_buddhist_to_gregorian(text: &str) -> String {
    let mut result = text.to_string();

    // Month abbreviation becomes the slash-wrapped month number
    for (abbrev, month) in THAI_MONTHS.iter() {
        if result.contains(abbrev) {
            result = result.replace(abbrev, &format!("/{}/", month));
        }
    }

    // Only the first year-shaped match is converted, but the replacement
    // hits every occurrence of those digits.
    let four_digit = FOUR_DIGIT_BE_YEAR
        .find(&result)
        .map(|m| m.as_str().to_string());

    let mut converted_four_digit = false;
    if let Some(year_text) = four_digit {
        if let Ok(be_year) = year_text.parse::<i32>() {
            result = result.replace(&year_text, &(be_year - BUDDHIST_ERA_OFFSET).to_string());
            converted_four_digit = true;
        }
    }

    // Two-digit years are considered only when no full year was rewritten
    if !converted_four_digit {
        let two_digit = TWO_DIGIT_BE_YEAR
            .captures(&result)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());

        if let Some(year_text) = two_digit {
            if let Ok(short_year) = year_text.parse::<i32>() {
                let gregorian = 2500 + short_year - BUDDHIST_ERA_OFFSET;
                result = result.replace(&year_text, &gregorian.to_string());
            }
        }
    }

    WHITESPACE.replace_all(&result, "").into_owned()
}

/// Extract a date from text.
pub fn extract_date(text: &str) -> Option<String> {
    DateExtractor::new().extract(text)
}
