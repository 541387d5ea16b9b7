//! Amount extraction from Thai payment slips.

use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

use super::FieldExtractor;
use super::patterns::{AMOUNT_PATTERNS, DECIMAL_NUMBER};

/// Amount field extractor.
///
/// Runs the pattern cascade in priority order and returns the first
/// match whose numeric part parses. A match that fails to parse does not
/// stop the cascade; the next pattern still gets its chance.
#[derive(Debug)]
pub struct AmountExtractor;

impl AmountExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = Decimal;

    fn extract(&self, text: &str) -> Option<Decimal> {
        for pattern in AMOUNT_PATTERNS.iter() {
            if let Some(found) = pattern.find(text) {
                if let Some(amount) = parse_thai_amount(found.as_str()) {
                    debug!("extracted amount {} from '{}'", amount, found.as_str());
                    return Some(amount);
                }
            }
        }

        None
    }

    fn extract_all(&self, text: &str) -> Vec<Decimal> {
        DECIMAL_NUMBER
            .find_iter(text)
            .filter_map(|m| parse_thai_amount(m.as_str()))
            .collect()
    }
}

/// Parse the first decimal number inside a matched region, stripping
/// thousands separators (e.g. "จำนวนเงิน 1,234.56" -> 1234.56).
pub fn parse_thai_amount(s: &str) -> Option<Decimal> {
    let number = DECIMAL_NUMBER.find(s)?;
    let cleaned = number.as_str().replace([',', ' '], "");
    Decimal::from_str(&cleaned).ok()
}

/// Extract an amount from text.
pub fn extract_amount(text: &str) -> Option<Decimal> {
    AmountExtractor::new().extract(text)
}
