//! Rule-based field extraction from recognized slip text.

pub mod amount;
pub mod date;
pub mod patterns;

pub use amount::{extract_amount, AmountExtractor};
pub use date::{contains_buddhist_year, convert_buddhist_to_gregorian, extract_date, DateExtractor};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::slip::{SlipExtraction, SlipRecord};
use crate::ocr::TextLine;

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text. First match wins.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// Two-pass field extraction over recognized lines.
///
/// Fields are resolved per line first. Anything still missing gets a
/// second chance on the combined text, which catches labels and values
/// that OCR split across adjacent lines.
#[derive(Debug, Default)]
pub struct SlipExtractor {
    amounts: AmountExtractor,
    dates: DateExtractor,
}

impl SlipExtractor {
    pub fn new() -> Self {
        Self {
            amounts: AmountExtractor::new(),
            dates: DateExtractor::new(),
        }
    }

    /// Extract fields and build a validated record.
    ///
    /// Returns `None` unless a positive amount was found; a slip without
    /// an amount is not a slip.
    pub fn extract(
        &self,
        lines: &[TextLine],
        asset_id: &str,
        created_at: DateTime<Utc>,
    ) -> Option<SlipRecord> {
        let extraction = self.extract_raw(lines);
        if extraction.amount > Decimal::ZERO {
            Some(SlipRecord::new(
                &extraction.text,
                extraction.amount,
                &extraction.date,
                asset_id,
                created_at,
            ))
        } else {
            None
        }
    }

    /// Extract fields without the positive-amount gate. The amount falls
    /// back to zero and the date to an empty string.
    pub fn extract_raw(&self, lines: &[TextLine]) -> SlipExtraction {
        let mut amount = None;
        let mut date = None;
        let mut combined = String::new();

        for line in lines {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(&line.text);

            if amount.is_none() {
                amount = self.amounts.extract(&line.text);
            }
            if date.is_none() {
                date = self.dates.extract(&line.text);
            }
        }

        // Second pass over the joined text for label/value splits
        if amount.is_none() {
            amount = self.amounts.extract(&combined);
        }
        if date.is_none() {
            date = self.dates.extract(&combined);
        }

        SlipExtraction {
            text: combined,
            amount: amount.unwrap_or_default(),
            date: date.unwrap_or_default(),
        }
    }
}
