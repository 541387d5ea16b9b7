//! Slip record and scan result models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Maximum characters kept in the recognized text of a record.
pub const MAX_TEXT_CHARS: usize = 10_000;

/// Maximum characters kept in the extracted date string.
pub const MAX_DATE_CHARS: usize = 50;

/// Maximum characters kept in the asset identifier.
pub const MAX_ASSET_ID_CHARS: usize = 100;

/// Timestamp format for `created_at` (UTC, one-second precision).
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A validated payment slip found during a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlipRecord {
    /// Recognized text the fields were extracted from.
    pub text: String,

    /// Extracted amount, always positive.
    pub amount: Decimal,

    /// Extracted date string, empty when no date was found.
    pub date: String,

    /// Identifier of the source image.
    pub asset_id: String,

    /// Record creation time in UTC, e.g. `2025-06-15T09:30:00Z`.
    pub created_at: String,
}

impl SlipRecord {
    /// Build a record, truncating every string field to its transport limit.
    pub fn new(
        text: &str,
        amount: Decimal,
        date: &str,
        asset_id: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            text: truncate_chars(text, MAX_TEXT_CHARS),
            amount,
            date: truncate_chars(date, MAX_DATE_CHARS),
            asset_id: truncate_chars(asset_id, MAX_ASSET_ID_CHARS),
            created_at: created_at.format(CREATED_AT_FORMAT).to_string(),
        }
    }
}

/// Raw outcome of a single-image extraction, before any validation gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlipExtraction {
    /// Recognized text, all lines joined with newlines.
    pub text: String,

    /// Extracted amount, zero when none was found.
    pub amount: Decimal,

    /// Extracted date string, empty when none was found.
    pub date: String,
}

/// Final result of a bulk scan run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    /// Number of images the run set out to process.
    pub total: usize,

    /// Number of images actually processed.
    pub processed: usize,

    /// Number of slips found across the whole run.
    pub slips_found: usize,

    /// Records still buffered at completion. Earlier records were already
    /// delivered in partial chunks.
    pub slips: Vec<SlipRecord>,
}

/// Truncate a string to at most `max` characters.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
