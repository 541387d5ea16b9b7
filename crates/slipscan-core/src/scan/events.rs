//! Events pushed to the host while a scan runs.

use serde::{Deserialize, Serialize};

use super::progress::ProgressSnapshot;
use crate::models::slip::SlipRecord;

/// A bounded batch of records delivered before the run finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlipChunk {
    /// Records in the order they were buffered.
    pub slips: Vec<SlipRecord>,

    /// True only on the final chunk of a completed run.
    pub is_complete: bool,
}

/// One message on the scan event channel.
///
/// Consumers that only care about progress can ignore `PartialResults`
/// and wait for the run summary instead; chunks exist so large scans
/// show results before the run ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanEvent {
    /// Periodic progress snapshot.
    Progress(ProgressSnapshot),

    /// A batch of found slips.
    PartialResults(SlipChunk),
}
