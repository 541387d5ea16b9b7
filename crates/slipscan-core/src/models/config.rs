//! Configuration structures for the scan pipeline.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration for the slipscan pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlipscanConfig {
    /// Text recognition configuration.
    pub ocr: OcrConfig,

    /// Bulk scan configuration.
    pub scan: ScanConfig,
}

impl Default for SlipscanConfig {
    fn default() -> Self {
        Self {
            ocr: OcrConfig::default(),
            scan: ScanConfig::default(),
        }
    }
}

/// Text recognition configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Language hints passed to the recognition engine, in priority order.
    pub languages: Vec<String>,

    /// Minimum line confidence to keep (0.0 - 1.0).
    pub min_confidence: f32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: vec!["th-TH".to_string(), "en-US".to_string()],
            min_confidence: 0.0, // Disabled - extraction tolerates noisy lines
        }
    }
}

/// Bulk scan configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Maximum simultaneously in-flight extraction tasks.
    pub max_concurrent_tasks: usize,

    /// Per-image timeout in milliseconds.
    pub item_timeout_ms: u64,

    /// Buffered records needed before a partial chunk is emitted.
    pub chunk_size: usize,

    /// Buffer length that triggers a warning.
    pub buffer_soft_cap: usize,

    /// Buffer length that triggers trimming.
    pub buffer_hard_cap: usize,

    /// Newest records kept when the buffer is trimmed.
    pub buffer_keep: usize,

    /// Smallest allowed batch size.
    pub min_batch_size: usize,

    /// Largest allowed batch size.
    pub max_batch_size: usize,

    /// Batch size at the start of a run.
    pub initial_batch_size: usize,

    /// Batch size change applied per memory pressure reading.
    pub batch_step: usize,

    /// Pause between batches in milliseconds.
    pub inter_batch_delay_ms: u64,

    /// Progress push interval in milliseconds.
    pub progress_interval_ms: u64,

    /// Resident memory above which batches shrink (bytes).
    pub high_memory_bytes: u64,

    /// Resident memory below which batches grow (bytes).
    pub low_memory_bytes: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 8,
            item_timeout_ms: 10_000,
            chunk_size: 100,
            buffer_soft_cap: 500,
            buffer_hard_cap: 1000,
            buffer_keep: 800,
            min_batch_size: 5,
            max_batch_size: 40,
            initial_batch_size: 20,
            batch_step: 5,
            inter_batch_delay_ms: 50,
            progress_interval_ms: 500,
            high_memory_bytes: 1_610_612_736, // 1.5 GiB
            low_memory_bytes: 536_870_912,    // 0.5 GiB
        }
    }
}

impl ScanConfig {
    /// Per-image timeout as a `Duration`.
    pub fn item_timeout(&self) -> Duration {
        Duration::from_millis(self.item_timeout_ms)
    }

    /// Pause between batches as a `Duration`.
    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }

    /// Progress push interval as a `Duration`.
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

impl SlipscanConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}
