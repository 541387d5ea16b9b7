//! Memory pressure sampling and adaptive batch sizing.

use std::sync::Arc;
use tracing::debug;

/// Source of resident-memory readings for the running process.
pub trait MemoryPressureSource: Send + Sync {
    /// Current resident set size in bytes, if the platform exposes one.
    fn resident_bytes(&self) -> Option<u64>;
}

/// Samples resident memory from `/proc/self/statm`.
///
/// Reads `None` on platforms without procfs, which freezes the batch
/// size at its current value.
#[derive(Debug, Default)]
pub struct ProcStatmSampler;

impl MemoryPressureSource for ProcStatmSampler {
    fn resident_bytes(&self) -> Option<u64> {
        #[cfg(target_os = "linux")]
        {
            let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
            let resident_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
            // statm reports pages, 4 KiB on supported targets
            Some(resident_pages * 4096)
        }
        #[cfg(not(target_os = "linux"))]
        {
            None
        }
    }
}

/// Fixed reading, for tests and hosts without process metrics.
#[derive(Debug, Clone, Copy)]
pub struct FixedSampler(pub Option<u64>);

impl MemoryPressureSource for FixedSampler {
    fn resident_bytes(&self) -> Option<u64> {
        self.0
    }
}

/// Batch sizing bounds and the current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    min: usize,
    max: usize,
    step: usize,
    current: usize,
}

impl BatchConfig {
    pub fn new(min: usize, max: usize, initial: usize, step: usize) -> Self {
        let min = min.max(1);
        let max = max.max(min);
        Self {
            min,
            max,
            step,
            current: initial.clamp(min, max),
        }
    }

    /// Current batch size.
    pub fn current(&self) -> usize {
        self.current
    }

    fn shrink(&mut self) -> usize {
        self.current = self.current.saturating_sub(self.step).max(self.min);
        self.current
    }

    fn grow(&mut self) -> usize {
        self.current = (self.current + self.step).min(self.max);
        self.current
    }
}

/// Polls a pressure source and adapts the batch size between bounds.
///
/// Meant to run at batch boundaries only; the size never changes while
/// a batch is in flight.
pub struct MemoryPressureMonitor {
    source: Arc<dyn MemoryPressureSource>,
    high_bytes: u64,
    low_bytes: u64,
}

impl MemoryPressureMonitor {
    pub fn new(source: Arc<dyn MemoryPressureSource>, high_bytes: u64, low_bytes: u64) -> Self {
        Self {
            source,
            high_bytes,
            low_bytes,
        }
    }

    /// Shrink or grow the batch size from the current reading and return
    /// the size to use for the next batch.
    pub fn adjust(&self, batch: &mut BatchConfig) -> usize {
        match self.source.resident_bytes() {
            Some(bytes) if bytes > self.high_bytes => {
                let size = batch.shrink();
                debug!("high memory ({} bytes), batch size now {}", bytes, size);
                size
            }
            Some(bytes) if bytes < self.low_bytes => {
                let size = batch.grow();
                debug!("low memory ({} bytes), batch size now {}", bytes, size);
                size
            }
            _ => batch.current(),
        }
    }
}
