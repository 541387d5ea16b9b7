//! Bulk scanning of a photo library.
//!
//! A [`ScanJob`] walks every image the library exposes, runs text
//! recognition and field extraction on each one under a concurrency cap,
//! and streams progress snapshots and result chunks to the caller while
//! a memory pressure monitor resizes the dispatch batches.

mod events;
mod memory;
mod orchestrator;
mod progress;

pub use events::{ScanEvent, SlipChunk};
pub use memory::{
    BatchConfig, FixedSampler, MemoryPressureMonitor, MemoryPressureSource, ProcStatmSampler,
};
pub use orchestrator::{JobState, ScanJob};
pub use progress::{ProgressSnapshot, ProgressTracker};
