//! Bulk-scan orchestration: batching, bounded dispatch, chunked emission.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{Notify, mpsc, watch};
use tokio::time::{interval, sleep, timeout};
use tracing::{debug, info, warn};

use crate::error::ScanError;
use crate::extract::SlipExtractor;
use crate::models::config::{OcrConfig, ScanConfig};
use crate::models::slip::{ScanSummary, SlipRecord};
use crate::ocr::{TextRecognizer, filter_by_confidence};
use crate::photos::{ImageRef, PhotoLibrary};

use super::events::{ScanEvent, SlipChunk};
use super::memory::{BatchConfig, MemoryPressureMonitor, MemoryPressureSource};
use super::progress::ProgressTracker;

/// Lifecycle of one scan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Cancelled => "cancelled",
            JobState::Failed => "failed",
        }
    }

    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Cancelled | JobState::Failed
        )
    }
}

/// In-flight request registry, reported when a run is cancelled.
#[derive(Debug, Default)]
struct ActiveRequests {
    inner: Mutex<HashSet<u64>>,
}

impl ActiveRequests {
    fn insert(&self, seq: u64) {
        self.lock().insert(seq);
    }

    fn remove(&self, seq: u64) {
        self.lock().remove(&seq);
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<u64>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// One bulk scan over a photo library.
///
/// Driven by [`ScanJob::run`]; any task holding a reference can request
/// cancellation. Cancellation is cooperative: dispatch stops at the next
/// checkpoint and in-flight images finish, bail at their next await
/// point, or time out.
pub struct ScanJob {
    photos: Arc<dyn PhotoLibrary>,
    recognizer: Arc<dyn TextRecognizer>,
    extractor: Arc<SlipExtractor>,
    config: ScanConfig,
    ocr: Arc<OcrConfig>,
    memory: Arc<dyn MemoryPressureSource>,
    cancelled: AtomicBool,
    cancel_notify: Arc<Notify>,
    active: Arc<ActiveRequests>,
    state: Mutex<JobState>,
}

impl ScanJob {
    pub fn new(
        photos: Arc<dyn PhotoLibrary>,
        recognizer: Arc<dyn TextRecognizer>,
        config: ScanConfig,
        ocr: OcrConfig,
        memory: Arc<dyn MemoryPressureSource>,
    ) -> Self {
        Self {
            photos,
            recognizer,
            extractor: Arc::new(SlipExtractor::new()),
            config,
            ocr: Arc::new(ocr),
            memory,
            cancelled: AtomicBool::new(false),
            cancel_notify: Arc::new(Notify::new()),
            active: Arc::new(ActiveRequests::default()),
            state: Mutex::new(JobState::Idle),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> JobState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// True once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Request cooperative cancellation and return immediately.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(
            "cancellation requested, {} requests in flight",
            self.active.len()
        );
        self.cancel_notify.notify_waiters();
    }

    fn set_state(&self, next: JobState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.is_terminal() {
            *state = next;
        }
    }

    /// Run the scan to completion, pushing progress and result chunks on
    /// `events`.
    ///
    /// Emission never blocks the scan: a full or closed channel drops
    /// progress messages and keeps result records buffered for the next
    /// attempt. The summary always carries whatever the final chunk
    /// carried, so a deaf consumer still gets every buffered record.
    pub async fn run(&self, events: mpsc::Sender<ScanEvent>) -> Result<ScanSummary, ScanError> {
        self.set_state(JobState::Running);
        info!("starting photo library scan");

        let items = match self.photos.enumerate().await {
            Ok(items) => items,
            Err(e) => {
                self.set_state(JobState::Failed);
                return Err(ScanError::Enumeration(e));
            }
        };

        let total = items.len();
        info!("found {} photos to scan", total);

        let tracker = Arc::new(ProgressTracker::new(total));
        let ticker = ProgressTicker::spawn(
            Arc::clone(&tracker),
            events.clone(),
            self.config.progress_interval(),
        );

        let monitor = MemoryPressureMonitor::new(
            Arc::clone(&self.memory),
            self.config.high_memory_bytes,
            self.config.low_memory_bytes,
        );
        let mut batch = BatchConfig::new(
            self.config.min_batch_size,
            self.config.max_batch_size,
            self.config.initial_batch_size,
            self.config.batch_step,
        );

        let mut buffer: Vec<SlipRecord> = Vec::new();
        let mut cursor = 0;

        while cursor < total && !self.is_cancelled() {
            // The batch size may only change here, between batches
            let batch_size = monitor.adjust(&mut batch);
            let end = (cursor + batch_size).min(total);
            debug!("dispatching photos {}..{} of {}", cursor, end, total);

            let found = self
                .run_batch(&items[cursor..end], cursor as u64, &tracker)
                .await;
            buffer.extend(found);
            cursor = end;

            self.emit_ready_chunks(&mut buffer, &events);

            if cursor < total && !self.is_cancelled() {
                sleep(self.config.inter_batch_delay()).await;
            }
        }

        ticker.stop().await;

        if self.is_cancelled() {
            self.set_state(JobState::Cancelled);
            let snapshot = tracker.snapshot();
            info!(
                "scan cancelled after {} of {} photos",
                snapshot.processed, total
            );
            return Err(ScanError::Cancelled);
        }

        tracker.mark_complete();
        let final_snapshot = tracker.snapshot();
        try_send(&events, ScanEvent::Progress(final_snapshot.clone()));

        if !buffer.is_empty() {
            try_send(
                &events,
                ScanEvent::PartialResults(SlipChunk {
                    slips: buffer.clone(),
                    is_complete: true,
                }),
            );
        }

        self.set_state(JobState::Completed);
        info!(
            "scan complete: {} slips in {} photos",
            final_snapshot.slips_found, total
        );

        Ok(ScanSummary {
            total,
            processed: final_snapshot.processed,
            slips_found: final_snapshot.slips_found,
            slips: buffer,
        })
    }

    /// Dispatch one batch, keeping at most `max_concurrent_tasks` images
    /// in flight, and collect the records the workers found.
    async fn run_batch(
        &self,
        items: &[ImageRef],
        seq_base: u64,
        tracker: &Arc<ProgressTracker>,
    ) -> Vec<SlipRecord> {
        let mut found = Vec::new();
        let (done_tx, mut done_rx) = mpsc::channel(items.len().max(1));
        let mut in_flight = 0usize;

        for (offset, item) in items.iter().enumerate() {
            if self.is_cancelled() {
                break;
            }

            while in_flight >= self.config.max_concurrent_tasks.max(1) {
                match done_rx.recv().await {
                    Some(outcome) => {
                        in_flight -= 1;
                        found.extend(outcome);
                    }
                    None => break,
                }
            }

            self.spawn_worker(
                item.clone(),
                seq_base + offset as u64,
                tracker,
                done_tx.clone(),
            );
            in_flight += 1;
        }

        while in_flight > 0 {
            match done_rx.recv().await {
                Some(outcome) => {
                    in_flight -= 1;
                    found.extend(outcome);
                }
                None => break,
            }
        }

        found
    }

    fn spawn_worker(
        &self,
        item: ImageRef,
        seq: u64,
        tracker: &Arc<ProgressTracker>,
        done: mpsc::Sender<Option<SlipRecord>>,
    ) {
        let photos = Arc::clone(&self.photos);
        let recognizer = Arc::clone(&self.recognizer);
        let extractor = Arc::clone(&self.extractor);
        let ocr = Arc::clone(&self.ocr);
        let tracker = Arc::clone(tracker);
        let active = Arc::clone(&self.active);
        let cancel_notify = Arc::clone(&self.cancel_notify);
        let item_timeout = self.config.item_timeout();

        tokio::spawn(async move {
            active.insert(seq);

            let work = process_item(photos, recognizer, extractor, ocr, &item);
            let outcome = tokio::select! {
                finished = timeout(item_timeout, work) => match finished {
                    Ok(record) => record,
                    Err(_) => {
                        warn!("photo {} timed out after {:?}", item.id, item_timeout);
                        None
                    }
                },
                _ = cancel_notify.notified() => {
                    debug!("photo {} abandoned by cancellation", item.id);
                    None
                }
            };

            active.remove(seq);

            let snapshot = tracker.increment_processed();
            if outcome.is_some() {
                tracker.increment_slips_found();
            }
            debug!("processed {}/{} photos", snapshot.processed, snapshot.total);

            let _ = done.send(outcome).await;
        });
    }

    /// Emit a chunk once enough records are buffered, then enforce the
    /// buffer ceilings.
    fn emit_ready_chunks(&self, buffer: &mut Vec<SlipRecord>, events: &mpsc::Sender<ScanEvent>) {
        if buffer.len() >= self.config.chunk_size {
            let chunk = SlipChunk {
                slips: std::mem::take(buffer),
                is_complete: false,
            };
            debug!("emitting chunk of {} slips", chunk.slips.len());
            if let Err(err) = events.try_send(ScanEvent::PartialResults(chunk)) {
                warn!("chunk emission unavailable, keeping records buffered");
                if let ScanEvent::PartialResults(returned) = err.into_inner() {
                    *buffer = returned.slips;
                }
            }
        }

        if buffer.len() > self.config.buffer_soft_cap {
            warn!("result buffer holds {} records", buffer.len());
        }
        if buffer.len() > self.config.buffer_hard_cap {
            let keep = self.config.buffer_keep.min(buffer.len());
            let dropped = buffer.len() - keep;
            buffer.drain(..dropped);
            warn!("result buffer trimmed, dropped {} oldest records", dropped);
        }
    }
}

/// Load, recognize and extract one image. Any per-image failure means
/// "no slip here", never a failed run.
async fn process_item(
    photos: Arc<dyn PhotoLibrary>,
    recognizer: Arc<dyn TextRecognizer>,
    extractor: Arc<SlipExtractor>,
    ocr: Arc<OcrConfig>,
    item: &ImageRef,
) -> Option<SlipRecord> {
    let image = match photos.load(item).await {
        Ok(image) => image,
        Err(e) => {
            debug!("skipping {}: {}", item.id, e);
            return None;
        }
    };

    let lines = match recognizer.recognize(item, &image, &ocr.languages).await {
        Ok(lines) => filter_by_confidence(lines, ocr.min_confidence),
        Err(e) => {
            // Engine failure reads as a photo with no text
            debug!("no text for {}: {}", item.id, e);
            Vec::new()
        }
    };

    extractor.extract(&lines, &item.id, Utc::now())
}

/// Fire-and-forget event push. The scan never waits on its consumer.
fn try_send(events: &mpsc::Sender<ScanEvent>, event: ScanEvent) {
    if events.try_send(event).is_err() {
        debug!("event channel unavailable, dropping message");
    }
}

/// Pushes progress snapshots on a fixed period until stopped.
struct ProgressTicker {
    stop: watch::Sender<bool>,
    handle: tokio::task::JoinHandle<()>,
}

impl ProgressTicker {
    fn spawn(
        tracker: Arc<ProgressTracker>,
        events: mpsc::Sender<ScanEvent>,
        period: Duration,
    ) -> Self {
        let (stop, mut stopped) = watch::channel(false);
        let handle = tokio::spawn(async move {
            // interval panics on a zero period
            let mut ticker = interval(period.max(Duration::from_millis(1)));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        try_send(&events, ScanEvent::Progress(tracker.snapshot()));
                    }
                    _ = stopped.changed() => break,
                }
            }
        });
        Self { stop, handle }
    }

    async fn stop(self) {
        let _ = self.stop.send(true);
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{OcrError, PhotoError};
    use crate::ocr::TextLine;
    use crate::scan::memory::FixedSampler;
    use async_trait::async_trait;
    use image::DynamicImage;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;

    struct StubLibrary {
        count: usize,
        fail_enumerate: bool,
    }

    #[async_trait]
    impl PhotoLibrary for StubLibrary {
        async fn enumerate(&self) -> Result<Vec<ImageRef>, PhotoError> {
            if self.fail_enumerate {
                return Err(PhotoError::Enumeration("library offline".into()));
            }
            Ok((0..self.count)
                .map(|i| ImageRef::new(format!("photo-{i}")))
                .collect())
        }

        async fn load(&self, _photo: &ImageRef) -> Result<DynamicImage, PhotoError> {
            Ok(DynamicImage::new_rgb8(1, 1))
        }
    }

    /// Recognizer scripted per photo id, tracking peak concurrency.
    struct ScriptedRecognizer {
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail_ids: HashSet<String>,
    }

    impl ScriptedRecognizer {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                fail_ids: HashSet::new(),
            }
        }

        fn peak_concurrency(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextRecognizer for ScriptedRecognizer {
        async fn recognize(
            &self,
            photo: &ImageRef,
            _image: &DynamicImage,
            _languages: &[String],
        ) -> Result<Vec<TextLine>, OcrError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_ids.contains(&photo.id) {
                return Err(OcrError::Recognition("engine crashed".into()));
            }
            Ok(vec![
                TextLine::new("โอนเงินสำเร็จ", 0.95),
                TextLine::new("จำนวนเงิน 100.00", 0.9),
                TextLine::new("15 มิ.ย. 68", 0.9),
            ])
        }
    }

    struct HangingRecognizer;

    #[async_trait]
    impl TextRecognizer for HangingRecognizer {
        async fn recognize(
            &self,
            _photo: &ImageRef,
            _image: &DynamicImage,
            _languages: &[String],
        ) -> Result<Vec<TextLine>, OcrError> {
            sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
    }

    fn test_config() -> ScanConfig {
        ScanConfig {
            item_timeout_ms: 2_000,
            inter_batch_delay_ms: 1,
            progress_interval_ms: 20,
            ..ScanConfig::default()
        }
    }

    fn test_job(
        photos: Arc<dyn PhotoLibrary>,
        recognizer: Arc<dyn TextRecognizer>,
        config: ScanConfig,
    ) -> ScanJob {
        ScanJob::new(
            photos,
            recognizer,
            config,
            OcrConfig::default(),
            Arc::new(FixedSampler(None)),
        )
    }

    #[tokio::test]
    async fn test_empty_library_completes() {
        let job = test_job(
            Arc::new(StubLibrary {
                count: 0,
                fail_enumerate: false,
            }),
            Arc::new(ScriptedRecognizer::new(Duration::ZERO)),
            test_config(),
        );
        let (tx, mut rx) = mpsc::channel(64);
        let summary = job.run(tx).await.unwrap();

        assert_eq!(summary.total, 0);
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.slips_found, 0);
        assert!(summary.slips.is_empty());
        assert_eq!(job.state(), JobState::Completed);

        let mut saw_complete = false;
        while let Some(event) = rx.recv().await {
            if let ScanEvent::Progress(p) = event {
                saw_complete |= p.is_complete;
            }
        }
        assert!(saw_complete);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_scan_finds_slips_and_chunks() {
        let config = ScanConfig {
            chunk_size: 10,
            ..test_config()
        };
        let job = test_job(
            Arc::new(StubLibrary {
                count: 25,
                fail_enumerate: false,
            }),
            Arc::new(ScriptedRecognizer::new(Duration::ZERO)),
            config,
        );
        let (tx, mut rx) = mpsc::channel(256);
        let summary = job.run(tx).await.unwrap();

        assert_eq!(summary.total, 25);
        assert_eq!(summary.processed, 25);
        assert_eq!(summary.slips_found, 25);
        assert_eq!(job.state(), JobState::Completed);

        let mut chunked: Vec<SlipRecord> = Vec::new();
        let mut final_chunks = 0;
        while let Some(event) = rx.recv().await {
            if let ScanEvent::PartialResults(chunk) = event {
                if chunk.is_complete {
                    final_chunks += 1;
                    assert_eq!(chunk.slips, summary.slips);
                }
                chunked.extend(chunk.slips);
            }
        }

        // Every record arrives exactly once across all chunks
        assert_eq!(final_chunks, 1);
        assert_eq!(chunked.len(), 25);
        let ids: HashSet<String> = chunked.iter().map(|r| r.asset_id.clone()).collect();
        assert_eq!(ids.len(), 25);
        for record in &chunked {
            assert_eq!(record.date, "15/06/2025");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_stays_under_cap() {
        let recognizer = Arc::new(ScriptedRecognizer::new(Duration::from_millis(10)));
        let config = ScanConfig {
            max_concurrent_tasks: 3,
            ..test_config()
        };
        let job = test_job(
            Arc::new(StubLibrary {
                count: 30,
                fail_enumerate: false,
            }),
            Arc::clone(&recognizer) as Arc<dyn TextRecognizer>,
            config,
        );
        let (tx, mut rx) = mpsc::channel(256);
        let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });

        let summary = job.run(tx).await.unwrap();
        drain.await.unwrap();

        assert_eq!(summary.processed, 30);
        assert!(
            recognizer.peak_concurrency() <= 3,
            "peak concurrency {}",
            recognizer.peak_concurrency()
        );
        assert!(recognizer.peak_concurrency() >= 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_slow_photo_times_out() {
        let config = ScanConfig {
            item_timeout_ms: 50,
            ..test_config()
        };
        let job = test_job(
            Arc::new(StubLibrary {
                count: 3,
                fail_enumerate: false,
            }),
            Arc::new(HangingRecognizer),
            config,
        );
        let (tx, _rx) = mpsc::channel(64);
        let summary = job.run(tx).await.unwrap();

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.slips_found, 0);
        assert_eq!(job.state(), JobState::Completed);
    }

    #[tokio::test]
    async fn test_engine_failures_count_as_processed() {
        let mut recognizer = ScriptedRecognizer::new(Duration::ZERO);
        recognizer.fail_ids = (0..10)
            .filter(|i| i % 2 == 0)
            .map(|i| format!("photo-{i}"))
            .collect();
        let job = test_job(
            Arc::new(StubLibrary {
                count: 10,
                fail_enumerate: false,
            }),
            Arc::new(recognizer),
            test_config(),
        );
        let (tx, _rx) = mpsc::channel(256);
        let summary = job.run(tx).await.unwrap();

        assert_eq!(summary.processed, 10);
        assert_eq!(summary.slips_found, 5);
    }

    #[tokio::test]
    async fn test_enumeration_failure_fails_run() {
        let job = test_job(
            Arc::new(StubLibrary {
                count: 5,
                fail_enumerate: true,
            }),
            Arc::new(ScriptedRecognizer::new(Duration::ZERO)),
            test_config(),
        );
        let (tx, _rx) = mpsc::channel(64);
        let err = job.run(tx).await.unwrap_err();

        assert!(matches!(err, ScanError::Enumeration(_)));
        assert_eq!(job.state(), JobState::Failed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cancel_stops_dispatch() {
        let config = ScanConfig {
            max_concurrent_tasks: 2,
            ..test_config()
        };
        let job = Arc::new(test_job(
            Arc::new(StubLibrary {
                count: 40,
                fail_enumerate: false,
            }),
            Arc::new(ScriptedRecognizer::new(Duration::from_millis(25))),
            config,
        ));
        let (tx, mut rx) = mpsc::channel(256);

        let runner = {
            let job = Arc::clone(&job);
            tokio::spawn(async move { job.run(tx).await })
        };

        sleep(Duration::from_millis(60)).await;
        job.cancel();
        let result = runner.await.unwrap();

        assert!(matches!(result, Err(ScanError::Cancelled)));
        assert_eq!(job.state(), JobState::Cancelled);

        let mut max_processed = 0;
        let mut chunks = 0;
        while let Some(event) = rx.recv().await {
            match event {
                ScanEvent::Progress(p) => max_processed = max_processed.max(p.processed),
                ScanEvent::PartialResults(_) => chunks += 1,
            }
        }
        assert!(max_processed < 40);
        // The unflushed buffer is dropped on cancellation
        assert_eq!(chunks, 0);
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let job = test_job(
            Arc::new(StubLibrary {
                count: 0,
                fail_enumerate: false,
            }),
            Arc::new(ScriptedRecognizer::new(Duration::ZERO)),
            test_config(),
        );
        job.cancel();
        job.cancel();
        assert!(job.is_cancelled());
    }

    #[test]
    fn test_job_state_labels() {
        assert_eq!(JobState::Running.as_str(), "running");
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(JobState::Failed.is_terminal());
    }
}
