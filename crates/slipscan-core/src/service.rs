//! Command surface over the photo library, recognizer and extractor.

use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use crate::error::{PhotoError, ScanError};
use crate::extract::SlipExtractor;
use crate::models::config::SlipscanConfig;
use crate::models::slip::ScanSummary;
use crate::ocr::{TextRecognizer, filter_by_confidence};
use crate::photos::{ImageRef, PhotoLibrary};
use crate::scan::{MemoryPressureSource, ProcStatmSampler, ScanEvent, ScanJob};

/// Stable error codes for the command surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidArgument,
    PermissionDenied,
    ImageError,
    OcrError,
    ScanError,
    Cancelled,
    DeleteError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::ImageError => "IMAGE_ERROR",
            ErrorCode::OcrError => "OCR_ERROR",
            ErrorCode::ScanError => "SCAN_ERROR",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::DeleteError => "DELETE_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed service command, carrying a machine-readable code.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ServiceError {
    pub code: ErrorCode,
    pub message: String,
}

impl ServiceError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<ScanError> for ServiceError {
    fn from(err: ScanError) -> Self {
        let code = match &err {
            ScanError::Cancelled => ErrorCode::Cancelled,
            ScanError::Enumeration(PhotoError::PermissionDenied(_)) => ErrorCode::PermissionDenied,
            ScanError::Enumeration(_) => ErrorCode::ScanError,
        };
        Self::new(code, err.to_string())
    }
}

/// Extraction output for one explicitly chosen image.
///
/// Unlike the bulk scan, this reports whatever was found, including a
/// zero amount and an empty date, so the caller can show partial hits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleScanResult {
    pub text: String,
    pub amount: Decimal,
    pub date: String,
    pub image_path: String,
}

/// Long-lived entry point for scan commands.
///
/// At most one bulk scan runs at a time; starting a new one cancels the
/// previous run and takes its place.
pub struct ScanService {
    photos: Arc<dyn PhotoLibrary>,
    recognizer: Arc<dyn TextRecognizer>,
    extractor: SlipExtractor,
    config: SlipscanConfig,
    memory: Arc<dyn MemoryPressureSource>,
    current: Mutex<Option<Arc<ScanJob>>>,
}

impl ScanService {
    pub fn new(
        photos: Arc<dyn PhotoLibrary>,
        recognizer: Arc<dyn TextRecognizer>,
        config: SlipscanConfig,
    ) -> Self {
        Self {
            photos,
            recognizer,
            extractor: SlipExtractor::new(),
            config,
            memory: Arc::new(ProcStatmSampler),
            current: Mutex::new(None),
        }
    }

    /// Replace the default memory pressure source.
    pub fn with_memory_source(mut self, memory: Arc<dyn MemoryPressureSource>) -> Self {
        self.memory = memory;
        self
    }

    /// Scan every photo in the library, streaming events on `events`.
    ///
    /// If another scan is still running it is cancelled first and this
    /// one takes over the service slot.
    pub async fn scan_all_photos(
        &self,
        events: mpsc::Sender<ScanEvent>,
    ) -> Result<ScanSummary, ServiceError> {
        let job = Arc::new(ScanJob::new(
            Arc::clone(&self.photos),
            Arc::clone(&self.recognizer),
            self.config.scan.clone(),
            self.config.ocr.clone(),
            Arc::clone(&self.memory),
        ));

        {
            let mut current = self.current.lock().await;
            if let Some(previous) = current.replace(Arc::clone(&job)) {
                if !previous.state().is_terminal() {
                    info!("superseding an active scan");
                    previous.cancel();
                }
            }
        }

        let result = job.run(events).await;

        // Only the job that still owns the slot may clear it
        {
            let mut current = self.current.lock().await;
            if let Some(owner) = current.as_ref() {
                if Arc::ptr_eq(owner, &job) {
                    *current = None;
                }
            }
        }

        result.map_err(ServiceError::from)
    }

    /// Cancel the active scan. Returns whether one was running.
    pub async fn cancel_scanning(&self) -> bool {
        let current = self.current.lock().await;
        match current.as_ref() {
            Some(job) if !job.state().is_terminal() => {
                job.cancel();
                true
            }
            _ => false,
        }
    }

    /// Run recognition and extraction on a single image path.
    pub async fn scan_payment_slip(&self, path: &str) -> Result<SingleScanResult, ServiceError> {
        if path.trim().is_empty() {
            return Err(ServiceError::new(
                ErrorCode::InvalidArgument,
                "image path must not be empty",
            ));
        }

        let photo = ImageRef::new(path);
        let image = self.photos.load(&photo).await.map_err(|e| match e {
            PhotoError::PermissionDenied(reason) => {
                ServiceError::new(ErrorCode::PermissionDenied, reason)
            }
            other => ServiceError::new(ErrorCode::ImageError, other.to_string()),
        })?;

        let lines = self
            .recognizer
            .recognize(&photo, &image, &self.config.ocr.languages)
            .await
            .map_err(|e| ServiceError::new(ErrorCode::OcrError, e.to_string()))?;
        let lines = filter_by_confidence(lines, self.config.ocr.min_confidence);

        let extraction = self.extractor.extract_raw(&lines);
        debug!(
            "single scan of {} found amount {} date '{}'",
            path, extraction.amount, extraction.date
        );

        Ok(SingleScanResult {
            text: extraction.text,
            amount: extraction.amount,
            date: extraction.date,
            image_path: path.to_string(),
        })
    }

    /// Remove a slip image from disk. A file that is already gone counts
    /// as removed.
    pub async fn delete_slip_image(&self, path: &str) -> Result<bool, ServiceError> {
        if path.trim().is_empty() {
            return Err(ServiceError::new(
                ErrorCode::InvalidArgument,
                "image path must not be empty",
            ));
        }

        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                info!("removed slip image {}", path);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("slip image {} already absent", path);
                Ok(true)
            }
            Err(e) => Err(ServiceError::new(ErrorCode::DeleteError, e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::ocr::TextLine;
    use crate::scan::FixedSampler;
    use async_trait::async_trait;
    use image::DynamicImage;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    struct StubLibrary {
        ids: Vec<String>,
        deny: bool,
    }

    #[async_trait]
    impl PhotoLibrary for StubLibrary {
        async fn enumerate(&self) -> Result<Vec<ImageRef>, PhotoError> {
            Ok(self.ids.iter().map(|id| ImageRef::new(id.as_str())).collect())
        }

        async fn load(&self, photo: &ImageRef) -> Result<DynamicImage, PhotoError> {
            if self.deny {
                return Err(PhotoError::PermissionDenied("library access denied".into()));
            }
            if self.ids.contains(&photo.id) {
                Ok(DynamicImage::new_rgb8(1, 1))
            } else {
                Err(PhotoError::Load {
                    id: photo.id.clone(),
                    reason: "no such image".into(),
                })
            }
        }
    }

    struct FixedRecognizer {
        lines: Vec<TextLine>,
        fail: bool,
        delay: Duration,
    }

    #[async_trait]
    impl TextRecognizer for FixedRecognizer {
        async fn recognize(
            &self,
            _photo: &ImageRef,
            _image: &DynamicImage,
            _languages: &[String],
        ) -> Result<Vec<TextLine>, OcrError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(OcrError::Recognition("engine unavailable".into()));
            }
            Ok(self.lines.clone())
        }
    }

    fn slip_lines() -> Vec<TextLine> {
        vec![
            TextLine::new("โอนเงินสำเร็จ", 0.95),
            TextLine::new("จำนวนเงิน 1,234.56", 0.9),
            TextLine::new("15 มิ.ย. 68", 0.9),
        ]
    }

    fn quiet() -> FixedRecognizer {
        FixedRecognizer {
            lines: Vec::new(),
            fail: false,
            delay: Duration::ZERO,
        }
    }

    fn service(ids: &[&str], recognizer: FixedRecognizer) -> ScanService {
        ScanService::new(
            Arc::new(StubLibrary {
                ids: ids.iter().map(|s| s.to_string()).collect(),
                deny: false,
            }),
            Arc::new(recognizer),
            SlipscanConfig::default(),
        )
        .with_memory_source(Arc::new(FixedSampler(None)))
    }

    #[tokio::test]
    async fn test_scan_all_photos_returns_summary() {
        let svc = service(
            &["a", "b"],
            FixedRecognizer {
                lines: slip_lines(),
                fail: false,
                delay: Duration::ZERO,
            },
        );
        let (tx, _rx) = mpsc::channel(256);
        let summary = svc.scan_all_photos(tx).await.unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.slips_found, 2);
        assert_eq!(summary.slips[0].amount, Decimal::new(123456, 2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_new_scan_supersedes_running_scan() {
        let svc = Arc::new(service(
            &["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"],
            FixedRecognizer {
                lines: slip_lines(),
                fail: false,
                delay: Duration::from_millis(50),
            },
        ));

        let first = {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move {
                let (tx, _rx) = mpsc::channel(256);
                svc.scan_all_photos(tx).await
            })
        };
        tokio::time::sleep(Duration::from_millis(40)).await;

        let (tx, _rx) = mpsc::channel(256);
        let second = svc.scan_all_photos(tx).await.unwrap();
        assert_eq!(second.total, 10);

        let err = first.await.unwrap().unwrap_err();
        assert_eq!(err.code, ErrorCode::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_without_scan_reports_false() {
        let svc = service(&[], quiet());
        assert!(!svc.cancel_scanning().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cancel_scanning_stops_active_run() {
        let svc = Arc::new(service(
            &["a", "b", "c", "d", "e", "f"],
            FixedRecognizer {
                lines: slip_lines(),
                fail: false,
                delay: Duration::from_millis(50),
            },
        ));
        let runner = {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move {
                let (tx, _rx) = mpsc::channel(256);
                svc.scan_all_photos(tx).await
            })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(svc.cancel_scanning().await);
        let err = runner.await.unwrap().unwrap_err();
        assert_eq!(err.code, ErrorCode::Cancelled);
    }

    #[tokio::test]
    async fn test_single_scan_rejects_blank_path() {
        let svc = service(&[], quiet());
        let err = svc.scan_payment_slip("   ").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
    }

    #[tokio::test]
    async fn test_single_scan_extracts_fields() {
        let svc = service(
            &["slip.jpg"],
            FixedRecognizer {
                lines: slip_lines(),
                fail: false,
                delay: Duration::ZERO,
            },
        );
        let result = svc.scan_payment_slip("slip.jpg").await.unwrap();

        assert_eq!(result.amount, Decimal::new(123456, 2));
        assert_eq!(result.date, "15/06/2025");
        assert_eq!(result.image_path, "slip.jpg");
        assert!(result.text.contains("โอนเงินสำเร็จ"));
    }

    #[tokio::test]
    async fn test_single_scan_maps_load_failures() {
        let svc = service(&["present.jpg"], quiet());
        let err = svc.scan_payment_slip("absent.jpg").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ImageError);
    }

    #[tokio::test]
    async fn test_single_scan_maps_permission_denied() {
        let svc = ScanService::new(
            Arc::new(StubLibrary {
                ids: vec!["x.jpg".into()],
                deny: true,
            }),
            Arc::new(quiet()),
            SlipscanConfig::default(),
        )
        .with_memory_source(Arc::new(FixedSampler(None)));
        let err = svc.scan_payment_slip("x.jpg").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
    }

    #[tokio::test]
    async fn test_single_scan_maps_engine_failure() {
        let svc = service(
            &["x.jpg"],
            FixedRecognizer {
                lines: Vec::new(),
                fail: true,
                delay: Duration::ZERO,
            },
        );
        let err = svc.scan_payment_slip("x.jpg").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::OcrError);
    }

    #[tokio::test]
    async fn test_delete_missing_file_succeeds() {
        let svc = service(&[], quiet());
        let removed = svc
            .delete_slip_image("/no/such/slipscan-image.jpg")
            .await
            .unwrap();
        assert!(removed);
    }

    #[tokio::test]
    async fn test_delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slip.jpg");
        std::fs::write(&path, b"not really an image").unwrap();

        let svc = service(&[], quiet());
        let removed = svc
            .delete_slip_image(path.to_str().unwrap())
            .await
            .unwrap();

        assert!(removed);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_delete_rejects_blank_path() {
        let svc = service(&[], quiet());
        let err = svc.delete_slip_image("").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_error_codes_serialize_screaming() {
        let err = ServiceError::new(ErrorCode::InvalidArgument, "bad input");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "INVALID_ARGUMENT");
        assert_eq!(err.to_string(), "INVALID_ARGUMENT: bad input");
    }

    #[test]
    fn test_single_result_serializes_camel_case() {
        let result = SingleScanResult {
            text: "t".into(),
            amount: Decimal::ZERO,
            date: String::new(),
            image_path: "a.jpg".into(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("imagePath").is_some());
        assert!(json.get("image_path").is_none());
    }
}
