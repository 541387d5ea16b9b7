//! Core library for Thai payment slip scanning.
//!
//! This crate provides:
//! - Field extraction from noisy OCR text (amounts, dates)
//! - Thai Buddhist calendar year conversion
//! - Bulk photo library scanning with bounded concurrency
//! - Memory pressure aware batch sizing and chunked result delivery
//! - A service facade exposing the scan commands

pub mod error;
pub mod extract;
pub mod models;
pub mod ocr;
pub mod photos;
pub mod scan;
pub mod service;

pub use error::{OcrError, PhotoError, Result, ScanError, SlipscanError};
pub use extract::{
    AmountExtractor, DateExtractor, FieldExtractor, SlipExtractor, convert_buddhist_to_gregorian,
    extract_amount, extract_date,
};
pub use models::config::{OcrConfig, ScanConfig, SlipscanConfig};
pub use models::slip::{ScanSummary, SlipExtraction, SlipRecord};
pub use ocr::{TextLine, TextRecognizer};
pub use photos::{ImageRef, PhotoLibrary};
pub use scan::{
    FixedSampler, JobState, MemoryPressureSource, ProgressSnapshot, ProgressTracker, ScanEvent,
    ScanJob, SlipChunk,
};
pub use service::{ErrorCode, ScanService, ServiceError, SingleScanResult};
