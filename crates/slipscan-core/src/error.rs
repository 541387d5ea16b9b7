//! Error types for the slipscan-core library.

use thiserror::Error;

/// Main error type for the slipscan library.
#[derive(Error, Debug)]
pub enum SlipscanError {
    /// Text recognition error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Photo library error.
    #[error("photo library error: {0}")]
    Photo(#[from] PhotoError),

    /// Bulk scan error.
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors from the text recognition engine.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// No recognition engine is available on this host.
    #[error("recognition engine unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the photo library.
#[derive(Error, Debug)]
pub enum PhotoError {
    /// Access to the photo library was denied.
    #[error("photo library access denied: {0}")]
    PermissionDenied(String),

    /// Listing the library contents failed.
    #[error("enumeration failed: {0}")]
    Enumeration(String),

    /// A single image could not be loaded or decoded.
    #[error("failed to load image {id}: {reason}")]
    Load { id: String, reason: String },
}

/// Errors raised by a bulk scan run.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The photo library could not be enumerated.
    #[error("enumeration failed: {0}")]
    Enumeration(#[from] PhotoError),

    /// The run was cancelled by the caller.
    #[error("scan cancelled")]
    Cancelled,
}

/// Result type for the slipscan library.
pub type Result<T> = std::result::Result<T, SlipscanError>;
