//! Text recognition boundary.
//!
//! The scan pipeline treats OCR as a black box behind [`TextRecognizer`]:
//! an image goes in, recognized lines come out in top-to-bottom reading
//! order. Hosts plug in whatever engine the platform provides.

use async_trait::async_trait;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;
use crate::photos::ImageRef;

/// One recognized line of text, top candidate only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    /// Recognized text content.
    pub text: String,

    /// Recognition confidence (0.0 - 1.0).
    pub confidence: f32,
}

impl TextLine {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Text recognition engine.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognize text lines in a decoded image.
    ///
    /// `photo` identifies the source asset; `languages` are hints in
    /// priority order. Lines come back in reading order.
    async fn recognize(
        &self,
        photo: &ImageRef,
        image: &DynamicImage,
        languages: &[String],
    ) -> Result<Vec<TextLine>, OcrError>;
}

/// Drop lines below the confidence floor.
pub fn filter_by_confidence(lines: Vec<TextLine>, min_confidence: f32) -> Vec<TextLine> {
    if min_confidence <= 0.0 {
        return lines;
    }
    lines
        .into_iter()
        .filter(|line| line.confidence >= min_confidence)
        .collect()
}
