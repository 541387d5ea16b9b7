//! Photo library boundary.

use async_trait::async_trait;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::PhotoError;

/// Stable reference to one image in a photo library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    /// Identifier the owning library can resolve back to pixel data.
    pub id: String,
}

impl ImageRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Source of scannable images.
///
/// Enumeration is cheap and returns references only; pixel data is
/// loaded lazily per image during the scan.
#[async_trait]
pub trait PhotoLibrary: Send + Sync {
    /// List every available image, newest first.
    async fn enumerate(&self) -> Result<Vec<ImageRef>, PhotoError>;

    /// Load and decode pixel data for one image.
    async fn load(&self, photo: &ImageRef) -> Result<DynamicImage, PhotoError>;
}
