//! Filesystem-backed photo library and sidecar text recognition.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use image::DynamicImage;
use tracing::debug;
use walkdir::WalkDir;

use slipscan_core::error::{OcrError, PhotoError};
use slipscan_core::ocr::{TextLine, TextRecognizer};
use slipscan_core::photos::{ImageRef, PhotoLibrary};

/// Extensions treated as scannable photos.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "heic", "webp", "bmp", "tif", "tiff"];

/// Photo library rooted at a directory, walked recursively.
pub struct DirectoryLibrary {
    root: PathBuf,
    limit: Option<usize>,
}

impl DirectoryLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            limit: None,
        }
    }

    /// Cap enumeration at the newest `limit` images.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[async_trait]
impl PhotoLibrary for DirectoryLibrary {
    async fn enumerate(&self) -> Result<Vec<ImageRef>, PhotoError> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.map_err(|e| {
                if e.io_error().map(|io| io.kind()) == Some(ErrorKind::PermissionDenied) {
                    PhotoError::PermissionDenied(e.to_string())
                } else {
                    PhotoError::Enumeration(e.to_string())
                }
            })?;
            if entry.file_type().is_file() && is_image(entry.path()) {
                let modified = entry
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .unwrap_or(UNIX_EPOCH);
                entries.push((modified, entry.into_path()));
            }
        }

        // Newest first, like a camera roll
        entries.sort_by(|a, b| b.0.cmp(&a.0));

        let limit = self.limit.unwrap_or(usize::MAX);
        Ok(entries
            .into_iter()
            .take(limit)
            .map(|(_, path)| ImageRef::new(path.to_string_lossy()))
            .collect())
    }

    async fn load(&self, photo: &ImageRef) -> Result<DynamicImage, PhotoError> {
        let id = photo.id.clone();
        let path = PathBuf::from(&id);
        tokio::task::spawn_blocking(move || {
            image::open(&path).map_err(|e| PhotoError::Load {
                id: path.to_string_lossy().into_owned(),
                reason: e.to_string(),
            })
        })
        .await
        .map_err(|e| PhotoError::Load {
            id,
            reason: e.to_string(),
        })?
    }
}

/// Reads recognized text from a sidecar file next to each image.
///
/// For `photo.jpg` the sidecar is `photo.jpg.txt`. A missing sidecar
/// reads as a photo with no text, which keeps bulk scans moving across
/// directories that are only partially transcribed.
pub struct SidecarRecognizer;

fn sidecar_path(photo: &ImageRef) -> PathBuf {
    let mut os: OsString = photo.id.clone().into();
    os.push(".txt");
    PathBuf::from(os)
}

#[async_trait]
impl TextRecognizer for SidecarRecognizer {
    async fn recognize(
        &self,
        photo: &ImageRef,
        _image: &DynamicImage,
        _languages: &[String],
    ) -> Result<Vec<TextLine>, OcrError> {
        let path = sidecar_path(photo);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no sidecar text for {}", photo.id);
                return Ok(Vec::new());
            }
            Err(e) => return Err(OcrError::Recognition(e.to_string())),
        };

        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| TextLine::new(line, 1.0))
            .collect())
    }
}
