//! Image intake: media-type validation and the staged-image handle lifecycle.
//!
//! A staged image is referenced through an [`ImageHandle`], a revocable
//! `blob:`-style reference to the file bytes. The intake holds at most one live
//! handle; staging a new file or clearing releases the previous one first.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;

const IMAGE_MEDIA_PREFIX: &str = "image/";
const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

/// Errors raised while staging an image.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    /// The declared media type is not an image type.
    #[error("Only image files can be used (got '{media_type}')")]
    InvalidMediaType { media_type: String },
    /// The file could not be read from disk.
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },
}

/// A user-selected file with its declared media type.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Arc<[u8]>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, declaring its media type from the extension.
    pub fn from_path(path: &Path) -> Result<Self, IntakeError> {
        let bytes = std::fs::read(path).map_err(|err| IntakeError::Read {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(name, media_type_for_path(path), bytes))
    }

    fn is_image(&self) -> bool {
        self.media_type
            .trim()
            .get(..IMAGE_MEDIA_PREFIX.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(IMAGE_MEDIA_PREFIX))
    }
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Media type declared for a path, based on the image format table.
pub fn media_type_for_path(path: &Path) -> &'static str {
    image::ImageFormat::from_path(path)
        .map(|format| format.to_mime_type())
        .unwrap_or(UNKNOWN_MEDIA_TYPE)
}

/// Opaque revocable reference to staged image content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHandle(Uuid);

impl ImageHandle {
    /// Stable URL form of the handle, suitable for display layers.
    pub fn url(&self) -> String {
        format!("blob:shape-hunter/{}", self.0)
    }
}

/// The currently staged image.
#[derive(Debug, Clone)]
pub struct StagedImage {
    pub handle: ImageHandle,
    pub source: SelectedFile,
}

impl StagedImage {
    /// Owned copy of what the classifier upload needs.
    pub fn payload(&self) -> ImagePayload {
        ImagePayload {
            file_name: self.source.name.clone(),
            media_type: self.source.media_type.clone(),
            bytes: Arc::clone(&self.source.bytes),
        }
    }
}

/// Image content handed to background classification.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Arc<[u8]>,
}

/// Stages at most one image at a time and owns its handle.
#[derive(Debug, Default)]
pub struct ImageIntake {
    staged: Option<StagedImage>,
    live: HashMap<ImageHandle, Arc<[u8]>>,
}

impl ImageIntake {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and stage a file, replacing any staged image.
    ///
    /// A rejected file leaves the current staging untouched.
    pub fn stage(&mut self, file: SelectedFile) -> Result<&StagedImage, IntakeError> {
        if !file.is_image() {
            return Err(IntakeError::InvalidMediaType {
                media_type: file.media_type.clone(),
            });
        }
        self.clear();
        let handle = ImageHandle(Uuid::new_v4());
        self.live.insert(handle, Arc::clone(&file.bytes));
        tracing::debug!("Staged {} as {}", file.name, handle.url());
        Ok(self.staged.insert(StagedImage {
            handle,
            source: file,
        }))
    }

    /// Release the staged image, if any.
    pub fn clear(&mut self) {
        if let Some(previous) = self.staged.take() {
            self.release(previous.handle);
        }
    }

    /// Release a handle. Unknown or already released handles are ignored.
    pub fn release(&mut self, handle: ImageHandle) {
        if self.live.remove(&handle).is_some() {
            tracing::debug!("Released {}", handle.url());
        }
        if self
            .staged
            .as_ref()
            .is_some_and(|staged| staged.handle == handle)
        {
            self.staged = None;
        }
    }

    /// Content behind a live handle.
    pub fn resolve(&self, handle: ImageHandle) -> Option<&[u8]> {
        self.live.get(&handle).map(|bytes| &bytes[..])
    }

    pub fn staged(&self) -> Option<&StagedImage> {
        self.staged.as_ref()
    }

    pub fn is_staged(&self) -> bool {
        self.staged.is_some()
    }

    pub fn live_handle_count(&self) -> usize {
        self.live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn png(name: &str, bytes: &[u8]) -> SelectedFile {
        SelectedFile::new(name, "image/png", bytes.to_vec())
    }

    #[test]
    fn restaging_releases_previous_handle() {
        let mut intake = ImageIntake::new();
        let first = intake.stage(png("a.png", b"aaaa")).unwrap().handle;
        let second = intake.stage(png("b.png", b"bbbb")).unwrap().handle;

        assert_ne!(first, second);
        assert_eq!(intake.live_handle_count(), 1);
        assert_eq!(intake.resolve(first), None);
        assert_eq!(intake.resolve(second), Some(&b"bbbb"[..]));
        assert_eq!(intake.staged().unwrap().source.name, "b.png");
    }

    #[test]
    fn rejects_non_image_without_touching_staging() {
        let mut intake = ImageIntake::new();
        let handle = intake.stage(png("a.png", b"aaaa")).unwrap().handle;
        let err = intake
            .stage(SelectedFile::new("notes.txt", "text/plain", b"hi".to_vec()))
            .unwrap_err();
        assert_eq!(
            err,
            IntakeError::InvalidMediaType {
                media_type: "text/plain".to_string()
            }
        );
        assert_eq!(intake.staged().unwrap().handle, handle);
        assert_eq!(intake.live_handle_count(), 1);
    }

    #[test]
    fn media_type_check_is_case_insensitive() {
        let mut intake = ImageIntake::new();
        assert!(
            intake
                .stage(SelectedFile::new("a.JPG", "IMAGE/JPEG", vec![1]))
                .is_ok()
        );
        assert!(
            intake
                .stage(SelectedFile::new("a", "imag", vec![1]))
                .is_err()
        );
    }

    #[test]
    fn clear_and_release_are_idempotent() {
        let mut intake = ImageIntake::new();
        intake.clear();
        let handle = intake.stage(png("a.png", b"a")).unwrap().handle;
        intake.release(handle);
        intake.release(handle);
        intake.clear();
        assert!(!intake.is_staged());
        assert_eq!(intake.live_handle_count(), 0);
    }

    #[test]
    fn handle_url_is_blob_style() {
        let mut intake = ImageIntake::new();
        let handle = intake.stage(png("a.png", b"a")).unwrap().handle;
        assert!(handle.url().starts_with("blob:shape-hunter/"));
    }

    #[test]
    fn from_path_declares_media_type_from_extension() {
        let dir = tempdir().unwrap();
        let image_path = dir.path().join("photo.png");
        std::fs::write(&image_path, b"not really a png").unwrap();
        let file = SelectedFile::from_path(&image_path).unwrap();
        assert_eq!(file.media_type, "image/png");
        assert_eq!(file.name, "photo.png");

        let text_path = dir.path().join("notes.txt");
        std::fs::write(&text_path, b"hello").unwrap();
        let file = SelectedFile::from_path(&text_path).unwrap();
        assert_eq!(file.media_type, "application/octet-stream");
        assert!(ImageIntake::new().stage(file).is_err());
    }
}
