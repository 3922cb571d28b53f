use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "heic", "heif", "tiff", "tif", "gif"];
const VIDEO_EXTENSIONS: &[&str] = &["mov", "mp4", "avi"];

/// Containers that carry an EXIF orientation tag we can act on.
const ROTATABLE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "heic", "heif", "tiff", "tif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = extension_of(path)?;
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Video)
        } else {
            None
        }
    }
}

/// A local file that is a candidate for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub kind: MediaKind,
}

impl MediaFile {
    pub fn new(path: PathBuf, size_bytes: u64) -> Self {
        // Unknown extensions can still be allowed through config; treat them as images.
        let kind = MediaKind::from_path(&path).unwrap_or(MediaKind::Image);
        Self {
            path,
            size_bytes,
            kind,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn is_rotatable(&self) -> bool {
        extension_of(&self.path)
            .map(|ext| ROTATABLE_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
    }
}

/// Lowercased extension without the dot.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}
