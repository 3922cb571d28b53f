use crate::error::OrientationError;
use crate::models::MediaFile;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;

/// EXIF orientation tag (0x0112), values 1 through 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Normal = 1,
    FlipHorizontal = 2,
    Rotate180 = 3,
    FlipVertical = 4,
    Transpose = 5,
    Rotate90Cw = 6,
    Transverse = 7,
    Rotate90Ccw = 8,
}

impl Orientation {
    pub const ALL: [Orientation; 8] = [
        Self::Normal,
        Self::FlipHorizontal,
        Self::Rotate180,
        Self::FlipVertical,
        Self::Transpose,
        Self::Rotate90Cw,
        Self::Transverse,
        Self::Rotate90Ccw,
    ];

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.code() == code)
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Normal => "None (Normal)",
            Self::FlipHorizontal => "Flip horizontal",
            Self::Rotate180 => "Rotate 180°",
            Self::FlipVertical => "Flip vertical",
            Self::Transpose => "Rotate 90° CCW + flip",
            Self::Rotate90Cw => "Rotate 90° CW",
            Self::Transverse => "Rotate 90° CW + flip",
            Self::Rotate90Ccw => "Rotate 90° CCW",
        }
    }

    /// Pixel transform that makes an image with this tag display upright.
    pub fn transform(self) -> Transform {
        match self {
            Self::Normal => Transform::None,
            Self::FlipHorizontal => Transform::FlipHorizontal,
            Self::Rotate180 => Transform::Rotate180,
            Self::FlipVertical => Transform::FlipVertical,
            Self::Transpose => Transform::Transpose,
            Self::Rotate90Cw => Transform::Rotate90,
            Self::Transverse => Transform::Transverse,
            Self::Rotate90Ccw => Transform::Rotate270,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.code(), self.description())
    }
}

/// Rotations are clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    None,
    FlipHorizontal,
    Rotate180,
    FlipVertical,
    Transpose,
    Rotate90,
    Transverse,
    Rotate270,
}

impl Transform {
    /// ImageMagick operators implementing this transform.
    pub fn magick_args(self) -> &'static [&'static str] {
        match self {
            Self::None => &[],
            Self::FlipHorizontal => &["-flop"],
            Self::Rotate180 => &["-rotate", "180"],
            Self::FlipVertical => &["-flip"],
            Self::Transpose => &["-transpose"],
            Self::Rotate90 => &["-rotate", "90"],
            Self::Transverse => &["-transverse"],
            Self::Rotate270 => &["-rotate", "270"],
        }
    }

    /// The transform that undoes this one.
    pub fn inverse(self) -> Self {
        match self {
            Self::Rotate90 => Self::Rotate270,
            Self::Rotate270 => Self::Rotate90,
            other => other,
        }
    }
}

#[async_trait]
pub trait Orienter: Send + Sync {
    async fn read(&self, path: &Path) -> Result<Orientation, OrientationError>;

    async fn apply(&self, path: &Path, transform: Transform) -> Result<(), OrientationError>;

    /// Rewrites the orientation tag to 1 without touching pixels.
    async fn reset(&self, path: &Path) -> Result<(), OrientationError>;
}

/// exiftool for the tag, ImageMagick for the pixels. Both rewrite in place.
#[derive(Debug, Clone)]
pub struct ExternalOrienter {
    exiftool: String,
    magick: String,
}

impl ExternalOrienter {
    pub fn new(exiftool: impl Into<String>, magick: impl Into<String>) -> Self {
        Self {
            exiftool: exiftool.into(),
            magick: magick.into(),
        }
    }

    async fn run(
        program: &str,
        path: &Path,
        command: &mut Command,
    ) -> Result<Output, OrientationError> {
        let output = command
            .output()
            .await
            .map_err(|source| OrientationError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(OrientationError::ToolFailed {
                program: program.to_string(),
                path: path.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

#[async_trait]
impl Orienter for ExternalOrienter {
    async fn read(&self, path: &Path) -> Result<Orientation, OrientationError> {
        let output = Self::run(
            &self.exiftool,
            path,
            Command::new(&self.exiftool)
                .args(["-n", "-s3", "-Orientation"])
                .arg(path),
        )
        .await?;

        parse_orientation(&String::from_utf8_lossy(&output.stdout))
    }

    async fn apply(&self, path: &Path, transform: Transform) -> Result<(), OrientationError> {
        let args = transform.magick_args();
        if args.is_empty() {
            return Ok(());
        }
        Self::run(
            &self.magick,
            path,
            Command::new(&self.magick).arg(path).args(args).arg(path),
        )
        .await?;
        Ok(())
    }

    async fn reset(&self, path: &Path) -> Result<(), OrientationError> {
        Self::run(
            &self.exiftool,
            path,
            Command::new(&self.exiftool)
                .args(["-overwrite_original", "-n", "-Orientation=1"])
                .arg(path),
        )
        .await?;
        Ok(())
    }
}

/// Parses `exiftool -n -s3 -Orientation` output. A missing tag means upright.
pub fn parse_orientation(stdout: &str) -> Result<Orientation, OrientationError> {
    let value = stdout.trim();
    if value.is_empty() {
        return Ok(Orientation::Normal);
    }
    value
        .parse::<u8>()
        .ok()
        .and_then(Orientation::from_code)
        .ok_or_else(|| OrientationError::InvalidValue(value.to_string()))
}

/// Fixes the pixels of `file` to match its orientation tag, then resets the
/// tag to 1. Returns whether the file was changed.
///
/// When the reset fails the pixel change is undone. If that fails too the
/// result is `TagNotReset` and the file must not be uploaded in that state.
pub async fn auto_rotate(orienter: &dyn Orienter, file: &MediaFile) -> Result<bool, OrientationError> {
    if !file.is_rotatable() {
        return Ok(false);
    }

    let orientation = orienter.read(&file.path).await?;
    if orientation == Orientation::Normal {
        return Ok(false);
    }

    let transform = orientation.transform();
    orienter.apply(&file.path, transform).await?;
    if let Err(e) = orienter.reset(&file.path).await {
        // Put the pixels back so the file matches its tag again.
        if let Err(undo) = orienter.apply(&file.path, transform.inverse()).await {
            tracing::warn!("Could not undo rotation of {}: {}", file.path.display(), undo);
            return Err(OrientationError::TagNotReset {
                path: file.path.clone(),
                source: Box::new(e),
            });
        }
        return Err(e);
    }
    tracing::debug!("Rotated {} (was {})", file.path.display(), orientation);
    Ok(true)
}

/// Orientation of each rotatable file, in order. Read errors are kept per file.
pub async fn survey(
    orienter: &dyn Orienter,
    files: &[MediaFile],
) -> Vec<(PathBuf, Result<Orientation, OrientationError>)> {
    let mut results = Vec::with_capacity(files.len());
    for file in files.iter().filter(|f| f.is_rotatable()) {
        results.push((file.path.clone(), orienter.read(&file.path).await));
    }
    results
}
