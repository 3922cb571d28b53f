use std::path::PathBuf;
use thiserror::Error;

/// Fatal run-level errors. Anything here terminates the run with exit code 1.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No eligible media files found in {}", .0.display())]
    NoFiles(PathBuf),

    #[error("Required tool '{tool}' not found. {hint}")]
    ToolMissing { tool: String, hint: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors talking to the asset server through its CLI.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with status {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Could not parse server output: {0}")]
    Parse(String),
}

/// Errors from the EXIF / image transform tools.
#[derive(Debug, Error)]
pub enum OrientationError {
    #[error("Failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' failed on {}: {stderr}", path.display())]
    ToolFailed {
        program: String,
        path: PathBuf,
        stderr: String,
    },

    #[error("Invalid orientation value '{0}'")]
    InvalidValue(String),

    /// Pixels were rewritten but the tag still holds the old orientation, so
    /// viewers would apply the rotation a second time.
    #[error("{} was rotated but its orientation tag could not be reset: {source}", path.display())]
    TagNotReset {
        path: PathBuf,
        #[source]
        source: Box<OrientationError>,
    },
}

impl OrientationError {
    /// True when the file on disk was changed before the error happened.
    pub fn left_file_modified(&self) -> bool {
        matches!(self, Self::TagNotReset { .. })
    }
}
