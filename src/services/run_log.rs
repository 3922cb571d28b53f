use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogCategory {
    Progress,
    Success,
    Error,
    Verification,
    Deletion,
}

impl LogCategory {
    pub const ALL: [LogCategory; 5] = [
        Self::Progress,
        Self::Success,
        Self::Error,
        Self::Verification,
        Self::Deletion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Progress => "progress",
            Self::Success => "success",
            Self::Error => "error",
            Self::Verification => "verification",
            Self::Deletion => "deletion",
        }
    }
}

/// Append-only, human-readable record of one run: one file per category.
#[derive(Debug, Default)]
pub struct RunLog {
    files: BTreeMap<LogCategory, (PathBuf, File)>,
}

impl RunLog {
    /// Opens `<category>_<YYYYmmdd_HHMMSS>.log` for every category under `dir`.
    pub fn create(dir: &Path, started_at: DateTime<Local>) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

        let stamp = started_at.format("%Y%m%d_%H%M%S");
        let mut files = BTreeMap::new();
        for category in LogCategory::ALL {
            let path = dir.join(format!("{}_{}.log", category.as_str(), stamp));
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            files.insert(category, (path, file));
        }

        Ok(Self { files })
    }

    /// Records through tracing only.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn path(&self, category: LogCategory) -> Option<&Path> {
        self.files.get(&category).map(|(p, _)| p.as_path())
    }

    pub fn record(&self, category: LogCategory, message: impl AsRef<str>) {
        let message = message.as_ref();
        match category {
            LogCategory::Error => tracing::error!(category = category.as_str(), "{}", message),
            LogCategory::Verification | LogCategory::Deletion => {
                tracing::debug!(category = category.as_str(), "{}", message)
            }
            LogCategory::Progress | LogCategory::Success => {
                tracing::info!(category = category.as_str(), "{}", message)
            }
        }

        if let Some((path, file)) = self.files.get(&category) {
            let line = format!("[{}] {}\n", Local::now().format("%Y-%m-%d %H:%M:%S"), message);
            let mut handle: &File = file;
            if let Err(e) = handle.write_all(line.as_bytes()).and_then(|_| handle.flush()) {
                tracing::warn!("Failed to write run log {}: {}", path.display(), e);
            }
        }
    }
}
