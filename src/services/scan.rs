use crate::models::{extension_of, MediaFile};
use anyhow::{Context, Result};
use std::path::Path;

/// Lists eligible media in `dir` (non-recursive), sorted by path.
///
/// `extensions` must already be lowercased and dot-free.
pub fn discover(dir: &Path, extensions: &[String], max_files: Option<usize>) -> Result<Vec<MediaFile>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }
        let allowed = extension_of(&path)
            .map(|ext| extensions.iter().any(|e| *e == ext))
            .unwrap_or(false);
        if allowed {
            files.push(MediaFile::new(path, metadata.len()));
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    if let Some(max) = max_files {
        files.truncate(max);
    }

    tracing::debug!("Discovered {} media files in {}", files.len(), dir.display());
    Ok(files)
}
