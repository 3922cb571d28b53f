use crate::models::MediaFile;
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct DeleteReport {
    pub deleted: Vec<PathBuf>,
    pub failures: Vec<(PathBuf, String)>,
    /// (path, sha256 hex) for files hashed before removal. Audit only.
    pub hashes: Vec<(PathBuf, String)>,
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Removes every file of a verified batch. One failure never stops the rest.
pub fn delete_files(files: &[MediaFile], hash: bool) -> DeleteReport {
    let mut report = DeleteReport::default();

    for file in files {
        if hash {
            match sha256_file(&file.path) {
                Ok(digest) => report.hashes.push((file.path.clone(), digest)),
                Err(e) => tracing::warn!("Could not hash {}: {:#}", file.path.display(), e),
            }
        }

        match std::fs::remove_file(&file.path) {
            Ok(()) => report.deleted.push(file.path.clone()),
            Err(e) => report.failures.push((file.path.clone(), e.to_string())),
        }
    }

    report
}
