use std::fmt;
use std::path::PathBuf;

/// Structured result of one `immich upload` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// CLI exit status was zero.
    pub success: bool,
    pub new_files: u64,
    pub duplicates: u64,
    /// stderr (or stdout when stderr is empty), trimmed. Only used for logs.
    pub message: String,
}

impl UploadReport {
    pub fn made_progress(&self) -> bool {
        self.new_files > 0 || self.duplicates > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStatus {
    Verified,
    VerificationFailed(String),
    UploadFailed(String),
}

impl BatchStatus {
    pub fn was_uploaded(&self) -> bool {
        !matches!(self, Self::UploadFailed(_))
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verified => write!(f, "verified"),
            Self::VerificationFailed(reason) => write!(f, "verification failed: {}", reason),
            Self::UploadFailed(reason) => write!(f, "upload failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub index: usize,
    pub file_count: usize,
    pub status: BatchStatus,
    pub report: Option<UploadReport>,
    pub rotated: usize,
    pub deleted: Vec<PathBuf>,
    pub delete_failures: Vec<(PathBuf, String)>,
    /// (path, sha256 hex) taken just before deletion.
    pub hashes: Vec<(PathBuf, String)>,
}

impl BatchOutcome {
    pub fn failed(index: usize, file_count: usize, status: BatchStatus) -> Self {
        Self {
            index,
            file_count,
            status,
            report: None,
            rotated: 0,
            deleted: Vec::new(),
            delete_failures: Vec::new(),
            hashes: Vec::new(),
        }
    }
}

/// Totals for a whole run, built by folding batch outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total_files: usize,
    pub batches: usize,
    pub uploaded: usize,
    pub verified: usize,
    pub deleted: usize,
    pub failed: usize,
    pub delete_failures: usize,
    pub rotated: usize,
    /// New assets reported by verified batches.
    pub new_assets: u64,
    pub duplicates: u64,
    pub initial_count: Option<u64>,
    pub final_count: Option<u64>,
}

impl RunSummary {
    pub fn new(total_files: usize, initial_count: Option<u64>) -> Self {
        Self {
            total_files,
            initial_count,
            ..Self::default()
        }
    }

    pub fn absorb(mut self, outcome: &BatchOutcome) -> Self {
        self.batches += 1;
        self.rotated += outcome.rotated;

        if outcome.status.was_uploaded() {
            self.uploaded += outcome.file_count;
            if let Some(report) = &outcome.report {
                self.duplicates += report.duplicates;
            }
        }

        if outcome.status.is_verified() {
            self.verified += outcome.file_count;
            if let Some(report) = &outcome.report {
                self.new_assets += report.new_files;
            }
        } else {
            self.failed += outcome.file_count;
        }

        self.deleted += outcome.deleted.len();
        self.delete_failures += outcome.delete_failures.len();
        self
    }

    pub fn expected_final_count(&self) -> Option<u64> {
        self.initial_count.map(|c| c + self.new_assets)
    }

    /// How far the final server count falls short of expectation, if at all.
    pub fn shortfall(&self) -> Option<u64> {
        let expected = self.expected_final_count()?;
        let actual = self.final_count?;
        (actual < expected).then(|| expected - actual)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "uploaded={}, verified={}, deleted={}, failed={} (of {} files in {} batches)",
            self.uploaded, self.verified, self.deleted, self.failed, self.total_files, self.batches
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Cancelled { discovered: usize },
    Completed(RunSummary),
}
