use crate::config::Config;
use crate::error::PipelineError;
use crate::models::{
    format_bytes, Batch, BatchOutcome, BatchStatus, MediaKind, RunOutcome, RunSummary,
    UploadReport,
};
use crate::services::batch::partition;
use crate::services::delete::delete_files;
use crate::services::immich::AssetServer;
use crate::services::orientation::{auto_rotate, Orienter};
use crate::services::run_log::{LogCategory, RunLog};
use crate::services::scan::discover;
use crate::services::verify::{verify, Verdict};
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

/// Yes/no gate shown before anything is uploaded or deleted.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> std::io::Result<bool>;
}

/// A decision made ahead of time (`--yes`, tests, automation).
#[derive(Debug, Clone, Copy)]
pub struct Preset(pub bool);

impl Confirm for Preset {
    fn confirm(&mut self, _prompt: &str) -> std::io::Result<bool> {
        Ok(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Scanning,
    Confirming,
    Processing(usize),
    Summarizing,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scanning => write!(f, "scanning"),
            Self::Confirming => write!(f, "confirming"),
            Self::Processing(i) => write!(f, "processing batch {}", i),
            Self::Summarizing => write!(f, "summarizing"),
            Self::Done => write!(f, "done"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub album: String,
    pub concurrency: usize,
    pub batch_size: usize,
    pub settle_delay: Duration,
    pub batch_delay: Duration,
    pub max_files: Option<usize>,
    pub extensions: Vec<String>,
    pub delete_after_upload: bool,
    pub hash_before_delete: bool,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            album: config.server.album.clone(),
            concurrency: config.server.concurrency,
            batch_size: config.upload.batch_size,
            settle_delay: config.upload.settle_delay(),
            batch_delay: config.upload.batch_delay(),
            max_files: config.upload.max_files,
            extensions: config.normalized_extensions(),
            delete_after_upload: config.upload.delete_after_upload,
            hash_before_delete: config.upload.hash_before_delete,
        }
    }
}

/// Scan, confirm, then upload → verify → delete one batch at a time.
///
/// Batches never overlap: verification compares the server's global asset
/// count before and after each upload, which only means something while this
/// run is the only thing we are doing to the server.
pub struct Pipeline<'a> {
    server: &'a dyn AssetServer,
    orienter: Option<&'a dyn Orienter>,
    log: &'a RunLog,
    options: PipelineOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(server: &'a dyn AssetServer, log: &'a RunLog, options: PipelineOptions) -> Self {
        Self {
            server,
            orienter: None,
            log,
            options,
        }
    }

    /// Auto-rotate rotatable images right before their batch is uploaded.
    pub fn with_orienter(mut self, orienter: &'a dyn Orienter) -> Self {
        self.orienter = Some(orienter);
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    fn enter(&self, state: RunState) {
        tracing::debug!("Pipeline state: {}", state);
    }

    pub async fn run(
        &self,
        dir: &Path,
        confirm: &mut dyn Confirm,
    ) -> Result<RunOutcome, PipelineError> {
        self.enter(RunState::Scanning);
        let files = discover(dir, &self.options.extensions, self.options.max_files)?;
        if files.is_empty() {
            self.log.record(
                LogCategory::Error,
                format!("No eligible media files found in {}", dir.display()),
            );
            return Err(PipelineError::NoFiles(dir.to_path_buf()));
        }

        let total_files = files.len();
        let total_bytes: u64 = files.iter().map(|f| f.size_bytes).sum();
        let videos = files.iter().filter(|f| f.kind == MediaKind::Video).count();
        let batches = partition(files, self.options.batch_size);
        let total_batches = batches.len();

        self.log.record(
            LogCategory::Progress,
            format!(
                "Found {} files ({} images, {} videos, {}) in {}; {} batches of up to {} into album '{}'",
                total_files,
                total_files - videos,
                videos,
                format_bytes(total_bytes),
                dir.display(),
                total_batches,
                self.options.batch_size,
                self.options.album
            ),
        );

        self.enter(RunState::Confirming);
        let action = if self.options.delete_after_upload {
            "and DELETE the local originals once each batch is verified"
        } else {
            "and keep the local originals"
        };
        let prompt = format!(
            "Upload {} files to album '{}' {}?",
            total_files, self.options.album, action
        );
        if !confirm.confirm(&prompt)? {
            self.log
                .record(LogCategory::Progress, "Cancelled before any upload");
            return Ok(RunOutcome::Cancelled {
                discovered: total_files,
            });
        }

        let initial_count = match self.server.asset_count().await {
            Ok(count) => {
                self.log.record(
                    LogCategory::Verification,
                    format!("Initial server asset count: {}", count),
                );
                Some(count)
            }
            Err(e) => {
                self.log.record(
                    LogCategory::Error,
                    format!("Could not read initial server asset count: {}", e),
                );
                None
            }
        };

        let mut summary = RunSummary::new(total_files, initial_count);
        for batch in &batches {
            self.enter(RunState::Processing(batch.index));
            let outcome = self.process_batch(batch, total_batches).await;
            summary = summary.absorb(&outcome);
            pause(self.options.batch_delay).await;
        }

        self.enter(RunState::Summarizing);
        self.summarize(&mut summary).await;

        self.enter(RunState::Done);
        Ok(RunOutcome::Completed(summary))
    }

    /// Runs one batch through upload and verification, deleting its files only
    /// when verification passes. Never fails: problems become the batch status.
    pub async fn process_batch(&self, batch: &Batch, total_batches: usize) -> BatchOutcome {
        let index = batch.index;
        let count = batch.len();
        self.log.record(
            LogCategory::Progress,
            format!(
                "Batch {}/{}: uploading {} files ({})",
                index,
                total_batches,
                count,
                format_bytes(batch.total_bytes())
            ),
        );

        let unreadable: Vec<String> = batch
            .files
            .iter()
            .filter(|f| File::open(&f.path).is_err())
            .map(|f| f.file_name())
            .collect();
        if !unreadable.is_empty() {
            return self.fail(
                index,
                count,
                0,
                BatchStatus::UploadFailed(format!(
                    "{} file(s) missing or unreadable: {}",
                    unreadable.len(),
                    unreadable.join(", ")
                )),
                None,
            );
        }

        let mut rotated = 0;
        let mut half_rotated = Vec::new();
        if let Some(orienter) = self.orienter {
            for file in &batch.files {
                match auto_rotate(orienter, file).await {
                    Ok(true) => rotated += 1,
                    Ok(false) => {}
                    Err(e) => {
                        self.log.record(
                            LogCategory::Error,
                            format!("Failed to auto-rotate {}: {}", file.path.display(), e),
                        );
                        if e.left_file_modified() {
                            rotated += 1;
                            half_rotated.push(file.file_name());
                        }
                    }
                }
            }
            if rotated > 0 {
                self.log.record(
                    LogCategory::Progress,
                    format!("Batch {}: auto-rotated {} images", index, rotated),
                );
            }
        }

        if !half_rotated.is_empty() {
            return self.fail(
                index,
                count,
                rotated,
                BatchStatus::UploadFailed(format!(
                    "orientation tag not reset after rotation: {}",
                    half_rotated.join(", ")
                )),
                None,
            );
        }

        let before = match self.server.asset_count().await {
            Ok(c) => c,
            Err(e) => {
                return self.fail(
                    index,
                    count,
                    rotated,
                    BatchStatus::UploadFailed(format!("could not read server asset count: {}", e)),
                    None,
                );
            }
        };

        let report = match self
            .server
            .upload(&batch.paths(), &self.options.album, self.options.concurrency)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                return self.fail(
                    index,
                    count,
                    rotated,
                    BatchStatus::UploadFailed(e.to_string()),
                    None,
                );
            }
        };

        if !report.success {
            let reason = format!("upload command exited non-zero: {}", report.message);
            return self.fail(
                index,
                count,
                rotated,
                BatchStatus::UploadFailed(reason),
                Some(report),
            );
        }

        self.log.record(
            LogCategory::Progress,
            format!(
                "Batch {}: server reported {} new assets, {} duplicates",
                index, report.new_files, report.duplicates
            ),
        );

        pause(self.options.settle_delay).await;

        let after = match self.server.asset_count().await {
            Ok(c) => c,
            Err(e) => {
                let reason = format!("could not re-read server asset count: {}", e);
                return self.fail(
                    index,
                    count,
                    rotated,
                    BatchStatus::VerificationFailed(reason),
                    Some(report),
                );
            }
        };

        let verdict = verify(before, after, &report);
        self.log.record(
            LogCategory::Verification,
            format!(
                "Batch {}: before={} after={} new={} duplicates={} -> {}",
                index, before, after, report.new_files, report.duplicates, verdict
            ),
        );

        if let Verdict::Fail(reason) = verdict {
            return self.fail(
                index,
                count,
                rotated,
                BatchStatus::VerificationFailed(reason.to_string()),
                Some(report),
            );
        }

        self.log.record(
            LogCategory::Success,
            format!("Batch {}: uploaded and verified {} files", index, count),
        );
        for file in &batch.files {
            self.log
                .record(LogCategory::Success, file.path.display().to_string());
        }

        let mut outcome = BatchOutcome {
            index,
            file_count: count,
            status: BatchStatus::Verified,
            report: Some(report),
            rotated,
            deleted: Vec::new(),
            delete_failures: Vec::new(),
            hashes: Vec::new(),
        };

        if !self.options.delete_after_upload {
            self.log.record(
                LogCategory::Progress,
                format!("Batch {}: keeping local originals", index),
            );
            return outcome;
        }

        let deletion = delete_files(&batch.files, self.options.hash_before_delete);
        for (path, digest) in &deletion.hashes {
            self.log.record(
                LogCategory::Deletion,
                format!("sha256 {} {}", digest, path.display()),
            );
        }
        for path in &deletion.deleted {
            self.log
                .record(LogCategory::Deletion, format!("Deleted {}", path.display()));
        }
        for (path, error) in &deletion.failures {
            self.log.record(
                LogCategory::Error,
                format!("Failed to delete {}: {}", path.display(), error),
            );
        }
        self.log.record(
            LogCategory::Progress,
            format!(
                "Batch {}: deleted {}/{} local files",
                index,
                deletion.deleted.len(),
                count
            ),
        );

        outcome.deleted = deletion.deleted;
        outcome.delete_failures = deletion.failures;
        outcome.hashes = deletion.hashes;
        outcome
    }

    fn fail(
        &self,
        index: usize,
        count: usize,
        rotated: usize,
        status: BatchStatus,
        report: Option<UploadReport>,
    ) -> BatchOutcome {
        self.log.record(
            LogCategory::Error,
            format!("Batch {}: {}; keeping {} local files", index, status, count),
        );
        let mut outcome = BatchOutcome::failed(index, count, status);
        outcome.report = report;
        outcome.rotated = rotated;
        outcome
    }

    async fn summarize(&self, summary: &mut RunSummary) {
        match self.server.asset_count().await {
            Ok(count) => summary.final_count = Some(count),
            Err(e) => self.log.record(
                LogCategory::Error,
                format!("Could not read final server asset count: {}", e),
            ),
        }

        let expected = summary.expected_final_count();
        if let (Some(expected), Some(actual)) = (expected, summary.final_count) {
            let message = match summary.shortfall() {
                Some(missing) => format!(
                    "Final server count {} is {} short of expected {}",
                    actual, missing, expected
                ),
                None => format!(
                    "Final server count {} meets expected minimum {}",
                    actual, expected
                ),
            };
            self.log.record(LogCategory::Verification, message);
        }

        self.log
            .record(LogCategory::Progress, format!("Run complete: {}", summary));
        if summary.delete_failures > 0 {
            self.log.record(
                LogCategory::Error,
                format!("{} verified files could not be deleted", summary.delete_failures),
            );
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
