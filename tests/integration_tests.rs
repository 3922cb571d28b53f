use async_trait::async_trait;
use immich_batch::models::{Batch, BatchStatus, MediaFile, RunOutcome, RunSummary, UploadReport};
use immich_batch::services::delete::sha256_file;
use immich_batch::services::immich::AssetServer;
use immich_batch::services::orientation::{Orientation, Orienter, Transform};
use immich_batch::services::pipeline::{Pipeline, PipelineOptions, Preset};
use immich_batch::services::run_log::{LogCategory, RunLog};
use immich_batch::{OrientationError, PipelineError, ServerError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

/// What the fake server does with one `upload` call.
#[derive(Debug, Clone, Copy)]
enum Behavior {
    /// Every file becomes a new asset.
    Accept,
    /// CLI exits non-zero, nothing changes.
    ExitFailure,
    /// Every file already exists on the server.
    Duplicates,
    /// Report claims new assets but the server count does not move.
    PhantomAssets,
    /// Exit 0 with output we cannot parse.
    Silent,
}

#[derive(Default)]
struct FakeState {
    count: u64,
    uploads: Vec<Vec<PathBuf>>,
    count_queries: usize,
}

struct FakeServer {
    script: HashMap<usize, Behavior>,
    state: Mutex<FakeState>,
    /// `asset_count` fails once this many queries have been answered.
    count_limit: Option<usize>,
}

impl FakeServer {
    fn new(initial: u64) -> Self {
        Self {
            script: HashMap::new(),
            state: Mutex::new(FakeState {
                count: initial,
                ..FakeState::default()
            }),
            count_limit: None,
        }
    }

    fn count_limit(mut self, limit: usize) -> Self {
        self.count_limit = Some(limit);
        self
    }

    /// `call` is the 1-based upload invocation number.
    fn on_call(mut self, call: usize, behavior: Behavior) -> Self {
        self.script.insert(call, behavior);
        self
    }

    fn upload_calls(&self) -> usize {
        self.state.lock().unwrap().uploads.len()
    }

    fn count(&self) -> u64 {
        self.state.lock().unwrap().count
    }
}

#[async_trait]
impl AssetServer for FakeServer {
    async fn asset_count(&self) -> Result<u64, ServerError> {
        let mut state = self.state.lock().unwrap();
        if self.count_limit.is_some_and(|limit| state.count_queries >= limit) {
            return Err(ServerError::CommandFailed {
                command: "immich server-info".into(),
                code: Some(1),
                stderr: "Error: fetch failed".into(),
            });
        }
        state.count_queries += 1;
        Ok(state.count)
    }

    async fn upload(
        &self,
        paths: &[PathBuf],
        _album: &str,
        _concurrency: usize,
    ) -> Result<UploadReport, ServerError> {
        let mut state = self.state.lock().unwrap();
        for path in paths {
            assert!(path.exists(), "uploaded path must exist: {}", path.display());
        }
        state.uploads.push(paths.to_vec());
        let call = state.uploads.len();
        let n = paths.len() as u64;

        let report = match self.script.get(&call).copied().unwrap_or(Behavior::Accept) {
            Behavior::Accept => {
                state.count += n;
                UploadReport {
                    success: true,
                    new_files: n,
                    duplicates: 0,
                    message: String::new(),
                }
            }
            Behavior::ExitFailure => UploadReport {
                success: false,
                new_files: 0,
                duplicates: 0,
                message: "Error: connect ECONNREFUSED".into(),
            },
            Behavior::Duplicates => UploadReport {
                success: true,
                new_files: 0,
                duplicates: n,
                message: String::new(),
            },
            Behavior::PhantomAssets => UploadReport {
                success: true,
                new_files: n,
                duplicates: 0,
                message: String::new(),
            },
            Behavior::Silent => UploadReport {
                success: true,
                ..UploadReport::default()
            },
        };
        Ok(report)
    }
}

/// asset_count always fails.
struct UnreachableServer;

#[async_trait]
impl AssetServer for UnreachableServer {
    async fn asset_count(&self) -> Result<u64, ServerError> {
        Err(ServerError::Parse("no 'Total:' line in server-info output".into()))
    }

    async fn upload(
        &self,
        _paths: &[PathBuf],
        _album: &str,
        _concurrency: usize,
    ) -> Result<UploadReport, ServerError> {
        panic!("must not upload without a baseline count");
    }
}

#[derive(Default)]
struct FakeOrienter {
    tags: Mutex<HashMap<PathBuf, Orientation>>,
    applied: Mutex<Vec<(PathBuf, Transform)>>,
    /// Number of `apply` calls that succeed before the rest fail.
    apply_limit: Option<usize>,
    reset_fails: bool,
}

impl FakeOrienter {
    fn with_tag(self, path: PathBuf, orientation: Orientation) -> Self {
        self.tags.lock().unwrap().insert(path, orientation);
        self
    }

    fn apply_limit(mut self, limit: usize) -> Self {
        self.apply_limit = Some(limit);
        self
    }

    fn failing_reset(mut self) -> Self {
        self.reset_fails = true;
        self
    }
}

fn tool_failure(program: &str, path: &Path) -> OrientationError {
    OrientationError::ToolFailed {
        program: program.into(),
        path: path.to_path_buf(),
        stderr: "simulated failure".into(),
    }
}

#[async_trait]
impl Orienter for FakeOrienter {
    async fn read(&self, path: &Path) -> Result<Orientation, OrientationError> {
        Ok(self
            .tags
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .unwrap_or(Orientation::Normal))
    }

    async fn apply(&self, path: &Path, transform: Transform) -> Result<(), OrientationError> {
        let mut applied = self.applied.lock().unwrap();
        if self.apply_limit.is_some_and(|limit| applied.len() >= limit) {
            return Err(tool_failure("magick", path));
        }
        applied.push((path.to_path_buf(), transform));
        Ok(())
    }

    async fn reset(&self, path: &Path) -> Result<(), OrientationError> {
        if self.reset_fails {
            return Err(tool_failure("exiftool", path));
        }
        self.tags
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), Orientation::Normal);
        Ok(())
    }
}

fn options(batch_size: usize) -> PipelineOptions {
    PipelineOptions {
        album: "Test Album".into(),
        concurrency: 2,
        batch_size,
        settle_delay: Duration::ZERO,
        batch_delay: Duration::ZERO,
        max_files: None,
        extensions: ["jpg", "jpeg", "png", "heic", "mov", "mp4"]
            .iter()
            .map(|e| e.to_string())
            .collect(),
        delete_after_upload: true,
        hash_before_delete: true,
    }
}

fn make_files(dir: &Path, count: usize) -> Vec<PathBuf> {
    (1..=count)
        .map(|i| {
            let path = dir.join(format!("IMG_{:04}.jpg", i));
            std::fs::write(&path, format!("photo {}", i)).unwrap();
            path
        })
        .collect()
}

fn remaining(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn completed(outcome: RunOutcome) -> RunSummary {
    match outcome {
        RunOutcome::Completed(summary) => summary,
        other => panic!("expected a completed run, got {:?}", other),
    }
}

mod pipeline_tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_batch_keeps_its_files() {
        let dir = TempDir::new().unwrap();
        make_files(dir.path(), 12);
        let server = FakeServer::new(1000).on_call(2, Behavior::ExitFailure);
        let log = RunLog::disabled();

        let pipeline = Pipeline::new(&server, &log, options(5));
        let summary = completed(pipeline.run(dir.path(), &mut Preset(true)).await.unwrap());

        assert_eq!(summary.batches, 3);
        assert_eq!(summary.uploaded, 7);
        assert_eq!(summary.failed, 5);
        assert_eq!(summary.verified, 7);
        assert_eq!(summary.deleted, 7);
        assert_eq!(server.upload_calls(), 3);

        let expected: Vec<String> = (6..=10).map(|i| format!("IMG_{:04}.jpg", i)).collect();
        assert_eq!(remaining(dir.path()), expected);

        assert_eq!(summary.initial_count, Some(1000));
        assert_eq!(summary.final_count, Some(1007));
        assert_eq!(summary.shortfall(), None);
    }

    #[tokio::test]
    async fn test_deleted_subset_of_verified_subset_of_uploaded() {
        let dir = TempDir::new().unwrap();
        make_files(dir.path(), 10);
        let server = FakeServer::new(0)
            .on_call(1, Behavior::Accept)
            .on_call(2, Behavior::PhantomAssets)
            .on_call(3, Behavior::ExitFailure)
            .on_call(4, Behavior::Duplicates)
            .on_call(5, Behavior::Silent);
        let log = RunLog::disabled();

        let pipeline = Pipeline::new(&server, &log, options(2));
        let summary = completed(pipeline.run(dir.path(), &mut Preset(true)).await.unwrap());

        assert_eq!(summary.batches, 5);
        assert_eq!(summary.uploaded, 8);
        assert_eq!(summary.verified, 4);
        assert_eq!(summary.deleted, 4);
        assert_eq!(summary.failed, 6);
        assert!(summary.deleted <= summary.verified);
        assert!(summary.verified <= summary.uploaded);

        assert_eq!(
            remaining(dir.path()),
            vec![
                "IMG_0003.jpg",
                "IMG_0004.jpg",
                "IMG_0005.jpg",
                "IMG_0006.jpg",
                "IMG_0009.jpg",
                "IMG_0010.jpg",
            ]
        );
    }

    #[tokio::test]
    async fn test_no_progress_report_fails_verification() {
        let dir = TempDir::new().unwrap();
        make_files(dir.path(), 3);
        let server = FakeServer::new(50).on_call(1, Behavior::Silent);
        let log = RunLog::disabled();

        let pipeline = Pipeline::new(&server, &log, options(5));
        let batch = Batch {
            index: 1,
            files: immich_batch::services::scan::discover(
                dir.path(),
                &pipeline.options().extensions,
                None,
            )
            .unwrap(),
        };
        let outcome = pipeline.process_batch(&batch, 1).await;

        assert!(matches!(outcome.status, BatchStatus::VerificationFailed(_)));
        assert!(outcome.deleted.is_empty());
        assert_eq!(remaining(dir.path()).len(), 3);
    }

    #[tokio::test]
    async fn test_duplicates_only_batch_is_deleted() {
        let dir = TempDir::new().unwrap();
        make_files(dir.path(), 4);
        let server = FakeServer::new(10).on_call(1, Behavior::Duplicates);
        let log = RunLog::disabled();

        let pipeline = Pipeline::new(&server, &log, options(5));
        let summary = completed(pipeline.run(dir.path(), &mut Preset(true)).await.unwrap());

        assert_eq!(summary.verified, 4);
        assert_eq!(summary.deleted, 4);
        assert_eq!(summary.duplicates, 4);
        assert_eq!(summary.new_assets, 0);
        assert!(remaining(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_count_shortfall_keeps_files() {
        let dir = TempDir::new().unwrap();
        make_files(dir.path(), 3);
        let server = FakeServer::new(10).on_call(1, Behavior::PhantomAssets);
        let log = RunLog::disabled();

        let pipeline = Pipeline::new(&server, &log, options(5));
        let summary = completed(pipeline.run(dir.path(), &mut Preset(true)).await.unwrap());

        assert_eq!(summary.uploaded, 3);
        assert_eq!(summary.verified, 0);
        assert_eq!(summary.deleted, 0);
        assert_eq!(summary.failed, 3);
        assert_eq!(remaining(dir.path()).len(), 3);
    }

    #[tokio::test]
    async fn test_declined_confirmation_has_no_side_effects() {
        let dir = TempDir::new().unwrap();
        make_files(dir.path(), 6);
        let server = FakeServer::new(0);
        let log = RunLog::disabled();

        let pipeline = Pipeline::new(&server, &log, options(5));
        let outcome = pipeline.run(dir.path(), &mut Preset(false)).await.unwrap();

        assert_eq!(outcome, RunOutcome::Cancelled { discovered: 6 });
        assert_eq!(server.upload_calls(), 0);
        assert_eq!(remaining(dir.path()).len(), 6);
    }

    #[tokio::test]
    async fn test_empty_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not media").unwrap();
        let server = FakeServer::new(0);
        let log = RunLog::disabled();

        let pipeline = Pipeline::new(&server, &log, options(5));
        let result = pipeline.run(dir.path(), &mut Preset(true)).await;

        assert!(matches!(result, Err(PipelineError::NoFiles(_))));
        assert_eq!(server.upload_calls(), 0);
    }

    #[tokio::test]
    async fn test_rerun_on_leftovers_matches_fresh_run() {
        let dir = TempDir::new().unwrap();
        make_files(dir.path(), 12);
        let log = RunLog::disabled();

        let first = FakeServer::new(0).on_call(2, Behavior::ExitFailure);
        Pipeline::new(&first, &log, options(5))
            .run(dir.path(), &mut Preset(true))
            .await
            .unwrap();
        let leftovers = remaining(dir.path());
        assert_eq!(leftovers.len(), 5);

        let fresh_dir = TempDir::new().unwrap();
        for name in &leftovers {
            std::fs::write(fresh_dir.path().join(name), "photo").unwrap();
        }

        let rerun_server = FakeServer::new(0);
        let rerun = completed(
            Pipeline::new(&rerun_server, &log, options(5))
                .run(dir.path(), &mut Preset(true))
                .await
                .unwrap(),
        );
        let fresh_server = FakeServer::new(0);
        let fresh = completed(
            Pipeline::new(&fresh_server, &log, options(5))
                .run(fresh_dir.path(), &mut Preset(true))
                .await
                .unwrap(),
        );

        assert_eq!(rerun.batches, fresh.batches);
        assert_eq!(rerun.uploaded, fresh.uploaded);
        assert_eq!(rerun.verified, fresh.verified);
        assert_eq!(rerun.deleted, fresh.deleted);
        assert_eq!(rerun.failed, fresh.failed);

        let names = |server: &FakeServer| -> Vec<Vec<String>> {
            server
                .state
                .lock()
                .unwrap()
                .uploads
                .iter()
                .map(|batch| {
                    batch
                        .iter()
                        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                        .collect()
                })
                .collect()
        };
        assert_eq!(names(&rerun_server), names(&fresh_server));
        assert!(remaining(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_keep_originals_never_deletes() {
        let dir = TempDir::new().unwrap();
        make_files(dir.path(), 4);
        let server = FakeServer::new(0);
        let log = RunLog::disabled();

        let mut opts = options(2);
        opts.delete_after_upload = false;
        let summary = completed(
            Pipeline::new(&server, &log, opts)
                .run(dir.path(), &mut Preset(true))
                .await
                .unwrap(),
        );

        assert_eq!(summary.verified, 4);
        assert_eq!(summary.deleted, 0);
        assert_eq!(remaining(dir.path()).len(), 4);
        assert_eq!(server.count(), 4);
    }

    #[tokio::test]
    async fn test_scan_is_flat_filtered_and_capped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.JPG"), "x").unwrap();
        std::fs::write(dir.path().join("a.mov"), "x").unwrap();
        std::fs::write(dir.path().join("c.png"), "x").unwrap();
        std::fs::write(dir.path().join("readme.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("d.jpg"), "x").unwrap();

        let mut opts = options(10);
        opts.max_files = Some(2);
        let server = FakeServer::new(0);
        let log = RunLog::disabled();
        let summary = completed(
            Pipeline::new(&server, &log, opts)
                .run(dir.path(), &mut Preset(true))
                .await
                .unwrap(),
        );

        assert_eq!(summary.total_files, 2);
        let uploaded: Vec<String> = server.state.lock().unwrap().uploads[0]
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(uploaded, vec!["a.mov", "b.JPG"]);
        assert_eq!(remaining(dir.path()), vec!["c.png", "readme.txt"]);
        assert!(dir.path().join("nested").join("d.jpg").exists());
    }

    #[tokio::test]
    async fn test_missing_file_fails_batch_without_upload() {
        let dir = TempDir::new().unwrap();
        let files = make_files(dir.path(), 2);
        std::fs::remove_file(&files[1]).unwrap();

        let server = FakeServer::new(0);
        let log = RunLog::disabled();
        let pipeline = Pipeline::new(&server, &log, options(5));
        let batch = Batch {
            index: 1,
            files: files.into_iter().map(|p| MediaFile::new(p, 7)).collect(),
        };
        let outcome = pipeline.process_batch(&batch, 1).await;

        assert!(matches!(outcome.status, BatchStatus::UploadFailed(_)));
        assert_eq!(server.upload_calls(), 0);
        assert_eq!(remaining(dir.path()), vec!["IMG_0001.jpg"]);
    }

    #[tokio::test]
    async fn test_unreachable_server_never_uploads() {
        let dir = TempDir::new().unwrap();
        make_files(dir.path(), 3);
        let log = RunLog::disabled();

        let summary = completed(
            Pipeline::new(&UnreachableServer, &log, options(5))
                .run(dir.path(), &mut Preset(true))
                .await
                .unwrap(),
        );

        assert_eq!(summary.uploaded, 0);
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.initial_count, None);
        assert_eq!(remaining(dir.path()).len(), 3);
    }

    #[tokio::test]
    async fn test_lost_count_after_upload_keeps_files() {
        let dir = TempDir::new().unwrap();
        let files = make_files(dir.path(), 3);
        let server = FakeServer::new(20).count_limit(1);
        let log = RunLog::disabled();

        let pipeline = Pipeline::new(&server, &log, options(5));
        let batch = Batch {
            index: 1,
            files: files.into_iter().map(|p| MediaFile::new(p, 7)).collect(),
        };
        let outcome = pipeline.process_batch(&batch, 1).await;

        assert!(matches!(outcome.status, BatchStatus::VerificationFailed(_)));
        assert!(outcome.status.was_uploaded());
        assert_eq!(server.upload_calls(), 1);
        assert!(outcome.deleted.is_empty());
        assert_eq!(remaining(dir.path()).len(), 3);
    }

    #[tokio::test]
    async fn test_verified_batch_records_hashes() {
        let dir = TempDir::new().unwrap();
        let files = make_files(dir.path(), 2);
        let server = FakeServer::new(0);
        let log = RunLog::disabled();

        let pipeline = Pipeline::new(&server, &log, options(5));
        let batch = Batch {
            index: 1,
            files: files.iter().cloned().map(|p| MediaFile::new(p, 7)).collect(),
        };
        let expected: Vec<(PathBuf, String)> = files
            .iter()
            .map(|p| (p.clone(), sha256_file(p).unwrap()))
            .collect();
        let outcome = pipeline.process_batch(&batch, 1).await;

        assert!(outcome.status.is_verified());
        assert_eq!(outcome.hashes, expected);
        assert_eq!(outcome.deleted, files);
    }

    #[tokio::test]
    async fn test_batch_delay_follows_every_batch() {
        let dir = TempDir::new().unwrap();
        make_files(dir.path(), 2);
        let server = FakeServer::new(0).on_call(2, Behavior::ExitFailure);
        let log = RunLog::disabled();

        let mut opts = options(1);
        opts.batch_delay = Duration::from_millis(40);
        let started = std::time::Instant::now();
        let summary = completed(
            Pipeline::new(&server, &log, opts)
                .run(dir.path(), &mut Preset(true))
                .await
                .unwrap(),
        );

        assert_eq!(summary.batches, 2);
        assert!(started.elapsed() >= Duration::from_millis(80));
    }
}

mod rotation_tests {
    use super::*;

    #[tokio::test]
    async fn test_rotates_before_upload_and_resets_tag() {
        let dir = TempDir::new().unwrap();
        let files = make_files(dir.path(), 3);
        let video = dir.path().join("clip.mov");
        std::fs::write(&video, "video").unwrap();

        let orienter = FakeOrienter::default()
            .with_tag(files[0].clone(), Orientation::Rotate90Cw)
            .with_tag(files[2].clone(), Orientation::Rotate180)
            .with_tag(video.clone(), Orientation::Rotate90Cw);
        let server = FakeServer::new(0);
        let log = RunLog::disabled();

        let summary = completed(
            Pipeline::new(&server, &log, options(10))
                .with_orienter(&orienter)
                .run(dir.path(), &mut Preset(true))
                .await
                .unwrap(),
        );

        assert_eq!(summary.rotated, 2);
        let applied = orienter.applied.lock().unwrap().clone();
        assert_eq!(
            applied,
            vec![
                (files[0].clone(), Transform::Rotate90),
                (files[2].clone(), Transform::Rotate180),
            ]
        );
        assert_eq!(
            orienter.read(&files[0]).await.unwrap(),
            Orientation::Normal
        );
        assert_eq!(
            orienter.read(&files[2]).await.unwrap(),
            Orientation::Normal
        );
    }
}

mod rotation_failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_reset_is_undone_and_uploaded() {
        let dir = TempDir::new().unwrap();
        let files = make_files(dir.path(), 1);
        let orienter = FakeOrienter::default()
            .with_tag(files[0].clone(), Orientation::Rotate90Cw)
            .failing_reset();
        let server = FakeServer::new(0);
        let log = RunLog::disabled();

        let summary = completed(
            Pipeline::new(&server, &log, options(5))
                .with_orienter(&orienter)
                .run(dir.path(), &mut Preset(true))
                .await
                .unwrap(),
        );

        assert_eq!(
            orienter.applied.lock().unwrap().clone(),
            vec![
                (files[0].clone(), Transform::Rotate90),
                (files[0].clone(), Transform::Rotate270),
            ]
        );
        assert_eq!(summary.rotated, 0);
        assert_eq!(summary.verified, 1);
        assert_eq!(
            orienter.read(&files[0]).await.unwrap(),
            Orientation::Rotate90Cw
        );
    }

    #[tokio::test]
    async fn test_half_rotated_file_is_never_uploaded_or_deleted() {
        let dir = TempDir::new().unwrap();
        let files = make_files(dir.path(), 2);
        let orienter = FakeOrienter::default()
            .with_tag(files[0].clone(), Orientation::Rotate90Cw)
            .apply_limit(1)
            .failing_reset();
        let server = FakeServer::new(0);
        let logs = TempDir::new().unwrap();
        let log = RunLog::create(logs.path(), chrono::Local::now()).unwrap();

        let summary = completed(
            Pipeline::new(&server, &log, options(5))
                .with_orienter(&orienter)
                .run(dir.path(), &mut Preset(true))
                .await
                .unwrap(),
        );

        assert_eq!(server.upload_calls(), 0);
        assert_eq!(summary.uploaded, 0);
        assert_eq!(summary.deleted, 0);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.rotated, 1);
        assert_eq!(remaining(dir.path()), vec!["IMG_0001.jpg", "IMG_0002.jpg"]);

        let errors = std::fs::read_to_string(log.path(LogCategory::Error).unwrap()).unwrap();
        assert!(errors.contains("orientation tag not reset"));
    }

    #[tokio::test]
    async fn test_failed_transform_uploads_unrotated() {
        let dir = TempDir::new().unwrap();
        let files = make_files(dir.path(), 2);
        let orienter = FakeOrienter::default()
            .with_tag(files[1].clone(), Orientation::Rotate180)
            .apply_limit(0);
        let server = FakeServer::new(0);
        let log = RunLog::disabled();

        let summary = completed(
            Pipeline::new(&server, &log, options(5))
                .with_orienter(&orienter)
                .run(dir.path(), &mut Preset(true))
                .await
                .unwrap(),
        );

        assert_eq!(summary.rotated, 0);
        assert_eq!(summary.uploaded, 2);
        assert_eq!(summary.verified, 2);
        assert_eq!(
            orienter.read(&files[1]).await.unwrap(),
            Orientation::Rotate180
        );
    }
}

mod run_log_tests {
    use super::*;

    #[tokio::test]
    async fn test_run_log_files_per_category() {
        let dir = TempDir::new().unwrap();
        let logs = TempDir::new().unwrap();
        make_files(dir.path(), 7);
        let server = FakeServer::new(0).on_call(2, Behavior::ExitFailure);
        let started = chrono::Local::now();
        let log = RunLog::create(logs.path(), started).unwrap();

        completed(
            Pipeline::new(&server, &log, options(5))
                .run(dir.path(), &mut Preset(true))
                .await
                .unwrap(),
        );

        let stamp = started.format("%Y%m%d_%H%M%S").to_string();
        for category in LogCategory::ALL {
            let path = log.path(category).unwrap();
            assert_eq!(
                path.file_name().unwrap().to_string_lossy(),
                format!("{}_{}.log", category.as_str(), stamp)
            );
            assert!(path.exists());
        }

        let read = |c: LogCategory| std::fs::read_to_string(log.path(c).unwrap()).unwrap();

        let deletion = read(LogCategory::Deletion);
        assert_eq!(deletion.lines().filter(|l| l.contains("sha256 ")).count(), 5);
        assert_eq!(deletion.lines().filter(|l| l.contains("Deleted ")).count(), 5);

        let errors = read(LogCategory::Error);
        assert!(errors.contains("Batch 2"));
        assert!(errors.contains("ECONNREFUSED"));

        let verification = read(LogCategory::Verification);
        assert!(verification.contains("Batch 1: before=0 after=5 new=5 duplicates=0 -> PASS"));

        let success = read(LogCategory::Success);
        assert!(success.contains("IMG_0001.jpg"));
        assert!(!success.contains("IMG_0006.jpg"));

        assert!(read(LogCategory::Progress).contains("Run complete"));
        for line in read(LogCategory::Progress).lines() {
            assert!(line.starts_with('['), "line should be timestamped: {}", line);
        }
    }
}

#[cfg(unix)]
mod immich_cli_tests {
    use super::*;
    use immich_batch::services::immich::ImmichCli;
    use std::os::unix::fs::PermissionsExt;

    /// Stands in for the `immich` binary: records its arguments, prints
    /// canned output and exits with `code`.
    fn fake_immich(dir: &Path, name: &str, code: i32) -> PathBuf {
        let script = dir.join(name);
        let args_file = dir.join(format!("{}.args", name));
        let body = format!(
            "#!/bin/sh\n\
             if [ \"$1\" = \"server-info\" ]; then\n\
             \x20 echo 'Statistics:'\n\
             \x20 echo '  Images: 1,200'\n\
             \x20 echo '  Total: 1,234'\n\
             \x20 exit {code}\n\
             fi\n\
             printf '%s\\n' \"$@\" > '{args}'\n\
             echo 'Found 2 new files and 1 duplicate'\n\
             echo 'Successfully uploaded 2 new assets'\n\
             if [ {code} -ne 0 ]; then echo 'Error: connect ECONNREFUSED' >&2; fi\n\
             exit {code}\n",
            code = code,
            args = args_file.display()
        );
        std::fs::write(&script, body).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    // One test so no other thread holds a script open while we exec it.
    #[tokio::test]
    async fn test_immich_cli_against_script() {
        let dir = TempDir::new().unwrap();
        let ok = ImmichCli::new(fake_immich(dir.path(), "immich-ok", 0).display().to_string());
        let broken =
            ImmichCli::new(fake_immich(dir.path(), "immich-broken", 3).display().to_string());

        assert_eq!(ok.asset_count().await.unwrap(), 1234);
        assert!(matches!(
            broken.asset_count().await,
            Err(ServerError::CommandFailed { code: Some(3), .. })
        ));

        let paths = vec![dir.path().join("a.jpg"), dir.path().join("b.mov")];
        let report = ok.upload(&paths, "Photo Export 2025", 2).await.unwrap();
        assert!(report.success);
        assert_eq!(report.new_files, 2);
        assert_eq!(report.duplicates, 1);

        let args = std::fs::read_to_string(dir.path().join("immich-ok.args")).unwrap();
        let args: Vec<&str> = args.lines().collect();
        let expected_a = paths[0].display().to_string();
        let expected_b = paths[1].display().to_string();
        assert_eq!(
            args,
            vec![
                "upload",
                expected_a.as_str(),
                expected_b.as_str(),
                "--album-name",
                "Photo Export 2025",
                "--concurrency",
                "2",
            ]
        );

        let failed = broken.upload(&paths, "Photo Export 2025", 2).await.unwrap();
        assert!(!failed.success);
        assert!(failed.message.contains("ECONNREFUSED"));

        let missing = ImmichCli::new(dir.path().join("no-such-cli").display().to_string());
        assert!(matches!(
            missing.asset_count().await,
            Err(ServerError::Spawn { .. })
        ));
    }
}
