use crate::error::ServerError;
use crate::models::UploadReport;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use std::process::Output;
use tokio::process::Command;

static NEW_ASSETS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)successfully uploaded\D*?(\d+)\s+new\s+assets?")
        .expect("Invalid new-assets regex pattern")
});
static DUPLICATES_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s+duplicates?").expect("Invalid duplicates regex pattern"));

/// The remote photo server, as seen by the pipeline.
#[async_trait]
pub trait AssetServer: Send + Sync {
    /// Total number of assets currently on the server.
    async fn asset_count(&self) -> Result<u64, ServerError>;

    /// Uploads `paths` into `album`. A non-zero CLI exit is reported through
    /// `UploadReport::success`, not as an error.
    async fn upload(
        &self,
        paths: &[PathBuf],
        album: &str,
        concurrency: usize,
    ) -> Result<UploadReport, ServerError>;
}

/// Drives the `immich` command line client.
#[derive(Debug, Clone)]
pub struct ImmichCli {
    program: String,
}

impl ImmichCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn output(&self, command: &mut Command) -> Result<Output, ServerError> {
        command.output().await.map_err(|source| ServerError::Spawn {
            program: self.program.clone(),
            source,
        })
    }
}

impl Default for ImmichCli {
    fn default() -> Self {
        Self::new("immich")
    }
}

#[async_trait]
impl AssetServer for ImmichCli {
    async fn asset_count(&self) -> Result<u64, ServerError> {
        let output = self
            .output(Command::new(&self.program).arg("server-info"))
            .await?;

        if !output.status.success() {
            return Err(ServerError::CommandFailed {
                command: format!("{} server-info", self.program),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_server_total(&String::from_utf8_lossy(&output.stdout))
    }

    async fn upload(
        &self,
        paths: &[PathBuf],
        album: &str,
        concurrency: usize,
    ) -> Result<UploadReport, ServerError> {
        let mut command = Command::new(&self.program);
        command
            .arg("upload")
            .args(paths)
            .arg("--album-name")
            .arg(album)
            .arg("--concurrency")
            .arg(concurrency.to_string());

        tracing::debug!("Running {} upload with {} paths", self.program, paths.len());
        let output = self.output(&mut command).await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut report = parse_upload_report(&stdout);
        report.success = output.status.success();
        report.message = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        Ok(report)
    }
}

/// Pulls the new-asset and duplicate counts out of `immich upload` output.
///
/// Counts that cannot be found are 0, which the verification step treats as
/// "no progress".
pub fn parse_upload_report(stdout: &str) -> UploadReport {
    let capture = |re: &Regex| -> u64 {
        re.captures(stdout)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };

    UploadReport {
        success: false,
        new_files: capture(&NEW_ASSETS_REGEX),
        duplicates: capture(&DUPLICATES_REGEX),
        message: String::new(),
    }
}

/// Reads the `Total: <N>` line from `immich server-info`.
pub fn parse_server_total(stdout: &str) -> Result<u64, ServerError> {
    let line = stdout
        .lines()
        .find(|l| l.contains("Total:"))
        .ok_or_else(|| ServerError::Parse("no 'Total:' line in server-info output".into()))?;

    let token = line
        .split_whitespace()
        .last()
        .unwrap_or_default()
        .replace(',', "");

    token
        .parse()
        .map_err(|_| ServerError::Parse(format!("unexpected total in line '{}'", line.trim())))
}
