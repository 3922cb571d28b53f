use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MAX_BATCH_SIZE: usize = 1000;

pub const DEFAULT_EXTENSIONS: [&str; 11] = [
    "jpg", "jpeg", "png", "heic", "heif", "tiff", "tif", "mov", "mp4", "avi", "gif",
];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub rotate: RotateConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_album")]
    pub album: String,
    /// Passed straight through to `immich upload --concurrency`.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            album: default_album(),
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Wait after an upload before re-sampling the server count.
    #[serde(default = "default_settle_delay")]
    pub settle_delay_secs: u64,
    /// Pause after every batch, whatever its outcome.
    #[serde(default = "default_batch_delay")]
    pub batch_delay_secs: u64,
    #[serde(default)]
    pub max_files: Option<usize>,
    #[serde(default = "default_true")]
    pub delete_after_upload: bool,
    #[serde(default = "default_true")]
    pub hash_before_delete: bool,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            settle_delay_secs: default_settle_delay(),
            batch_delay_secs: default_batch_delay(),
            max_files: None,
            delete_after_upload: true,
            hash_before_delete: true,
            extensions: default_extensions(),
        }
    }
}

impl UploadConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_secs(self.batch_delay_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RotateConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
    /// When false, run logs only go through tracing.
    #[serde(default = "default_true")]
    pub write_files: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            write_files: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default = "default_immich")]
    pub immich: String,
    #[serde(default = "default_exiftool")]
    pub exiftool: String,
    #[serde(default = "default_magick")]
    pub magick: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            immich: default_immich(),
            exiftool: default_exiftool(),
            magick: default_magick(),
        }
    }
}

fn default_album() -> String {
    "Photo Export 2025".to_string()
}

fn default_concurrency() -> usize {
    2
}

fn default_batch_size() -> usize {
    100
}

fn default_settle_delay() -> u64 {
    5
}

fn default_batch_delay() -> u64 {
    2
}

fn default_true() -> bool {
    true
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_immich() -> String {
    "immich".to_string()
}

fn default_exiftool() -> String {
    "exiftool".to_string()
}

fn default_magick() -> String {
    "magick".to_string()
}

impl Config {
    /// Loads the config file, or the defaults when it does not exist.
    /// Not validated: call `validate` once command line overrides are applied.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.upload.batch_size == 0 {
            anyhow::bail!("upload.batch_size must be greater than 0");
        }
        if self.upload.batch_size > MAX_BATCH_SIZE {
            anyhow::bail!("upload.batch_size must be {} or less", MAX_BATCH_SIZE);
        }
        if self.server.concurrency == 0 {
            anyhow::bail!("server.concurrency must be greater than 0");
        }
        if self.server.album.trim().is_empty() {
            anyhow::bail!("server.album must not be empty");
        }
        if self.upload.extensions.is_empty() {
            anyhow::bail!("upload.extensions must list at least one extension");
        }
        if self.upload.max_files == Some(0) {
            anyhow::bail!("upload.max_files must be greater than 0 when set");
        }
        Ok(())
    }

    /// Lowercased extensions without a leading dot.
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.upload
            .extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect()
    }
}
