pub mod doctor;
pub mod init;
pub mod orient;
pub mod upload;

use crate::Config;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "immich-batch")]
#[command(version)]
#[command(about = "Upload a photo folder to Immich in verified batches", long_about = None)]
pub struct Cli {
    #[arg(short, long, default_value = "immich-batch.toml", env = "IMMICH_BATCH_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload, verify, then delete local originals batch by batch
    Upload(UploadArgs),
    /// Show (and optionally fix) EXIF orientation of images
    Orient {
        #[arg(default_value = ".")]
        dir: PathBuf,
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Rotate pixels to match the tag, then reset the tag to 1
        #[arg(long)]
        fix: bool,
    },
    /// Check configuration, external tools and server reachability
    Doctor,
    /// Write a default config file
    Init {
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
    #[arg(default_value = ".")]
    pub dir: PathBuf,
    #[arg(short, long)]
    pub album: Option<String>,
    #[arg(short, long)]
    pub batch_size: Option<usize>,
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Seconds to wait after an upload before re-reading the server count
    #[arg(long)]
    pub settle_delay: Option<u64>,
    /// Seconds to wait between batches
    #[arg(long)]
    pub batch_delay: Option<u64>,
    /// Only process the first N files (sorted by name)
    #[arg(long)]
    pub max_files: Option<usize>,
    /// Auto-rotate images from their EXIF orientation before upload
    #[arg(long)]
    pub rotate: bool,
    /// Upload and verify, but never delete local files
    #[arg(long)]
    pub keep_originals: bool,
    /// Skip the SHA-256 audit hash taken before deleting
    #[arg(long)]
    pub no_hash: bool,
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
    /// Answer yes to the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

impl UploadArgs {
    /// Command line flags win over the config file.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(album) = &self.album {
            config.server.album = album.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.server.concurrency = concurrency;
        }
        if let Some(batch_size) = self.batch_size {
            config.upload.batch_size = batch_size;
        }
        if let Some(secs) = self.settle_delay {
            config.upload.settle_delay_secs = secs;
        }
        if let Some(secs) = self.batch_delay {
            config.upload.batch_delay_secs = secs;
        }
        if self.max_files.is_some() {
            config.upload.max_files = self.max_files;
        }
        if self.rotate {
            config.rotate.enabled = true;
        }
        if self.keep_originals {
            config.upload.delete_after_upload = false;
        }
        if self.no_hash {
            config.upload.hash_before_delete = false;
        }
        if let Some(dir) = &self.log_dir {
            config.logging.dir = dir.clone();
        }
    }
}
