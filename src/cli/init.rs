use anyhow::{Context, Result};
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "immich-batch.toml";

pub const DEFAULT_CONFIG: &str = r#"[server]
album = "Photo Export 2025"
# Passed through to `immich upload --concurrency`
concurrency = 2

[upload]
batch_size = 100
# Seconds to let the server ingest before re-reading its asset count
settle_delay_secs = 5
# Seconds to pause between batches
batch_delay_secs = 2
delete_after_upload = true
hash_before_delete = true
extensions = ["jpg", "jpeg", "png", "heic", "heif", "tiff", "tif", "mov", "mp4", "avi", "gif"]

[rotate]
enabled = false

[logging]
dir = "logs"
write_files = true

[tools]
immich = "immich"
exiftool = "exiftool"
magick = "magick"
"#;

pub async fn run(path: &Path, force: bool) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let config_path = path.join(CONFIG_FILE_NAME);
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite it.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    tracing::info!("Created {}", config_path.display());
    tracing::info!("Run 'immich-batch doctor' to check your setup");
    Ok(())
}
