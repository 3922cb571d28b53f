use crate::services::orientation::{auto_rotate, survey, ExternalOrienter, Orientation};
use crate::services::scan::discover;
use crate::services::tools::{self, RequiredTool};
use crate::Config;
use anyhow::Result;
use std::path::Path;

pub async fn run(config_path: &Path, dir: &Path, limit: usize, fix: bool) -> Result<()> {
    let config = Config::load(config_path)?;
    config.validate()?;

    let mut required = vec![RequiredTool {
        program: config.tools.exiftool.clone(),
        version_flag: "-ver",
        hint: tools::EXIFTOOL_HINT,
    }];
    if fix {
        required.push(RequiredTool {
            program: config.tools.magick.clone(),
            version_flag: "-version",
            hint: tools::MAGICK_HINT,
        });
    }
    tools::ensure_tools(&required).await?;

    let orienter = ExternalOrienter::new(config.tools.exiftool.clone(), config.tools.magick.clone());
    let files: Vec<_> = discover(dir, &config.normalized_extensions(), None)?
        .into_iter()
        .filter(|f| f.is_rotatable())
        .take(limit)
        .collect();

    if files.is_empty() {
        println!("No images with EXIF orientation support in {}", dir.display());
        return Ok(());
    }

    println!("Checking EXIF orientation of {} images...", files.len());
    let mut needs_fix = 0;
    for (path, result) in survey(&orienter, &files).await {
        match result {
            Ok(orientation) => {
                if orientation != Orientation::Normal {
                    needs_fix += 1;
                }
                println!("{}: Orientation {}", path.display(), orientation);
            }
            Err(e) => println!("{}: {}", path.display(), e),
        }
    }

    if !fix {
        if needs_fix > 0 {
            println!("\n{} image(s) need rotation. Run with --fix to apply.", needs_fix);
        }
        return Ok(());
    }

    let mut rotated = 0;
    for file in &files {
        match auto_rotate(&orienter, file).await {
            Ok(true) => rotated += 1,
            Ok(false) => {}
            Err(e) => tracing::error!("Failed to auto-rotate {}: {}", file.path.display(), e),
        }
    }
    println!("\nAuto-rotated {} images.", rotated);

    Ok(())
}
