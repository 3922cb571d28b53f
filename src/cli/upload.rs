use super::UploadArgs;
use crate::models::{RunOutcome, RunSummary};
use crate::services::immich::ImmichCli;
use crate::services::orientation::ExternalOrienter;
use crate::services::pipeline::{Confirm, Pipeline, PipelineOptions, Preset};
use crate::services::run_log::{LogCategory, RunLog};
use crate::services::tools;
use crate::Config;
use anyhow::Result;
use std::io::{self, Write};
use std::path::Path;

/// Reads the answer from the terminal. Anything but y/yes is a no.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        print!("\n  {} [y/N] ", prompt);
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(is_affirmative(&input))
    }
}

/// `y` or `yes` in any case, surrounding whitespace ignored.
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

pub async fn run(config_path: &Path, args: UploadArgs) -> Result<()> {
    let mut config = Config::load(config_path)?;
    args.apply_to(&mut config);
    config.validate()?;

    tools::ensure_tools(&tools::required_tools(&config)).await?;

    let log = if config.logging.write_files {
        RunLog::create(&config.logging.dir, chrono::Local::now())?
    } else {
        RunLog::disabled()
    };

    let server = ImmichCli::new(config.tools.immich.clone());
    let orienter = ExternalOrienter::new(config.tools.exiftool.clone(), config.tools.magick.clone());

    let mut pipeline = Pipeline::new(&server, &log, PipelineOptions::from_config(&config));
    if config.rotate.enabled {
        pipeline = pipeline.with_orienter(&orienter);
    }

    let mut confirm: Box<dyn Confirm> = if args.yes {
        Box::new(Preset(true))
    } else {
        Box::new(StdinConfirm)
    };

    match pipeline.run(&args.dir, confirm.as_mut()).await? {
        RunOutcome::Cancelled { discovered } => {
            println!("  Cancelled. {} files left untouched.", discovered);
        }
        RunOutcome::Completed(summary) => print_summary(&summary, &log),
    }

    Ok(())
}

fn print_summary(summary: &RunSummary, log: &RunLog) {
    println!("\n  Upload finished\n");
    println!("  {:<22} {}", "Files discovered", summary.total_files);
    println!("  {:<22} {}", "Batches", summary.batches);
    println!("  {:<22} {}", "Uploaded", summary.uploaded);
    println!("  {:<22} {}", "Verified", summary.verified);
    println!("  {:<22} {}", "Deleted", summary.deleted);
    println!("  {:<22} {}", "Failed (kept)", summary.failed);
    if summary.rotated > 0 {
        println!("  {:<22} {}", "Auto-rotated", summary.rotated);
    }
    if summary.delete_failures > 0 {
        println!("  {:<22} {}", "Delete failures", summary.delete_failures);
    }
    println!(
        "  {:<22} {} new, {} duplicates",
        "Server report", summary.new_assets, summary.duplicates
    );
    if let Some(missing) = summary.shortfall() {
        println!(
            "\n  \x1b[33mServer count is {} below the expected total; check the verification log.\x1b[0m",
            missing
        );
    }
    if summary.failed > 0 {
        println!("\n  Re-run the same command to retry the files that were kept.");
    }
    if let Some(path) = log.path(LogCategory::Progress) {
        println!("\n  Logs: {}", path.parent().unwrap_or(path).display());
    }
    println!();
}
