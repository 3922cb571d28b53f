use crate::config::Config;
use crate::error::PipelineError;
use std::process::Stdio;
use tokio::process::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredTool {
    pub program: String,
    /// Flag that makes the program print its version and exit zero.
    pub version_flag: &'static str,
    pub hint: &'static str,
}

pub const IMMICH_HINT: &str = "Install it with: npm install -g @immich/cli";
pub const EXIFTOOL_HINT: &str =
    "Install it with: brew install exiftool (or apt install libimage-exiftool-perl)";
pub const MAGICK_HINT: &str = "Install it with: brew install imagemagick (or apt install imagemagick)";

/// External programs a run with this config will invoke.
pub fn required_tools(config: &Config) -> Vec<RequiredTool> {
    let mut tools = vec![RequiredTool {
        program: config.tools.immich.clone(),
        version_flag: "--version",
        hint: IMMICH_HINT,
    }];
    if config.rotate.enabled {
        tools.push(RequiredTool {
            program: config.tools.exiftool.clone(),
            version_flag: "-ver",
            hint: EXIFTOOL_HINT,
        });
        tools.push(RequiredTool {
            program: config.tools.magick.clone(),
            version_flag: "-version",
            hint: MAGICK_HINT,
        });
    }
    tools
}

/// True when `<program> <version_flag>` can be spawned and exits zero.
pub async fn probe(program: &str, version_flag: &str) -> bool {
    Command::new(program)
        .arg(version_flag)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

pub async fn ensure_tools(tools: &[RequiredTool]) -> Result<(), PipelineError> {
    for tool in tools {
        if !probe(&tool.program, tool.version_flag).await {
            return Err(PipelineError::ToolMissing {
                tool: tool.program.clone(),
                hint: tool.hint.to_string(),
            });
        }
        tracing::debug!("Found {}", tool.program);
    }
    Ok(())
}
