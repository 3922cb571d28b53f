use crate::services::immich::{AssetServer, ImmichCli};
use crate::services::tools::{self, RequiredTool};
use crate::Config;
use anyhow::Result;
use std::path::Path;

#[derive(Debug)]
enum CheckStatus {
    Ok,
    Warn,
    Fail,
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckStatus::Ok => write!(f, "\x1b[32m✓ OK\x1b[0m"),
            CheckStatus::Warn => write!(f, "\x1b[33m⚠ WARN\x1b[0m"),
            CheckStatus::Fail => write!(f, "\x1b[31m✗ FAIL\x1b[0m"),
        }
    }
}

struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

pub async fn run(config_path: &Path) -> Result<()> {
    println!("\n  immich-batch doctor\n");

    let mut results: Vec<CheckResult> = Vec::new();

    let loaded = Config::load(config_path).and_then(|c| {
        c.validate()?;
        Ok(c)
    });
    let config = match loaded {
        Ok(c) => {
            let detail = if config_path.exists() {
                format!("Loaded from {}", config_path.display())
            } else {
                format!("{} not found, using defaults", config_path.display())
            };
            results.push(CheckResult {
                name: "Configuration".into(),
                status: CheckStatus::Ok,
                detail,
            });
            c
        }
        Err(e) => {
            results.push(CheckResult {
                name: "Configuration".into(),
                status: CheckStatus::Fail,
                detail: format!("{:#}", e),
            });
            print_results(&results);
            anyhow::bail!("Configuration is invalid");
        }
    };

    // Rotation tools are only required when rotation is on.
    let required = tools::required_tools(&config);
    let optional = [
        RequiredTool {
            program: config.tools.exiftool.clone(),
            version_flag: "-ver",
            hint: tools::EXIFTOOL_HINT,
        },
        RequiredTool {
            program: config.tools.magick.clone(),
            version_flag: "-version",
            hint: tools::MAGICK_HINT,
        },
    ];

    let mut missing_required = false;
    for tool in required.iter().chain(optional.iter().filter(|t| !required.contains(t))) {
        let is_required = required.contains(tool);
        let found = tools::probe(&tool.program, tool.version_flag).await;
        let (status, detail) = match (found, is_required) {
            (true, _) => (CheckStatus::Ok, "found".to_string()),
            (false, true) => {
                missing_required = true;
                (CheckStatus::Fail, tool.hint.to_string())
            }
            (false, false) => (
                CheckStatus::Warn,
                format!("not found (needed for --rotate). {}", tool.hint),
            ),
        };
        results.push(CheckResult {
            name: format!("Tool: {}", tool.program),
            status,
            detail,
        });
    }

    if !missing_required {
        let server = ImmichCli::new(config.tools.immich.clone());
        match server.asset_count().await {
            Ok(count) => results.push(CheckResult {
                name: "Server".into(),
                status: CheckStatus::Ok,
                detail: format!("{} assets", count),
            }),
            Err(e) => results.push(CheckResult {
                name: "Server".into(),
                status: CheckStatus::Warn,
                detail: format!("Could not read asset count: {}. Is the CLI logged in?", e),
            }),
        }
    }

    print_results(&results);

    if missing_required {
        anyhow::bail!("Required tools are missing");
    }
    println!("\n  All required checks passed.\n");
    Ok(())
}

fn print_results(results: &[CheckResult]) {
    let max_name = results.iter().map(|r| r.name.len()).max().unwrap_or(0);
    for r in results {
        println!(
            "  {:width$}  {}  {}",
            r.name,
            r.status,
            r.detail,
            width = max_name
        );
    }
}
