use clap::Parser;
use immich_batch::cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "immich_batch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Upload(args)) => {
            immich_batch::cli::upload::run(&cli.config, args).await?;
        }
        Some(Commands::Orient { dir, limit, fix }) => {
            immich_batch::cli::orient::run(&cli.config, &dir, limit, fix).await?;
        }
        Some(Commands::Doctor) => {
            immich_batch::cli::doctor::run(&cli.config).await?;
        }
        Some(Commands::Init { path, force }) => {
            immich_batch::cli::init::run(&path, force).await?;
        }
        None => {
            // No subcommand provided, print help
            use clap::CommandFactory;
            Cli::command().print_help()?;
        }
    }

    Ok(())
}
