//! koji-lineage - cached container build lineage
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use koji_lineage::cli::{commands, Cli, Commands};
use koji_lineage::config::ConfigManager;
use koji_lineage::error::LineageResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> LineageResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let mut config = config_manager.load().await?;

    // Command-line flags win over the config file
    if let Some(dir) = cli.cache_dir {
        config.cache.dir = Some(dir);
    }
    if let Some(snapshot) = cli.snapshot {
        config.source.snapshot = Some(snapshot);
    }

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("koji_lineage=warn"),
        1 => EnvFilter::new("koji_lineage=info"),
        _ => EnvFilter::new("koji_lineage=debug"),
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if config.general.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.without_time().init();
    }

    debug!("Using config {}", config_manager.path().display());

    match cli.command {
        Commands::Resolve(args) => commands::resolve(args, &config).await,
        Commands::Build(args) => commands::build(args, &config).await,
        Commands::Parent(args) => commands::parent(args, &config).await,
        Commands::Nvr(args) => commands::nvr(args, &config).await,
        Commands::Package(args) => commands::package(args, &config).await,
        Commands::Record(args) => commands::record(args, &config).await,
        Commands::Task(args) => commands::task(args, &config).await,
        Commands::Tree(args) => commands::tree(args, &config).await,
        Commands::Tag(args) => commands::tag(args, &config).await,
        Commands::Cache(args) => commands::cache(args, &config).await,
        Commands::Config(args) => commands::config(args, &config_manager, &config).await,
    }
}
