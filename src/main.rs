//! Eto CLI entry point.

use anyhow::Result;
use clap::Parser;
use eto::cli::{commands, Cli, Commands, Output};
use eto::config::{Credentials, Settings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("eto={}", cli.log_level())),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    let credentials = match Credentials::load(&settings.api_key_path(), &settings.org_id_path()) {
        Ok(credentials) => credentials,
        Err(e) => {
            Output::error(&e.to_string());
            std::process::exit(1);
        }
    };

    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match cli.command {
        None => {
            commands::run_serve(None, None, cli.debug, settings, &credentials).await?;
        }

        Some(Commands::Serve { host, port }) => {
            commands::run_serve(host, port, cli.debug, settings, &credentials).await?;
        }

        Some(Commands::Build { force }) => {
            commands::run_build(force, settings, &credentials).await?;
        }

        Some(Commands::Ask { question }) => {
            commands::run_ask(&question, settings, &credentials).await?;
        }
    }

    Ok(())
}
