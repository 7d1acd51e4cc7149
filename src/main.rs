use anyhow::Result;
use clap::Parser;
use std::fs::{self, OpenOptions};
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod crm;
mod tui;

use cli::Cli;
use config::Config;

#[tokio::main]
async fn main() {
    // Dialog contents run behind catch_unwind, so a panic is logged and the
    // UI keeps going
    std::panic::set_hook(Box::new(|panic_info| {
        error!("Panic: {}", panic_info);
    }));

    // Load environment variables from .env file
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = match cli.load_config().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config, cli.is_interactive(), cli.debug) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = dotenv {
        // Don't error if .env file doesn't exist, just log it
        tracing::debug!("No .env file found or error loading it: {}", e);
    }

    let interactive = cli.is_interactive();
    if let Err(e) = cli.execute(config).await {
        error!("Application error: {}", e);
        if interactive {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn init_logging(config: &Config, interactive: bool, debug: bool) -> Result<()> {
    let default_filter = if debug { "leadline=debug" } else { "leadline=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_env("LEADLINE_LOG")
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| default_filter.into());

    if interactive {
        // The terminal belongs to the UI; logs go to a file
        fs::create_dir_all(&config.data_dir)?;
        let path = config.log_file();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
        info!("Logging to {}", path.display());
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
    }

    Ok(())
}
