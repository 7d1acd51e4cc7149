use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};

use super::{ConfigCommand, LeadsCommand};
use crate::config::{Config, DataMode};
use crate::tui;

/// Leadline - floating note, meeting, task and email dialogs over your leads
#[derive(Parser)]
#[command(
    name = "leadline",
    version,
    about = "Floating note, meeting, task and email dialogs over your leads",
    long_about = r#"Leadline is a terminal CRM front end. Several dialogs can be open at once;
each one can be focused, dragged by its header, minimized to the tray or closed.

Examples:
  leadline                               # Start interactive mode with sample leads
  leadline --leads-file leads.json       # Work on leads from a JSON file
  leadline leads --json                  # Print the lead directory"#
)]
pub struct Cli {
    /// Use the built-in sample leads
    #[arg(long = "mock", global = true, conflicts_with = "leads_file")]
    pub mock: bool,

    /// Read leads from a JSON file
    #[arg(short = 'f', long = "leads-file", global = true)]
    pub leads_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the lead directory
    Leads(LeadsCommand),
    /// Print the effective configuration
    Config(ConfigCommand),
}

impl Cli {
    /// Whether this invocation takes over the terminal
    pub fn is_interactive(&self) -> bool {
        self.command.is_none()
    }

    /// Load configuration from files and env, then apply the flags
    pub async fn load_config(&self) -> Result<Config> {
        let mut config = Config::init().await?;
        self.apply_overrides(&mut config);
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut Config) {
        if self.mock {
            config.data_mode = DataMode::Mock;
        }
        if let Some(path) = &self.leads_file {
            config.data_mode = DataMode::File;
            config.leads_file = Some(path.clone());
        }
    }

    pub async fn execute(self, config: Config) -> Result<()> {
        if self.debug {
            debug!("Debug logging enabled");
        }
        debug!("Configuration initialized");

        match self.command {
            Some(Commands::Leads(leads_cmd)) => leads_cmd.execute(&config).await,
            Some(Commands::Config(config_cmd)) => config_cmd.execute(&config),
            None => Self::start_interactive_mode(config).await,
        }
    }

    async fn start_interactive_mode(config: Config) -> Result<()> {
        info!("Starting interactive mode");

        // Validate the configuration
        config.validate()?;

        tui::run(config).await?;

        info!("Application finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leads_file_switches_to_file_mode() {
        let cli = Cli::parse_from(["leadline", "--leads-file", "leads.json", "leads", "--json"]);
        let mut config = Config::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.data_mode, DataMode::File);
        assert_eq!(config.leads_file, Some(PathBuf::from("leads.json")));
        assert!(!cli.is_interactive());
        assert!(matches!(cli.command, Some(Commands::Leads(LeadsCommand { json: true }))));
    }

    #[test]
    fn test_mock_flag_overrides_file_mode() {
        let cli = Cli::parse_from(["leadline", "--mock"]);
        let mut config = Config {
            data_mode: DataMode::File,
            ..Config::default()
        };
        cli.apply_overrides(&mut config);

        assert_eq!(config.data_mode, DataMode::Mock);
        assert!(cli.is_interactive());
    }

    #[test]
    fn test_mock_and_leads_file_conflict() {
        assert!(Cli::try_parse_from(["leadline", "--mock", "--leads-file", "x.json"]).is_err());
    }
}
