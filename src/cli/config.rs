use anyhow::Result;
use clap::Args;

use crate::config::Config;

/// Print the effective configuration
#[derive(Debug, Args)]
pub struct ConfigCommand {
    /// Also list the configuration files that are searched
    #[arg(long)]
    pub paths: bool,
}

impl ConfigCommand {
    pub fn execute(&self, config: &Config) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(config)?);

        if self.paths {
            println!();
            for path in Config::config_paths() {
                let marker = if path.exists() { "found" } else { "-" };
                println!("{:<6} {}", marker, path.display());
            }
        }

        if let Err(e) = config.validate() {
            eprintln!("warning: {}", e);
        }
        Ok(())
    }
}
