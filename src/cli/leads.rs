use anyhow::Result;
use clap::Args;
use tracing::debug;

use crate::config::Config;
use crate::crm::Lead;

/// Print the lead directory
#[derive(Debug, Args)]
pub struct LeadsCommand {
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl LeadsCommand {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        config.validate()?;
        let directory = config.directory().await?;
        let leads = directory.leads().await?;
        debug!("Listing {} leads", leads.len());

        if self.json {
            println!("{}", serde_json::to_string_pretty(&leads)?);
        } else {
            print!("{}", render_table(&leads));
        }
        Ok(())
    }
}

fn render_table(leads: &[Lead]) -> String {
    let mut output = format!("{:>5}  {:<20} {:<16} {:<28} {}\n", "ID", "NAME", "COMPANY", "EMAIL", "STAGE");
    for lead in leads {
        output.push_str(&format!(
            "{:>5}  {:<20} {:<16} {:<28} {}\n",
            lead.id,
            lead.name,
            lead.company.as_deref().unwrap_or("-"),
            lead.email.as_deref().unwrap_or("-"),
            lead.stage.label()
        ));
    }
    output
}
