mod config;
mod leads;
mod root;

pub use config::ConfigCommand;
pub use leads::LeadsCommand;
pub use root::Cli;
