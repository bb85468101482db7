//! Local settings

use clap::{Parser, Subcommand};
use url::Url;

use crate::core::config::Config;
use crate::core::error::Result;

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Set the annotation server URL
    SetServer {
        /// e.g. http://10.0.0.5:5000
        url: String,
    },

    /// Print the config file location
    Path,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = Config::load()?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigCommand::SetServer { url } => {
            let parsed = Url::parse(url.trim())?;
            let mut config = Config::load()?;
            config.server.base_url = parsed.to_string();
            config.save()?;
            println!("Server set to {}", config.server.base_url);
        }
        ConfigCommand::Path => {
            println!("{}", Config::config_path()?.display());
        }
    }
    Ok(())
}
