use clap::Parser;

use crate::cli::{open_session, CliPrompter};
use crate::core::error::Result;

/// Arguments for the logout command
#[derive(Parser, Debug)]
pub struct LogoutArgs {
    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

pub async fn run(args: LogoutArgs) -> Result<()> {
    let (_config, mut manager) = open_session()?;
    let mut prompter = CliPrompter::new(args.yes);
    if manager.logout(&mut prompter).await? {
        println!("Logged out.");
    }
    Ok(())
}
