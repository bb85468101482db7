//! Annotator login

use clap::Parser;
use tracing::debug;

use crate::cli::{input, open_session};
use crate::core::error::Result;

/// Arguments for the login command
#[derive(Parser, Debug)]
pub struct LoginArgs {
    /// WeChat nickname
    #[arg(short, long)]
    pub nickname: Option<String>,

    /// Phone number
    #[arg(short, long)]
    pub phone: Option<String>,
}

pub async fn run(args: LoginArgs) -> Result<()> {
    let (_config, mut manager) = open_session()?;

    let nickname = match args.nickname {
        Some(n) => n,
        None => input("WeChat nickname", false)?,
    };
    let phone = match args.phone {
        Some(p) => p,
        None => input("Phone number", false)?,
    };

    let response = manager.login(&nickname, &phone).await?;
    println!(
        "✓ {}",
        response
            .message
            .unwrap_or_else(|| format!("Logged in as {}", response.username))
    );

    let page = manager.landing_page(&response.username).await;
    debug!(%page, "post-login route");
    println!("Next: {} (run 'emolabel {}')", page, page.command());
    Ok(())
}
