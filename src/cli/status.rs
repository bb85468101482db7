//! Session status

use clap::Parser;
use serde::Serialize;

use crate::cli::{open_session, OutputFormat};
use crate::core::error::{Error, Result};
use crate::output;

/// Arguments for the status command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct Status {
    server: String,
    authenticated: bool,
    username: Option<String>,
    next: Option<&'static str>,
}

pub async fn run(args: StatusArgs) -> Result<()> {
    let (config, mut manager) = open_session()?;

    let (username, next) = match manager.init_auth().await {
        Ok(username) => {
            let page = manager.landing_page(&username).await;
            (Some(username), Some(page.command()))
        }
        Err(Error::NotAuthenticated) => (None, None),
        Err(e) => return Err(e),
    };
    let status = Status {
        server: config.server.base_url.clone(),
        authenticated: username.is_some(),
        username,
        next,
    };

    let text = output::render(&status, OutputFormat::from_json_flag(args.json), |s| {
        let mut out = format!("Server: {}\n", s.server);
        match (&s.username, s.next) {
            (Some(user), Some(next)) => {
                out.push_str(&format!("Logged in as {}\n", user));
                out.push_str(&format!("Next: emolabel {}\n", next));
            }
            _ => out.push_str("Not logged in (run 'emolabel login')\n"),
        }
        out
    });
    print!("{}", text);
    if args.json {
        println!();
    }
    Ok(())
}
