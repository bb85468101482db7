//! CLI command definitions and handlers

pub mod admin;
pub mod annotate;
pub mod config;
pub mod consistency;
pub mod login;
pub mod logout;
pub mod status;

use clap::{Parser, Subcommand};
use dialoguer::{theme::ColorfulTheme, Input, Password, Select};

use crate::api::ApiClient;
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::prompt::{Prompter, ScriptedPrompter, TerminalPrompter};
use crate::output::banner::{BannerBoard, BannerKind};
use crate::session::{UserManager, UsernameStore};

const LONG_ABOUT: &str = r#"
Terminal client for the speech emotion annotation service.

QUICK START:
    1. emolabel config set-server http://host:5000   Point at your server
    2. emolabel login                                  Sign in with nickname + phone
    3. emolabel test                                   Take the qualification test
    4. emolabel consistency                            Take the consistency test
    5. emolabel annotate                               Start labeling clips

ANNOTATION KEYS (one per line in 'annotate'):
    space   Play / pause the clip
    w       Save the current mode (VA or discrete)
    e       Previous clip
    r       Next clip
    q       Continue to discrete / back to VA

ADMIN:
    emolabel admin login                 Sign in to the dashboard
    emolabel admin show <section>        overview, users, admins, test-settings,
                                         speakers, progress, quality,
                                         consistency, system
    emolabel admin consistency <user>    Calculate and export a report

Set EMOLABEL_LOG=debug for request logging.
"#;

/// Speech emotion annotation client
#[derive(Parser, Debug)]
#[command(name = "emolabel")]
#[command(author, version)]
#[command(about = "Speech emotion annotation client")]
#[command(long_about = LONG_ABOUT)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in as an annotator
    #[command(after_help = "EXAMPLES:
    emolabel login                            Interactive
    emolabel login -n xiaoming -p 13812345678 Non-interactive

After login you are told which step comes next: the qualification test,
the consistency test or the annotation workspace.")]
    Login(login::LoginArgs),

    /// Sign out and forget the local session
    Logout(logout::LogoutArgs),

    /// Show who is signed in and what comes next
    Status(status::StatusArgs),

    /// Label clips in the annotation workspace
    #[command(visible_alias = "a")]
    Annotate(annotate::AnnotateArgs),

    /// Take the qualification test
    #[command(visible_alias = "t")]
    Test(test::TestArgs),

    /// Take the consistency test
    #[command(visible_alias = "c")]
    Consistency(consistency::ConsistencyArgs),

    /// Admin dashboard
    Admin(admin::AdminArgs),

    /// Show or change local settings
    Config(config::ConfigArgs),
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

// ===== SHARED HELPERS =====

/// Terminal prompts, or a fixed "yes" for `--yes`
pub enum CliPrompter {
    Terminal(TerminalPrompter),
    AssumeYes(ScriptedPrompter),
}

impl CliPrompter {
    pub fn new(assume_yes: bool) -> Self {
        if assume_yes {
            CliPrompter::AssumeYes(ScriptedPrompter::always(true))
        } else {
            CliPrompter::Terminal(TerminalPrompter)
        }
    }
}

impl Prompter for CliPrompter {
    fn confirm(&mut self, message: &str) -> Result<bool> {
        match self {
            CliPrompter::Terminal(p) => p.confirm(message),
            CliPrompter::AssumeYes(p) => {
                eprintln!("{} yes", message);
                p.confirm(message)
            }
        }
    }

    fn alert(&mut self, message: &str) {
        match self {
            CliPrompter::Terminal(p) => p.alert(message),
            CliPrompter::AssumeYes(p) => {
                eprintln!("! {}", message);
                p.alert(message)
            }
        }
    }
}

/// Config, client and the restored local session
pub fn open_session() -> Result<(Config, UserManager)> {
    let config = Config::load()?;
    let api = ApiClient::from_config(&config)?;
    let store = UsernameStore::open()?;
    Ok((config, UserManager::new(api, store)))
}

pub fn banner_board(config: &Config) -> BannerBoard {
    BannerBoard::new(config.banner_ttl())
}

/// Print and clear the live banner
pub fn print_banner(board: &mut BannerBoard) {
    if let Some(banner) = board.take() {
        match banner.kind {
            BannerKind::Success => println!("✓ {}", banner.text),
            BannerKind::Info => println!("• {}", banner.text),
            BannerKind::Error => eprintln!("✗ {}", banner.text),
        }
    }
}

pub fn input(prompt: &str, allow_empty: bool) -> Result<String> {
    Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .allow_empty(allow_empty)
        .interact_text()
        .map_err(|e| Error::Prompt {
            message: format!("Input failed: {}", e),
        })
}

pub fn password(prompt: &str) -> Result<String> {
    Password::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact()
        .map_err(|e| Error::Prompt {
            message: format!("Input failed: {}", e),
        })
}

pub fn select(prompt: &str, items: &[String], default: usize) -> Result<usize> {
    Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(items)
        .default(default.min(items.len().saturating_sub(1)))
        .interact()
        .map_err(|e| Error::Prompt {
            message: format!("Selection failed: {}", e),
        })
}

/// Read one line without blocking the runtime's worker
pub async fn read_line(prompt: String) -> Result<String> {
    tokio::task::spawn_blocking(move || input(&prompt, true))
        .await
        .map_err(|e| Error::Prompt {
            message: format!("Input task failed: {}", e),
        })?
}

/// `--username`, then the server session, then the remembered name
pub async fn resolve_user(manager: &mut UserManager, explicit: Option<String>) -> Result<String> {
    if let Some(username) = explicit {
        return Ok(username);
    }
    match manager.init_auth().await {
        Ok(username) => Ok(username),
        Err(Error::NotAuthenticated) => manager
            .remembered_username()
            .map(str::to_string)
            .ok_or(Error::NotAuthenticated),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_admin_show() {
        let cli = Cli::try_parse_from(["emolabel", "admin", "show", "progress", "--json"]).unwrap();
        match cli.command {
            Commands::Admin(args) => match args.command {
                admin::AdminCommand::Show { section, json } => {
                    assert_eq!(section, "progress");
                    assert!(json);
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_assume_yes_prompter() {
        let mut prompter = CliPrompter::new(true);
        assert!(prompter.confirm("Delete?").unwrap());
    }
}
