//! Admin dashboard commands

use clap::builder::BoolishValueParser;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::admin::{ActionOutcome, AdminAction, AdminDashboard, Section, SectionView};
use crate::api::{ExportFormat, ExportParams, NewAdmin, TestSettingFlag};
use crate::cli::{banner_board, input, open_session, password, print_banner, CliPrompter, OutputFormat};
use crate::core::error::{Error, Result};
use crate::output::{self, human};

/// Arguments for the admin command
#[derive(Parser, Debug)]
pub struct AdminArgs {
    #[command(subcommand)]
    pub command: AdminCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TestFlag {
    /// The qualification test
    Test,
    /// The consistency test
    Consistency,
}

impl From<TestFlag> for TestSettingFlag {
    fn from(flag: TestFlag) -> Self {
        match flag {
            TestFlag::Test => TestSettingFlag::SkipTest,
            TestFlag::Consistency => TestSettingFlag::SkipConsistencyTest,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    /// Sign in to the dashboard
    Login {
        /// Admin username
        username: Option<String>,
    },

    /// Sign out of the dashboard
    Logout,

    /// Show a dashboard section
    #[command(after_help = "SECTIONS:
    overview, users, admins, test-settings, speakers,
    progress, quality, consistency, system")]
    Show {
        section: String,

        /// JSON output
        #[arg(long)]
        json: bool,
    },

    /// Details of one annotator
    User {
        username: String,

        /// JSON output
        #[arg(long)]
        json: bool,
    },

    /// Delete all annotations of a user
    ResetUser {
        username: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Create an admin account (super admins only)
    CreateAdmin {
        username: String,

        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Enable or disable an admin account
    SetAdminActive {
        id: i64,

        /// on / off
        #[arg(action = clap::ArgAction::Set, value_parser = BoolishValueParser::new())]
        active: bool,
    },

    /// Delete an admin account
    DeleteAdmin {
        id: i64,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Change your admin password
    Password,

    /// Let a user skip (on) or require (off) one of the tests
    SetTest {
        username: String,

        #[arg(value_enum)]
        test: TestFlag,

        /// on / off
        #[arg(action = clap::ArgAction::Set, value_parser = BoolishValueParser::new())]
        skip: bool,
    },

    /// Require both tests again for a user
    ResetTests {
        username: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Export annotation data on the server, optionally downloading it
    #[command(after_help = "EXAMPLES:
    emolabel admin export                        Server-side CSV export
    emolabel admin export -f json -u xiaoming    One user as JSON
    emolabel admin export --download             Save the file locally")]
    Export {
        #[arg(short, long, default_value = "csv")]
        format: ExportFormat,

        #[arg(short, long)]
        user: Option<String>,

        #[arg(short, long)]
        speaker: Option<String>,

        /// Download into the export directory
        #[arg(long)]
        download: bool,

        /// Directory to download into (default: ui.export_dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Back up the server database
    Backup,

    /// Calculate a user's consistency against the reference answers
    Consistency {
        username: String,

        /// Also write the report as csv or json
        #[arg(short, long)]
        export: Option<ExportFormat>,

        /// JSON output
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(args: AdminArgs) -> Result<()> {
    let (config, mut manager) = open_session()?;

    if let AdminCommand::Login { username } = &args.command {
        let username = match username {
            Some(u) => u.clone(),
            None => input("Admin username", false)?,
        };
        let secret = password("Password")?;
        manager.api().admin_login(&username, &secret).await?;
        manager.remember_session()?;
        println!("✓ Signed in as admin {}", username);
        return Ok(());
    }

    let assume_yes = matches!(
        args.command,
        AdminCommand::ResetUser { yes: true, .. }
            | AdminCommand::DeleteAdmin { yes: true, .. }
            | AdminCommand::ResetTests { yes: true, .. }
    );
    let mut dash = AdminDashboard::new(
        manager.api().clone(),
        CliPrompter::new(assume_yes),
        banner_board(&config),
    );

    execute(&mut dash, args.command, &config.export_dir()).await?;
    print_banner(dash.banners_mut());
    // the server may have rotated or dropped the admin cookie
    manager.remember_session()
}

async fn execute(
    dash: &mut AdminDashboard<CliPrompter>,
    command: AdminCommand,
    export_dir: &std::path::Path,
) -> Result<()> {
    match command {
        AdminCommand::Login { .. } => {}
        AdminCommand::Logout => {
            dash.logout().await?;
            println!("Signed out of the dashboard.");
        }
        AdminCommand::Show { section, json } => {
            let section: Section = section.parse()?;
            let view = dash.switch_section(section).await?;
            print_view(&view, OutputFormat::from_json_flag(json));
        }
        AdminCommand::User { username, json } => {
            let outcome = dash
                .dispatch(AdminAction::ShowUserDetails { username })
                .await?;
            if let ActionOutcome::UserDetails(details) = outcome {
                let text = output::render(
                    &details,
                    OutputFormat::from_json_flag(json),
                    human::format_user_details,
                );
                println!("{}", text.trim_end());
            }
        }
        AdminCommand::ResetUser { username, .. } => {
            report(dash.dispatch(AdminAction::ResetUser { username }).await?);
        }
        AdminCommand::CreateAdmin {
            username,
            description,
        } => {
            let first = password("Password for the new admin")?;
            let again = password("Repeat password")?;
            if first != again {
                return Err(Error::validation("Passwords do not match"));
            }
            dash.create_admin(NewAdmin {
                username,
                password: first,
                description,
            })
            .await?;
        }
        AdminCommand::SetAdminActive { id, active } => {
            report(dash.dispatch(AdminAction::ToggleAdmin { id, active }).await?);
        }
        AdminCommand::DeleteAdmin { id, .. } => {
            let username = match dash.switch_section(Section::Admins).await? {
                SectionView::Admins(list) => list
                    .admins
                    .into_iter()
                    .find(|a| a.id == id)
                    .map(|a| a.username),
                _ => None,
            }
            .ok_or_else(|| Error::validation(format!("No admin with id {}", id)))?;
            report(dash.dispatch(AdminAction::DeleteAdmin { id, username }).await?);
        }
        AdminCommand::Password => {
            let old = password("Current password")?;
            let new = password("New password")?;
            let confirm = password("Confirm new password")?;
            dash.change_password(&old, &new, &confirm).await?;
        }
        AdminCommand::SetTest {
            username,
            test,
            skip,
        } => {
            report(
                dash.dispatch(AdminAction::SetTestSetting {
                    username,
                    flag: test.into(),
                    value: skip,
                })
                .await?,
            );
        }
        AdminCommand::ResetTests { username, .. } => {
            report(dash.dispatch(AdminAction::ResetTestSettings { username }).await?);
        }
        AdminCommand::Export {
            format,
            user,
            speaker,
            download,
            out,
        } => {
            let params = ExportParams {
                format,
                username: user,
                speaker,
            };
            if download {
                let dir = out.unwrap_or_else(|| export_dir.to_path_buf());
                dash.download(&params, &dir).await?;
            } else {
                dash.export_data(&params).await?;
            }
        }
        AdminCommand::Backup => {
            dash.backup().await?;
        }
        AdminCommand::Consistency {
            username,
            export,
            json,
        } => {
            let report = dash.calculate_consistency(&username).await?.clone();
            let text = output::render(
                &report,
                OutputFormat::from_json_flag(json),
                human::format_consistency_report,
            );
            println!("{}", text.trim_end());
            if let Some(format) = export {
                dash.export_report(format, export_dir)?;
            }
        }
    }
    Ok(())
}

fn print_view(view: &SectionView, format: OutputFormat) {
    println!("{}", output::format_section(view, format).trim_end());
}

fn report(outcome: ActionOutcome) {
    match outcome {
        ActionOutcome::Declined => println!("Cancelled."),
        ActionOutcome::Done { .. } => {}
        ActionOutcome::UserDetails(details) => print!("{}", human::format_user_details(&details)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Parser)]
    struct Wrapper {
        #[command(subcommand)]
        command: AdminCommand,
    }

    #[test]
    fn test_boolish_switches() {
        let parsed = Wrapper::try_parse_from(["admin", "set-test", "alice", "consistency", "on"]).unwrap();
        match parsed.command {
            AdminCommand::SetTest { username, test, skip } => {
                assert_eq!(username, "alice");
                assert_eq!(test, TestFlag::Consistency);
                assert!(skip);
            }
            other => panic!("unexpected {:?}", other),
        }

        let parsed = Wrapper::try_parse_from(["admin", "set-admin-active", "3", "off"]).unwrap();
        assert!(matches!(
            parsed.command,
            AdminCommand::SetAdminActive { id: 3, active: false }
        ));
    }

    #[test]
    fn test_export_format_parsing() {
        let parsed = Wrapper::try_parse_from(["admin", "export", "-f", "json", "--download"]).unwrap();
        match parsed.command {
            AdminCommand::Export { format, download, .. } => {
                assert_eq!(format, ExportFormat::Json);
                assert!(download);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(Wrapper::try_parse_from(["admin", "export", "-f", "xml"]).is_err());
    }
}
