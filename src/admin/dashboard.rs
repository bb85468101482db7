//! Admin dashboard controller
//!
//! One section is active at a time; switching loads that section's data.
//! Row actions go through [`AdminDashboard::dispatch`], and destructive ones
//! ask for confirmation before any request is sent.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

use super::charts::ChartRegistry;
use super::export;
use crate::api::admin::{
    ConsistencyStats, Overview, Progress, Quality, SpeakerStats, SystemStatus, UserDetails,
    UserStats, UserTestSetting,
};
use crate::api::{
    AdminList, AdminRole, ApiClient, ConsistencyReport, ExportFormat, ExportParams, NewAdmin,
    TestSettingFlag, TestSettingsUpdate,
};
use crate::core::error::{Error, Result};
use crate::core::prompt::Prompter;
use crate::output::banner::BannerBoard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Overview,
    Users,
    Admins,
    TestSettings,
    Speakers,
    Progress,
    Quality,
    Consistency,
    System,
}

impl Section {
    pub const ALL: [Section; 9] = [
        Section::Overview,
        Section::Users,
        Section::Admins,
        Section::TestSettings,
        Section::Speakers,
        Section::Progress,
        Section::Quality,
        Section::Consistency,
        Section::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Overview => "overview",
            Section::Users => "users",
            Section::Admins => "admins",
            Section::TestSettings => "test-settings",
            Section::Speakers => "speakers",
            Section::Progress => "progress",
            Section::Quality => "quality",
            Section::Consistency => "consistency",
            Section::System => "system",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Section::ALL
            .into_iter()
            .find(|section| section.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| {
                let names: Vec<&str> = Section::ALL.iter().map(|s| s.as_str()).collect();
                Error::validation(format!("Unknown section '{}' (one of: {})", s, names.join(", ")))
            })
    }
}

/// Data loaded for a section
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "section", content = "data", rename_all = "snake_case")]
pub enum SectionView {
    Overview(Overview),
    Users(Vec<UserStats>),
    Admins(AdminList),
    TestSettings(Vec<UserTestSetting>),
    Speakers(Vec<SpeakerStats>),
    Progress(Progress),
    Quality(Quality),
    Consistency {
        stats: ConsistencyStats,
        users: Vec<String>,
    },
    System(SystemStatus),
}

/// Row-level actions, keyed by the row they belong to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAction {
    ShowUserDetails { username: String },
    ResetUser { username: String },
    ToggleAdmin { id: i64, active: bool },
    DeleteAdmin { id: i64, username: String },
    SetTestSetting {
        username: String,
        flag: TestSettingFlag,
        value: bool,
    },
    ResetTestSettings { username: String },
}

#[derive(Debug, Clone)]
pub enum ActionOutcome {
    /// The confirmation was declined; nothing was sent
    Declined,
    Done { message: String },
    UserDetails(UserDetails),
}

pub struct AdminDashboard<P: Prompter> {
    api: ApiClient,
    prompter: P,
    active: Section,
    charts: ChartRegistry,
    banners: BannerBoard,
    admins: Option<AdminList>,
    last_report: Option<ConsistencyReport>,
}

impl<P: Prompter> AdminDashboard<P> {
    pub fn new(api: ApiClient, prompter: P, banners: BannerBoard) -> Self {
        Self {
            api,
            prompter,
            active: Section::Overview,
            charts: ChartRegistry::new(),
            banners,
            admins: None,
            last_report: None,
        }
    }

    pub fn active_section(&self) -> Section {
        self.active
    }

    pub fn charts(&self) -> &ChartRegistry {
        &self.charts
    }

    pub fn banners(&self) -> &BannerBoard {
        &self.banners
    }

    pub fn banners_mut(&mut self) -> &mut BannerBoard {
        &mut self.banners
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    pub fn last_report(&self) -> Option<&ConsistencyReport> {
        self.last_report.as_ref()
    }

    /// Run `fut`, turning a failure into an error banner
    async fn reported<T>(
        banners: &mut BannerBoard,
        context: &str,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        match fut.await {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(context, error = %e, "admin request failed");
                banners.error(context, &e);
                Err(e)
            }
        }
    }

    // ===== SECTIONS =====

    /// Make `section` the only active one and load it
    pub async fn switch_section(&mut self, section: Section) -> Result<SectionView> {
        debug!(%section, "switching section");
        self.active = section;
        self.load_section(section).await
    }

    async fn load_section(&mut self, section: Section) -> Result<SectionView> {
        let api = self.api.clone();
        let banners = &mut self.banners;
        let view = match section {
            Section::Overview => {
                SectionView::Overview(Self::reported(banners, "Loading overview failed", api.overview()).await?)
            }
            Section::Users => {
                SectionView::Users(Self::reported(banners, "Loading users failed", api.users()).await?)
            }
            Section::Admins => {
                let list = Self::reported(banners, "Loading admins failed", api.admins()).await?;
                self.admins = Some(list.clone());
                SectionView::Admins(list)
            }
            Section::TestSettings => SectionView::TestSettings(
                Self::reported(banners, "Loading test settings failed", api.users_test_settings()).await?,
            ),
            Section::Speakers => SectionView::Speakers(
                Self::reported(banners, "Loading speakers failed", api.speakers_stats()).await?,
            ),
            Section::Progress => {
                let progress = Self::reported(banners, "Loading progress failed", api.progress()).await?;
                self.charts.render_progress(&progress);
                SectionView::Progress(progress)
            }
            Section::Quality => {
                let quality = Self::reported(banners, "Loading quality data failed", api.quality()).await?;
                self.charts.render_quality(&quality);
                SectionView::Quality(quality)
            }
            Section::Consistency => {
                let stats =
                    Self::reported(banners, "Loading consistency data failed", api.consistency_stats()).await?;
                let users =
                    Self::reported(banners, "Loading consistency data failed", api.consistency_users()).await?;
                SectionView::Consistency { stats, users }
            }
            Section::System => SectionView::System(
                Self::reported(banners, "Loading system status failed", api.system_status()).await?,
            ),
        };
        Ok(view)
    }

    /// Reload the active section if it is `section`
    async fn refresh(&mut self, section: Section) {
        if self.active == section {
            if let Err(e) = self.load_section(section).await {
                debug!(%section, error = %e, "refresh failed");
            }
        }
    }

    async fn admin_list(&mut self) -> Result<&AdminList> {
        if self.admins.is_none() {
            let list = Self::reported(&mut self.banners, "Loading admins failed", self.api.admins()).await?;
            self.admins = Some(list);
        }
        self.admins
            .as_ref()
            .ok_or_else(|| Error::validation("Admin list unavailable"))
    }

    async fn ensure_unprotected(&mut self, id: i64) -> Result<()> {
        let protected = self
            .admin_list()
            .await?
            .admins
            .iter()
            .any(|a| a.id == id && a.is_protected());
        if protected {
            return Err(Error::validation("Super admin accounts cannot be changed here"));
        }
        Ok(())
    }

    // ===== ROW ACTIONS =====

    pub async fn dispatch(&mut self, action: AdminAction) -> Result<ActionOutcome> {
        debug!(?action, "admin action");
        let api = self.api.clone();
        match action {
            AdminAction::ShowUserDetails { username } => {
                let details = Self::reported(
                    &mut self.banners,
                    "Loading user details failed",
                    api.user_details(&username),
                )
                .await?;
                Ok(ActionOutcome::UserDetails(details))
            }
            AdminAction::ResetUser { username } => {
                let prompt = format!(
                    "Reset ALL annotation data of user \"{}\"? This cannot be undone.",
                    username
                );
                if !self.prompter.confirm(&prompt)? {
                    return Ok(ActionOutcome::Declined);
                }
                let result =
                    Self::reported(&mut self.banners, "Reset failed", api.reset_user(&username)).await?;
                let message = format!("Reset done, {} records deleted", result.deleted_records);
                info!(user = %username, deleted = result.deleted_records, "user reset");
                self.done(message, Section::Users).await
            }
            AdminAction::ToggleAdmin { id, active } => {
                self.ensure_unprotected(id).await?;
                let message = Self::reported(
                    &mut self.banners,
                    "Updating admin failed",
                    api.set_admin_active(id, active),
                )
                .await?;
                self.admins = None;
                let message = message.unwrap_or_else(|| {
                    format!("Admin {}", if active { "enabled" } else { "disabled" })
                });
                self.done(message, Section::Admins).await
            }
            AdminAction::DeleteAdmin { id, username } => {
                self.ensure_unprotected(id).await?;
                let prompt = format!("Delete admin \"{}\"? This cannot be undone.", username);
                if !self.prompter.confirm(&prompt)? {
                    return Ok(ActionOutcome::Declined);
                }
                let message =
                    Self::reported(&mut self.banners, "Deleting admin failed", api.delete_admin(id)).await?;
                self.admins = None;
                info!(admin = %username, "admin deleted");
                let message = message.unwrap_or_else(|| format!("Admin {} deleted", username));
                self.done(message, Section::Admins).await
            }
            AdminAction::SetTestSetting {
                username,
                flag,
                value,
            } => {
                let update = TestSettingsUpdate::flag(&username, flag, value);
                match api.set_user_test_settings(&update).await {
                    Ok(message) => {
                        let message = message.unwrap_or_else(|| "Test settings updated".to_string());
                        self.done(message, Section::TestSettings).await
                    }
                    Err(e) => {
                        warn!(user = %username, error = %e, "test setting update failed, reloading");
                        self.banners.error("Update failed", &e);
                        // restores the switch to the server's value
                        self.refresh(Section::TestSettings).await;
                        Err(e)
                    }
                }
            }
            AdminAction::ResetTestSettings { username } => {
                let prompt = format!(
                    "Reset the test settings of user {}? They will have to take the qualification and consistency tests again.",
                    username
                );
                if !self.prompter.confirm(&prompt)? {
                    return Ok(ActionOutcome::Declined);
                }
                Self::reported(
                    &mut self.banners,
                    "Reset failed",
                    api.set_user_test_settings(&TestSettingsUpdate::reset(&username)),
                )
                .await?;
                self.done("Test settings reset".to_string(), Section::TestSettings)
                    .await
            }
        }
    }

    async fn done(&mut self, message: String, section: Section) -> Result<ActionOutcome> {
        self.banners.success(message.clone());
        self.refresh(section).await;
        Ok(ActionOutcome::Done { message })
    }

    // ===== ACCOUNTS =====

    /// Only super admins may create accounts
    pub async fn create_admin(&mut self, admin: NewAdmin) -> Result<String> {
        if admin.username.trim().is_empty() || admin.password.is_empty() {
            return Err(Error::validation("Username and password are required"));
        }
        let role = self
            .admin_list()
            .await?
            .current_admin
            .as_ref()
            .map(|c| c.role);
        if role != Some(AdminRole::SuperAdmin) {
            return Err(Error::validation("Only a super admin can create admins"));
        }
        let message =
            Self::reported(&mut self.banners, "Creating admin failed", self.api.create_admin(&admin)).await?;
        self.admins = None;
        let message = message.unwrap_or_else(|| format!("Admin {} created", admin.username));
        self.banners.success(message.clone());
        self.refresh(Section::Admins).await;
        Ok(message)
    }

    pub async fn change_password(&mut self, old: &str, new: &str, confirm: &str) -> Result<String> {
        if old.is_empty() || new.is_empty() {
            return Err(Error::validation("Both the current and the new password are required"));
        }
        if new != confirm {
            return Err(Error::validation("New password and confirmation do not match"));
        }
        let message = Self::reported(
            &mut self.banners,
            "Changing password failed",
            self.api.change_password(old, new),
        )
        .await?;
        let message = message.unwrap_or_else(|| "Password changed".to_string());
        self.banners.success(message.clone());
        Ok(message)
    }

    // ===== EXPORT & MAINTENANCE =====

    pub async fn export_data(&mut self, params: &ExportParams) -> Result<String> {
        let result = Self::reported(&mut self.banners, "Export failed", self.api.export(params)).await?;
        let message = format!(
            "Export done: {} ({} records)",
            result.filename, result.record_count
        );
        self.banners.success(message.clone());
        Ok(message)
    }

    /// Download an export into `dir`
    pub async fn download(&mut self, params: &ExportParams, dir: &Path) -> Result<PathBuf> {
        let bytes = Self::reported(&mut self.banners, "Download failed", self.api.download(params)).await?;
        let mut name = String::from("annotations_export");
        if let Some(user) = &params.username {
            name.push_str(&format!("_{}", user));
        }
        if let Some(speaker) = &params.speaker {
            name.push_str(&format!("_{}", speaker));
        }
        let path = dir.join(format!("{}.{}", name, params.format.extension()));
        export::save_bytes(&path, &bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "export downloaded");
        self.banners.success(format!("Downloaded to {}", path.display()));
        Ok(path)
    }

    pub async fn backup(&mut self) -> Result<String> {
        let result = Self::reported(&mut self.banners, "Backup failed", self.api.backup()).await?;
        let message = format!("Backup done: {}", result.backup_filename);
        self.banners.success(message.clone());
        Ok(message)
    }

    // ===== CONSISTENCY =====

    pub async fn calculate_consistency(&mut self, username: &str) -> Result<&ConsistencyReport> {
        if username.trim().is_empty() {
            return Err(Error::validation("Choose a user first"));
        }
        let report = Self::reported(
            &mut self.banners,
            "Consistency calculation failed",
            self.api.calculate_consistency(username),
        )
        .await?;
        info!(user = username, overall = report.overall_consistency, "consistency calculated");
        Ok(self.last_report.insert(report))
    }

    /// Write the last calculated report to `dir`
    pub fn export_report(&mut self, format: ExportFormat, dir: &Path) -> Result<PathBuf> {
        let report = self
            .last_report
            .as_ref()
            .ok_or_else(|| Error::validation("Calculate a consistency report first"))?;
        let path = export::write_report(report, format, dir)?;
        self.banners
            .success(format!("{} report exported to {}", format, path.display()));
        Ok(path)
    }

    pub async fn logout(&mut self) -> Result<()> {
        Self::reported(&mut self.banners, "Logout failed", self.api.admin_logout()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prompt::ScriptedPrompter;
    use tempfile::TempDir;

    fn dashboard(prompter: ScriptedPrompter) -> AdminDashboard<ScriptedPrompter> {
        let api = ApiClient::new("http://127.0.0.1:9", None).unwrap();
        AdminDashboard::new(api, prompter, BannerBoard::default())
    }

    #[test]
    fn test_section_names_round_trip() {
        for section in Section::ALL {
            assert_eq!(section.as_str().parse::<Section>().unwrap(), section);
        }
        assert!("nope".parse::<Section>().is_err());
    }

    #[tokio::test]
    async fn test_switch_marks_one_section_active() {
        let mut dash = dashboard(ScriptedPrompter::always(true));
        assert!(dash.switch_section(Section::Quality).await.is_err());
        assert_eq!(dash.active_section(), Section::Quality);
        assert!(dash.banners().current().unwrap().is_error());
        assert!(dash.charts().is_empty());
    }

    #[tokio::test]
    async fn test_declined_destructive_actions_send_nothing() {
        let mut dash = dashboard(ScriptedPrompter::always(false));
        let outcome = dash
            .dispatch(AdminAction::ResetUser {
                username: "alice".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(outcome, ActionOutcome::Declined));

        let outcome = dash
            .dispatch(AdminAction::ResetTestSettings {
                username: "alice".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(outcome, ActionOutcome::Declined));
        assert_eq!(dash.prompter().asked(), 2);
        // nothing was sent, so no failure banner
        assert!(dash.banners().current().is_none());
    }

    #[tokio::test]
    async fn test_password_mismatch_is_caught_locally() {
        let mut dash = dashboard(ScriptedPrompter::always(true));
        let err = dash.change_password("old", "new1", "new2").await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert!(dash.banners().current().is_none());
    }

    #[test]
    fn test_export_report_requires_calculation() {
        let dir = TempDir::new().unwrap();
        let mut dash = dashboard(ScriptedPrompter::always(true));
        assert!(dash.export_report(ExportFormat::Csv, dir.path()).is_err());

        dash.last_report = Some(ConsistencyReport {
            username: "alice".to_string(),
            ..Default::default()
        });
        let path = dash.export_report(ExportFormat::Json, dir.path()).unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_super_admin_rows_are_protected() {
        let mut dash = dashboard(ScriptedPrompter::always(true));
        dash.admins = Some(AdminList {
            admins: vec![crate::api::AdminAccount {
                id: 1,
                username: "root".to_string(),
                role: AdminRole::SuperAdmin,
                description: None,
                is_active: true,
                created_at: None,
            }],
            current_admin: None,
        });

        let err = dash
            .dispatch(AdminAction::DeleteAdmin {
                id: 1,
                username: "root".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert_eq!(dash.prompter().asked(), 0);
        assert!(dash
            .dispatch(AdminAction::ToggleAdmin { id: 1, active: false })
            .await
            .is_err());

        // plain admins may not create accounts
        let err = dash
            .create_admin(NewAdmin {
                username: "new".to_string(),
                password: "pw".to_string(),
                description: String::new(),
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("super admin"));
    }

    #[tokio::test]
    async fn test_create_admin_validates_input() {
        let mut dash = dashboard(ScriptedPrompter::always(true));
        let err = dash
            .create_admin(NewAdmin {
                username: " ".to_string(),
                password: "pw".to_string(),
                description: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }
}
