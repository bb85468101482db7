//! Admin namespace (`/admin/api/...`)

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use url::Url;

use super::client::{segment, ApiClient};
use crate::core::error::{Error, Result};

// =============================================================================
// STATISTICS
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Overview {
    pub total_users: u64,
    pub total_audio_files: u64,
    pub total_annotations: u64,
    pub completion_rate: f64,
    pub today_annotations: u64,
    pub active_users: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserStats {
    pub username: String,
    pub total_annotations: u64,
    pub completed_annotations: u64,
    pub completion_rate: f64,
    pub speakers_count: u64,
    pub avg_play_count: f64,
    pub last_annotation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDetails {
    pub username: String,
    pub total_annotations: u64,
    pub completed_annotations: u64,
    pub completion_rate: f64,
    pub speakers_count: u64,
    pub total_duration: f64,
    pub avg_play_count: f64,
    pub speakers_stats: Vec<UserSpeakerStats>,
    pub recent_annotations: Vec<RecentAnnotation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSpeakerStats {
    pub speaker: String,
    pub annotations_count: u64,
    pub completed_count: u64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecentAnnotation {
    pub audio_file: String,
    pub speaker: String,
    pub va_complete: bool,
    pub discrete_complete: bool,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeakerStats {
    pub speaker: String,
    pub total_annotations: u64,
    pub completed_annotations: u64,
    pub completion_rate: f64,
    pub annotators_count: u64,
    pub audio_files_count: u64,
    pub total_duration: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Progress {
    pub daily_progress: Vec<DailyProgress>,
    pub weekly_user_progress: Vec<WeeklyUserProgress>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyProgress {
    pub date: String,
    pub annotations: u64,
    pub completed: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklyUserProgress {
    pub username: String,
    pub annotations: u64,
    pub completed: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Quality {
    pub play_count_distribution: Vec<PlayCountBucket>,
    pub emotion_type_distribution: Vec<EmotionTypeCount>,
    pub discrete_emotion_distribution: Vec<DiscreteEmotionCount>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayCountBucket {
    pub range: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionTypeCount {
    #[serde(rename = "type")]
    pub emotion_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscreteEmotionCount {
    pub emotion: String,
    pub count: u64,
}

// =============================================================================
// SYSTEM
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStatus {
    pub database: DatabaseStatus,
    pub audio_folder: AudioFolderStatus,
    pub disk_space: DiskSpace,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseStatus {
    pub exists: bool,
    pub accessible: bool,
    pub size_mb: f64,
    pub total_records: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioFolderStatus {
    pub exists: bool,
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskSpace {
    pub total_gb: f64,
    pub used_gb: f64,
    pub free_gb: f64,
    pub usage_percent: f64,
}

/// Severity shown next to disk usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageClass {
    Good,
    Warning,
    Error,
}

impl DiskSpace {
    pub fn usage_class(&self) -> UsageClass {
        if self.usage_percent > 90.0 {
            UsageClass::Error
        } else if self.usage_percent > 80.0 {
            UsageClass::Warning
        } else {
            UsageClass::Good
        }
    }
}

// =============================================================================
// ADMIN ACCOUNTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    SuperAdmin,
    Admin,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminAccount {
    pub id: i64,
    pub username: String,
    pub role: AdminRole,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl AdminAccount {
    /// Super admins cannot be toggled or deleted from the dashboard
    pub fn is_protected(&self) -> bool {
        self.role == AdminRole::SuperAdmin
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    #[serde(default)]
    pub username: Option<String>,
    pub role: AdminRole,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminList {
    pub admins: Vec<AdminAccount>,
    pub current_admin: Option<CurrentAdmin>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAdmin {
    pub username: String,
    pub password: String,
    pub description: String,
}

// =============================================================================
// USER TEST SETTINGS
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserTestSetting {
    pub wechat_name: String,
    pub phone_number: String,
    pub created_at: Option<String>,
    pub skip_test: bool,
    pub skip_consistency_test: bool,
}

/// Partial update; unset flags are left unchanged by the server
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestSettingsUpdate {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_test: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_consistency_test: Option<bool>,
}

/// Which test-setting switch a row action flips
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestSettingFlag {
    SkipTest,
    SkipConsistencyTest,
}

impl TestSettingsUpdate {
    pub fn flag(username: &str, flag: TestSettingFlag, value: bool) -> Self {
        let mut update = TestSettingsUpdate {
            username: username.to_string(),
            ..Default::default()
        };
        match flag {
            TestSettingFlag::SkipTest => update.skip_test = Some(value),
            TestSettingFlag::SkipConsistencyTest => update.skip_consistency_test = Some(value),
        }
        update
    }

    /// Require both tests again
    pub fn reset(username: &str) -> Self {
        TestSettingsUpdate {
            username: username.to_string(),
            skip_test: Some(false),
            skip_consistency_test: Some(false),
        }
    }
}

// =============================================================================
// EXPORT / MAINTENANCE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(Error::validation(format!(
                "Unsupported export format '{}' (csv or json)",
                other
            ))),
        }
    }
}

/// Query of `/admin/api/export` and `/admin/api/export/download`
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportParams {
    pub format: ExportFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportResult {
    pub filename: String,
    pub record_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupResult {
    pub backup_filename: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetResult {
    pub deleted_records: u64,
}

// =============================================================================
// CONSISTENCY ANALYSIS
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencyStats {
    pub users_count: u64,
    pub samples_count: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConsistencyUsers {
    users: Vec<String>,
}

/// A value per annotation dimension
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dimensions<T> {
    pub v_value: T,
    pub a_value: T,
    pub emotion_type: T,
    pub discrete_emotion: T,
    pub patient_status: T,
}

/// Annotation values as the analysis reports them (strings or numbers)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportedValues {
    #[serde(default)]
    pub v_value: Option<Value>,
    #[serde(default)]
    pub a_value: Option<Value>,
    #[serde(default)]
    pub emotion_type: Option<Value>,
    #[serde(default)]
    pub discrete_emotion: Option<Value>,
    #[serde(default)]
    pub patient_status: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencyDetail {
    pub audio_file: String,
    pub v_consistent: bool,
    pub a_consistent: bool,
    pub emotion_type_consistent: bool,
    pub discrete_consistent: bool,
    pub patient_consistent: bool,
    pub user_values: ReportedValues,
    pub standard_values: ReportedValues,
}

impl ConsistencyDetail {
    pub fn fully_consistent(&self) -> bool {
        self.v_consistent
            && self.a_consistent
            && self.emotion_type_consistent
            && self.discrete_consistent
            && self.patient_consistent
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencyReport {
    pub username: String,
    pub total_samples: u64,
    pub consistency_scores: Dimensions<u64>,
    pub consistency_percentages: Dimensions<f64>,
    pub overall_consistency: f64,
    pub detailed_results: Vec<ConsistencyDetail>,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct ActiveFlag {
    is_active: bool,
}

#[derive(Debug, Serialize)]
struct PasswordChange<'a> {
    old_password: &'a str,
    new_password: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TestSettingsUsers {
    users: Vec<UserTestSetting>,
}

impl ApiClient {
    pub async fn overview(&self) -> Result<Overview> {
        self.get("admin/api/overview").await
    }

    pub async fn users(&self) -> Result<Vec<UserStats>> {
        self.get("admin/api/users").await
    }

    pub async fn user_details(&self, username: &str) -> Result<UserDetails> {
        self.get(&format!("admin/api/users/{}/details", segment(username)))
            .await
    }

    pub async fn speakers_stats(&self) -> Result<Vec<SpeakerStats>> {
        self.get("admin/api/speakers").await
    }

    pub async fn progress(&self) -> Result<Progress> {
        self.get("admin/api/progress").await
    }

    pub async fn quality(&self) -> Result<Quality> {
        self.get("admin/api/quality").await
    }

    pub async fn system_status(&self) -> Result<SystemStatus> {
        self.get("admin/api/system/status").await
    }

    pub async fn admins(&self) -> Result<AdminList> {
        self.get("admin/api/admins").await
    }

    pub async fn create_admin(&self, admin: &NewAdmin) -> Result<Option<String>> {
        let res: Message = self.post("admin/api/admins", admin).await?;
        Ok(res.message)
    }

    pub async fn set_admin_active(&self, id: i64, is_active: bool) -> Result<Option<String>> {
        let res: Message = self
            .put(&format!("admin/api/admins/{}", id), &ActiveFlag { is_active })
            .await?;
        Ok(res.message)
    }

    pub async fn delete_admin(&self, id: i64) -> Result<Option<String>> {
        let res: Message = self.delete(&format!("admin/api/admins/{}", id)).await?;
        Ok(res.message)
    }

    pub async fn change_password(&self, old_password: &str, new_password: &str) -> Result<Option<String>> {
        let res: Message = self
            .post(
                "admin/api/admins/change-password",
                &PasswordChange {
                    old_password,
                    new_password,
                },
            )
            .await?;
        Ok(res.message)
    }

    pub async fn users_test_settings(&self) -> Result<Vec<UserTestSetting>> {
        let res: TestSettingsUsers = self.get("admin/api/users/test-settings").await?;
        Ok(res.users)
    }

    pub async fn set_user_test_settings(&self, update: &TestSettingsUpdate) -> Result<Option<String>> {
        let res: Message = self.post("admin/api/users/test-settings", update).await?;
        Ok(res.message)
    }

    /// Delete every annotation of one user
    pub async fn reset_user(&self, username: &str) -> Result<ResetResult> {
        self.post_empty(&format!("admin/api/users/{}/reset", segment(username)))
            .await
    }

    /// Server-side export; reports the written file and its row count
    pub async fn export(&self, params: &ExportParams) -> Result<ExportResult> {
        self.get_with_query("admin/api/export", params).await
    }

    pub fn download_url(&self, params: &ExportParams) -> Result<Url> {
        let mut url = self.resolve("admin/api/export/download")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("format", params.format.extension());
            if let Some(username) = &params.username {
                query.append_pair("username", username);
            }
            if let Some(speaker) = &params.speaker {
                query.append_pair("speaker", speaker);
            }
        }
        Ok(url)
    }

    pub async fn download(&self, params: &ExportParams) -> Result<Vec<u8>> {
        self.get_bytes("admin/api/export/download", params).await
    }

    pub async fn backup(&self) -> Result<BackupResult> {
        self.post_empty("admin/api/backup").await
    }

    pub async fn consistency_stats(&self) -> Result<ConsistencyStats> {
        self.get("admin/api/consistency/stats").await
    }

    pub async fn consistency_users(&self) -> Result<Vec<String>> {
        let res: ConsistencyUsers = self.get("admin/api/consistency/users").await?;
        Ok(res.users)
    }

    pub async fn calculate_consistency(&self, username: &str) -> Result<ConsistencyReport> {
        self.get(&format!(
            "admin/api/consistency/calculate/{}",
            segment(username)
        ))
        .await
    }

    pub async fn admin_logout(&self) -> Result<()> {
        let _: Value = self.post_empty("admin/logout").await?;
        Ok(())
    }
}
