//! Login, session status and per-user test settings

use serde::{Deserialize, Serialize};

use super::client::{segment, ApiClient};
use crate::core::error::Result;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    /// WeChat nickname field of the login form
    text1: &'a str,
    /// Phone number field of the login form
    password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub username: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SessionStatus {
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub username: Option<String>,
}

/// Which gating tests a user may skip
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSettings {
    #[serde(default)]
    pub skip_test: bool,
    #[serde(default)]
    pub skip_consistency_test: bool,
}

#[derive(Debug, Serialize)]
struct UsernameBody<'a> {
    username: &'a str,
}

#[derive(Debug, Deserialize)]
struct Ack {}

impl ApiClient {
    /// Annotator login; the server keeps the session in a cookie
    pub async fn login(&self, nickname: &str, phone: &str) -> Result<LoginResponse> {
        let body = LoginRequest {
            text1: nickname,
            password: phone,
        };
        self.post("login", &body).await
    }

    pub async fn session_status(&self) -> Result<SessionStatus> {
        self.get("api/user/session-status").await
    }

    /// `GET /api/user/test-settings/<username>`
    pub async fn test_settings(&self, username: &str) -> Result<TestSettings> {
        self.get(&format!("api/user/test-settings/{}", segment(username)))
            .await
    }

    /// `POST /api/user/test-settings`, used by the post-login router
    pub async fn check_test_settings(&self, username: &str) -> Result<TestSettings> {
        self.post("api/user/test-settings", &UsernameBody { username })
            .await
    }

    /// End the annotator session
    pub async fn logout(&self) -> Result<()> {
        match self.get::<serde_json::Value>("logout").await {
            Ok(_) => Ok(()),
            // Answered with a redirect to the HTML login page; any response ends the session
            Err(e) if e.is_api() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Administrator login (`POST /admin/login`)
    pub async fn admin_login(&self, username: &str, password: &str) -> Result<()> {
        #[derive(Serialize)]
        struct AdminLogin<'a> {
            username: &'a str,
            password: &'a str,
        }
        let _: Ack = self
            .post("admin/login", &AdminLogin { username, password })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_body_uses_form_field_names() {
        let body = LoginRequest {
            text1: "小明",
            password: "13812345678",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["text1"], "小明");
        assert_eq!(json["password"], "13812345678");
    }

    #[test]
    fn test_settings_default_to_false() {
        let settings: TestSettings = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert_eq!(settings, TestSettings::default());
    }
}
