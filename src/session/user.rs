//! Annotator login, session bootstrap and post-login routing

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use tracing::{debug, info, warn};

use super::store::UsernameStore;
use crate::api::session::LoginResponse;
use crate::api::{ApiClient, TestSettings};
use crate::core::error::{Error, Result};
use crate::core::prompt::Prompter;

static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^1[3-9]\d{9}$").unwrap());

pub const LOGOUT_PROMPT: &str = "Log out now?";

/// Where a user goes after login
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Test,
    ConsistencyTest,
    Main,
}

impl Page {
    /// Subcommand that serves the page
    pub fn command(&self) -> &'static str {
        match self {
            Page::Test => "test",
            Page::ConsistencyTest => "consistency",
            Page::Main => "annotate",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Page::Test => "qualification test",
            Page::ConsistencyTest => "consistency test",
            Page::Main => "annotation workspace",
        };
        write!(f, "{}", s)
    }
}

/// Test first, then the consistency test, then the workspace
pub fn route_for(settings: TestSettings) -> Page {
    if !settings.skip_test {
        Page::Test
    } else if !settings.skip_consistency_test {
        Page::ConsistencyTest
    } else {
        Page::Main
    }
}

/// Check the login form; returns the trimmed nickname and phone
pub fn validate_login(nickname: &str, phone: &str) -> Result<(String, String)> {
    let nickname = nickname.trim();
    let phone = phone.trim();
    if nickname.is_empty() {
        return Err(Error::validation("Please enter your WeChat nickname"));
    }
    if phone.is_empty() {
        return Err(Error::validation("Please enter your phone number"));
    }
    if !PHONE_RE.is_match(phone) {
        return Err(Error::validation("Please enter a valid phone number"));
    }
    Ok((nickname.to_string(), phone.to_string()))
}

pub struct UserManager {
    api: ApiClient,
    store: UsernameStore,
    current: Option<String>,
}

impl UserManager {
    /// Restores any saved server session into `api`
    pub fn new(api: ApiClient, store: UsernameStore) -> Self {
        if let Some(cookies) = store.cookies() {
            api.restore_session_cookies(cookies);
        }
        Self {
            api,
            store,
            current: None,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn store(&self) -> &UsernameStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut UsernameStore {
        &mut self.store
    }

    /// The server-verified user, once `init_auth` or `login` succeeded
    pub fn current_username(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Default for commands run without `--username`; never an auth decision
    pub fn remembered_username(&self) -> Option<&str> {
        self.current_username().or_else(|| self.store.username())
    }

    pub async fn login(&mut self, nickname: &str, phone: &str) -> Result<LoginResponse> {
        let (nickname, phone) = validate_login(nickname, phone)?;
        let response = self.api.login(&nickname, &phone).await?;
        info!(user = %response.username, "logged in");

        self.current = Some(response.username.clone());
        self.store.set_username(&response.username);
        self.remember_session()?;
        Ok(response)
    }

    /// Ask the server who is logged in
    pub async fn init_auth(&mut self) -> Result<String> {
        let status = self.api.session_status().await?;
        match status.username {
            Some(username) if status.authenticated => {
                debug!(user = %username, "session verified");
                self.current = Some(username.clone());
                Ok(username)
            }
            _ => {
                self.current = None;
                Err(Error::NotAuthenticated)
            }
        }
    }

    /// Page to open after login; settings failures send the user to the test
    pub async fn next_page(&self, username: &str) -> Page {
        match self.api.check_test_settings(username).await {
            Ok(settings) => {
                let page = route_for(settings);
                debug!(user = username, ?settings, %page, "routing");
                page
            }
            Err(e) => {
                warn!(user = username, error = %e, "test settings unavailable, defaulting to test");
                Page::Test
            }
        }
    }

    /// Like [`next_page`](Self::next_page), but a test skipped on this
    /// machine moves the user on to the consistency test
    pub async fn landing_page(&self, username: &str) -> Page {
        let page = self.next_page(username).await;
        if page == Page::Test && self.store.has_passed(username) {
            debug!(user = username, "qualification test skipped locally");
            return Page::ConsistencyTest;
        }
        page
    }

    /// Save the current server cookies with the local session
    pub fn remember_session(&mut self) -> Result<()> {
        self.store.set_cookies(self.api.session_cookies());
        self.store.save()
    }

    /// Returns `false` when the user changed their mind
    pub async fn logout(&mut self, prompter: &mut dyn Prompter) -> Result<bool> {
        if !prompter.confirm(LOGOUT_PROMPT)? {
            return Ok(false);
        }
        if let Err(e) = self.api.logout().await {
            warn!(error = %e, "server logout failed, clearing local session anyway");
        }
        self.current = None;
        self.store.clear()?;
        info!("logged out");
        Ok(true)
    }
}
