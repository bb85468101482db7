//! Local session file
//!
//! `session.json` under the emolabel home keeps what a browser would keep
//! between page loads: the last username, the server session cookie and the
//! users that passed the qualification test on this machine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::core::config::Config;
use crate::core::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionData {
    pub username: Option<String>,
    /// `Cookie` header value for the server base URL
    pub cookies: Option<String>,
    pub passed_users: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct UsernameStore {
    path: PathBuf,
    data: SessionData,
}

impl UsernameStore {
    /// Open the default session file
    pub fn open() -> Result<Self> {
        Ok(Self::open_at(Config::session_path()?))
    }

    /// Open `path`; a missing or unreadable file starts an empty session
    pub fn open_at(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = Self::read(&path).unwrap_or_default();
        Self { path, data }
    }

    fn read(path: &Path) -> Option<SessionData> {
        if !path.exists() {
            return None;
        }
        let content = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt session file");
                None
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn username(&self) -> Option<&str> {
        self.data.username.as_deref()
    }

    pub fn set_username(&mut self, username: &str) {
        self.data.username = Some(username.to_string());
    }

    pub fn cookies(&self) -> Option<&str> {
        self.data.cookies.as_deref()
    }

    pub fn set_cookies(&mut self, cookies: Option<String>) {
        self.data.cookies = cookies;
    }

    pub fn has_passed(&self, username: &str) -> bool {
        self.data.passed_users.contains(username)
    }

    pub fn mark_passed(&mut self, username: &str) {
        self.data.passed_users.insert(username.to_string());
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.data)?;
        std::fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    /// Forget the user and cookie; qualification passes survive a logout
    pub fn clear(&mut self) -> Result<()> {
        self.data.username = None;
        self.data.cookies = None;
        self.save()
    }
}
