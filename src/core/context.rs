//! Page-level application state handed to every component

use std::sync::Arc;

use crate::api::ApiClient;
use crate::core::config::Config;
use crate::core::request::RequestTokens;

/// Shared state of one page: client, config, request tokens and the user.
///
/// Cloning shares everything; components keep their own clone.
#[derive(Clone)]
pub struct AppContext {
    pub api: ApiClient,
    pub config: Arc<Config>,
    pub tokens: RequestTokens,
    username: Arc<str>,
}

impl AppContext {
    pub fn new(api: ApiClient, config: Config, username: impl Into<String>) -> Self {
        Self {
            api,
            config: Arc::new(config),
            tokens: RequestTokens::new(),
            username: Arc::from(username.into()),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}
