//! HTTP client shared by every page controller

use crate::core::config::Config;
use crate::core::error::{Error, Result};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Thin JSON client over the annotation service.
///
/// Cloning is cheap; clones share the connection pool and the session cookie.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    jar: Arc<Jar>,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut base = Url::parse(base_url.trim())?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let jar = Arc::new(Jar::default());
        let mut builder = Client::builder().cookie_provider(jar.clone());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| Error::ConfigError {
            message: format!("Failed to build HTTP client: {}", e),
        })?;

        Ok(Self { http, jar, base })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.server.base_url, config.timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve a server-relative path (`/api/audio/...`) into an absolute URL
    pub fn resolve(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    /// Session cookies as a `name=value; name=value` string, for persisting
    pub fn session_cookies(&self) -> Option<String> {
        self.jar
            .cookies(&self.base)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }

    /// Restore cookies previously returned by [`session_cookies`](Self::session_cookies)
    pub fn restore_session_cookies(&self, cookies: &str) {
        for pair in cookies.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            self.jar
                .add_cookie_str(&format!("{}; Path=/", pair), &self.base);
        }
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.resolve(path)?;
        self.send(self.http.get(url), Method::GET, path).await
    }

    pub(crate) async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.resolve(path)?;
        self.send(self.http.get(url).query(query), Method::GET, path)
            .await
    }

    pub(crate) async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.resolve(path)?;
        self.send(self.http.post(url).json(body), Method::POST, path)
            .await
    }

    pub(crate) async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.resolve(path)?;
        self.send(self.http.post(url), Method::POST, path).await
    }

    pub(crate) async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.resolve(path)?;
        self.send(self.http.put(url).json(body), Method::PUT, path)
            .await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.resolve(path)?;
        self.send(self.http.delete(url), Method::DELETE, path).await
    }

    /// Fetch a raw body (file downloads)
    pub(crate) async fn get_bytes<Q>(&self, path: &str, query: &Q) -> Result<Vec<u8>>
    where
        Q: Serialize + ?Sized,
    {
        let url = self.resolve(path)?;
        let res = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| network_error("GET", path, e))?;

        let status = res.status();
        debug!(method = "GET", path, status = status.as_u16(), "api response");
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return decode_envelope::<Value>(status.as_u16(), status.canonical_reason(), &body)
                .and(Err(Error::Api {
                    status: status.as_u16(),
                    message: status
                        .canonical_reason()
                        .unwrap_or("Download failed")
                        .to_string(),
                }));
        }

        let bytes = res
            .bytes()
            .await
            .map_err(|e| network_error("GET", path, e))?;
        Ok(bytes.to_vec())
    }

    async fn send<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        method: Method,
        path: &str,
    ) -> Result<T> {
        let res = req
            .send()
            .await
            .map_err(|e| network_error(method.as_str(), path, e))?;

        let status = res.status();
        debug!(method = %method, path, status = status.as_u16(), "api response");

        let body = res
            .text()
            .await
            .map_err(|e| network_error(method.as_str(), path, e))?;

        decode_envelope(status.as_u16(), status.canonical_reason(), &body)
    }
}

fn network_error(method: &str, path: &str, e: reqwest::Error) -> Error {
    warn!(method, path, error = %e, "request failed without a response");
    Error::Network {
        message: format!("{} {} failed: {}", method, path, e),
    }
}

/// Apply the service's response conventions to a raw body.
///
/// Non-2xx statuses and `{"success": false}` bodies become [`Error::Api`]
/// carrying the body's `error` (or `message`) text.
pub(crate) fn decode_envelope<T: DeserializeOwned>(
    status: u16,
    reason: Option<&str>,
    body: &str,
) -> Result<T> {
    let ok = (200..300).contains(&status);
    let fallback = || reason.unwrap_or("Request failed").to_string();

    let value: Value = if body.trim().is_empty() {
        Value::Null
    } else {
        match serde_json::from_str(body) {
            Ok(value) => value,
            Err(_) if !ok => {
                return Err(Error::Api {
                    status,
                    message: fallback(),
                })
            }
            Err(e) => {
                return Err(Error::Api {
                    status,
                    message: format!("Malformed response: {}", e),
                })
            }
        }
    };

    if !ok {
        return Err(Error::Api {
            status,
            message: error_message(&value).unwrap_or_else(fallback),
        });
    }

    if value.get("success") == Some(&Value::Bool(false)) {
        return Err(Error::Api {
            status,
            message: error_message(&value).unwrap_or_else(fallback),
        });
    }

    Ok(serde_json::from_value(value)?)
}

fn error_message(value: &Value) -> Option<String> {
    value
        .get("error")
        .or_else(|| value.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Percent-encode one path segment
pub(crate) fn segment(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}
