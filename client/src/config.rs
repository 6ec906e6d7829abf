//! Client configuration parsed from environment variables.

use std::num::NonZeroU32;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_PAGE_LIMIT: u32 = 100;
const SESSION_DIR: &str = ".pedidos";
const SESSION_FILE: &str = "session.json";
const FALLBACK_SESSION_FILE: &str = ".pedidos-session.json";

/// Errors produced while reading configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The API base URL is not an absolute http(s) URL.
    #[error("invalid API URL '{0}': expected http:// or https://")]
    InvalidApiUrl(String),

    /// A numeric setting could not be parsed.
    #[error("invalid value for {var}: '{value}'")]
    InvalidNumber { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API base URL without a trailing slash.
    pub api_url: String,
    /// File holding the persisted session entries.
    pub session_file: PathBuf,
    /// Whole-request timeout. `None` leaves the transport default in place.
    pub request_timeout: Option<Duration>,
    /// Page size used when listing orders.
    pub page_limit: u32,
}

impl ClientConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `PEDIDOS_API_URL`: default `http://localhost:8080`
    /// - `PEDIDOS_SESSION_FILE`: default `$HOME/.pedidos/session.json`
    /// - `PEDIDOS_REQUEST_TIMEOUT_SECS`: unset means no client-side timeout
    /// - `PEDIDOS_PAGE_LIMIT`: default 100, must be at least 1
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed or a number fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = std::env::var("PEDIDOS_API_URL").ok();
        let session_file = std::env::var("PEDIDOS_SESSION_FILE").ok().map(PathBuf::from);
        let request_timeout = env_parse::<u64>("PEDIDOS_REQUEST_TIMEOUT_SECS")?.map(Duration::from_secs);
        let page_limit = env_parse::<NonZeroU32>("PEDIDOS_PAGE_LIMIT")?.map_or(DEFAULT_PAGE_LIMIT, NonZeroU32::get);

        Ok(Self {
            api_url: normalize_api_url(api_url.as_deref().unwrap_or(DEFAULT_API_URL))?,
            session_file: session_file.unwrap_or_else(default_session_file),
            request_timeout,
            page_limit,
        })
    }

    /// Config pointing at `api_url` with every other setting at its default.
    ///
    /// # Errors
    ///
    /// Returns an error if `api_url` is not an http(s) URL.
    pub fn with_api_url(api_url: &str, session_file: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: normalize_api_url(api_url)?,
            session_file: session_file.into(),
            request_timeout: None,
            page_limit: DEFAULT_PAGE_LIMIT,
        })
    }
}

/// Trim whitespace and trailing slashes, and require an http(s) scheme.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidApiUrl`] for anything else.
pub fn normalize_api_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let has_host = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .is_some_and(|rest| !rest.is_empty());
    if !has_host {
        return Err(ConfigError::InvalidApiUrl(raw.to_owned()));
    }
    Ok(trimmed.to_owned())
}

fn default_session_file() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home).join(SESSION_DIR).join(SESSION_FILE),
        _ => PathBuf::from(FALLBACK_SESSION_FILE),
    }
}

fn env_parse<T: FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var, value: raw }),
        _ => Ok(None),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
