//! Configuration management for rymlinks.
//!
//! Values come from environment variables, optionally seeded from a `.env`
//! file in the local data directory. Lookup order:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Built-in defaults for everything except the client credentials

use std::{env, path::PathBuf, time::Duration};

use reqwest::Client;

use crate::error::ConfigError;

pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_OPEN_URL: &str = "https://open.spotify.com";
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8888";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";
pub const DEFAULT_MARKET: &str = "US";
/// Upper bound for one HTTP request, connect to last body byte.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Returns the application's directory below the platform data directory.
///
/// - Linux: `~/.local/share/rymlinks`
/// - macOS: `~/Library/Application Support/rymlinks`
/// - Windows: `%LOCALAPPDATA%/rymlinks`
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("rymlinks");
    path
}

/// Loads environment variables from `<data_dir>/.env`.
///
/// Creates the data directory if needed. A missing `.env` file is not an
/// error since every value can also be supplied through the process
/// environment; a file that exists but cannot be parsed is.
pub async fn load_env() -> Result<(), ConfigError> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent).await?;
    }

    if path.is_file() {
        dotenv::from_path(&path)?;
    }
    Ok(())
}

/// Runtime configuration for the Spotify client and the callback server.
#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    /// Only needed for the client-credentials (app token) flow.
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub server_address: String,
    pub scope: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
    pub open_url: String,
    pub market: String,
}

impl Config {
    /// Creates a configuration with default Spotify endpoints.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
            scope: String::new(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            open_url: DEFAULT_OPEN_URL.to_string(),
            market: DEFAULT_MARKET.to_string(),
        }
    }

    /// Builds the configuration from `RYMLINKS_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVar`] if `RYMLINKS_CLIENT_ID` is unset
    /// or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let client_id =
            var("RYMLINKS_CLIENT_ID").ok_or(ConfigError::MissingVar("RYMLINKS_CLIENT_ID"))?;
        let mut config = Self::new(client_id);

        config.client_secret = var("RYMLINKS_CLIENT_SECRET");
        if let Some(v) = var("RYMLINKS_REDIRECT_URI") {
            config.redirect_uri = v;
        }
        if let Some(v) = var("RYMLINKS_SERVER_ADDRESS") {
            config.server_address = v;
        }
        if let Some(v) = var("RYMLINKS_SCOPE") {
            config.scope = v;
        }
        if let Some(v) = var("RYMLINKS_AUTH_URL") {
            config.auth_url = v;
        }
        if let Some(v) = var("RYMLINKS_TOKEN_URL") {
            config.token_url = v;
        }
        if let Some(v) = var("RYMLINKS_API_URL") {
            config.api_url = v;
        }
        if let Some(v) = var("RYMLINKS_OPEN_URL") {
            config.open_url = v;
        }
        config.market = var("RYMLINKS_MARKET")
            .or_else(|| var("LANG").and_then(|lang| market_from_locale(&lang)))
            .unwrap_or_else(|| DEFAULT_MARKET.to_string());

        Ok(config)
    }

    /// Returns the client secret or an error naming the missing variable.
    pub fn require_secret(&self) -> Result<&str, ConfigError> {
        self.client_secret
            .as_deref()
            .ok_or(ConfigError::MissingVar("RYMLINKS_CLIENT_SECRET"))
    }
}

/// Derives a two-letter market code from a locale such as `en_US.UTF-8` or
/// `de-AT`.
pub fn market_from_locale(locale: &str) -> Option<String> {
    let tag = locale.split(['.', '@']).next()?;
    let region = tag.split(['_', '-']).nth(1)?;
    if region.len() == 2 && region.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(region.to_ascii_uppercase())
    } else {
        None
    }
}

/// Request timeout from `RYMLINKS_HTTP_TIMEOUT` in whole seconds.
///
/// Unset, unparsable or zero values fall back to [`DEFAULT_HTTP_TIMEOUT`].
pub fn http_timeout() -> Duration {
    var("RYMLINKS_HTTP_TIMEOUT")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map_or(DEFAULT_HTTP_TIMEOUT, Duration::from_secs)
}

/// Builds the HTTP client shared by the page loader, the token endpoint and
/// the Web API calls.
///
/// # Arguments
///
/// * `timeout` - limit for each request as a whole; a stalled server then
///   surfaces as an ordinary request error instead of hanging the command
///
/// # Errors
///
/// Returns the builder's error if the TLS backend cannot be initialised.
///
/// # Example
///
/// ```rust
/// let client = rymlinks::config::http_client(rymlinks::config::http_timeout())?;
/// ```
pub fn http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

/// Returns whether `RYMLINKS_DEBUG` is set to a truthy value.
pub fn debug_enabled() -> bool {
    matches!(
        var("RYMLINKS_DEBUG").as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
