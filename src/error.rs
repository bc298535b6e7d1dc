//! Error types.
//!
//! Each layer owns one enum: [`AuthError`] for the token endpoint and login
//! flow, [`ApiError`] for the track listing, [`ExtractionError`] for chart
//! markup and [`Cancelled`] for cooperative aborts. None of them crosses the
//! page/background message boundary; they are turned into response variants
//! there.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    MissingVar(&'static str),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse .env file: {0}")]
    Dotenv(#[from] dotenv::Error),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage file is corrupt: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Failures while acquiring, exchanging or refreshing a token.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
    /// The token endpoint answered with a non-2xx status.
    #[error("token endpoint returned {status}: {error}")]
    Provider {
        status: u16,
        error: String,
        description: Option<String>,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The interactive prompt was closed, timed out or could not be shown.
    #[error("authorization prompt failed: {0}")]
    Prompt(String),
    /// The provider redirected back with an `error` parameter.
    #[error("authorization denied: {0}")]
    Denied(String),
    #[error("authorization redirect carried no code")]
    MissingCode,
    #[error("authorization redirect state does not match")]
    StateMismatch,
    #[error("no login in progress")]
    MissingVerifier,
    #[error("invalid authorization url: {0}")]
    InvalidUrl(String),
}

impl AuthError {
    /// Returns true for provider errors that retrying cannot fix.
    ///
    /// A refresh that fails this way means the stored refresh token is dead.
    pub fn is_terminal_grant_error(&self) -> bool {
        match self {
            AuthError::Provider { error, .. } => {
                error == "invalid_grant" || error == "invalid_request"
            }
            _ => false,
        }
    }
}

/// Failures from the Spotify Web API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 401: the bearer token is no longer accepted.
    #[error("access token rejected")]
    Unauthorized,
    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Problems with a single chart item. Always absorbed by the extractor.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("malformed data-links on {container}: {source}")]
    MalformedLinks {
        container: String,
        source: serde_json::Error,
    },
}

/// Failures while loading a chart page.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("cannot fetch page: {0}")]
    Http(#[from] reqwest::Error),
    #[error("cannot read page: {0}")]
    Io(#[from] std::io::Error),
}

/// A cooperative cancellation was observed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("operation cancelled")]
pub struct Cancelled;
