//! # Spotify Integration Module
//!
//! Thin wrappers around the two Spotify services rymlinks talks to:
//!
//! - [`auth`] - the accounts service token endpoint (client credentials,
//!   PKCE code exchange, refresh) and the authorization URL
//! - [`tracks`] - the Web API album tracks listing
//!
//! Functions here are stateless: they take a shared `reqwest::Client` and the
//! [`Config`](crate::config::Config) holding the endpoints, perform exactly
//! one request and map the outcome into [`AuthError`](crate::error::AuthError)
//! or [`ApiError`](crate::error::ApiError). Caching, persistence and retries
//! belong to [`TokenManager`](crate::management::TokenManager) and the
//! orchestrator.

pub mod auth;
pub mod tracks;
