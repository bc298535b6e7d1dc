//! Typed messages between the page context, the orchestrator and the
//! background service.
//!
//! Requests serialize with an `action` tag carrying the camelCase action
//! names used on the wire, e.g. `{"action":"getAlbumTracksFromSpotify",
//! "albumId":"..."}`. Failures travel as response variants, never as errors,
//! so a broken token or API call cannot take down the caller.

use serde::{Deserialize, Serialize};

use crate::{
    debug,
    error::ApiError,
    management::{AuthorizationPrompt, TokenManager},
    spotify,
    types::AlbumRef,
    warning,
};

/// Requests answered by [`ChartPage::handle`](crate::page::ChartPage::handle).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum PageRequest {
    #[serde(rename = "extractSpotifyAlbumIds")]
    ExtractSpotifyAlbumIds,
    #[serde(rename = "extractSpotifyLinks")]
    ExtractSpotifyLinks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageResponse {
    Albums { albums: Vec<AlbumRef> },
    Links { links: Vec<String> },
}

/// Requests answered by [`Background::handle`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum BackgroundRequest {
    #[serde(rename = "getAlbumTracksFromSpotify")]
    GetAlbumTracks {
        #[serde(rename = "albumId")]
        album_id: String,
    },
    #[serde(rename = "getAppTokenStatus")]
    GetAppTokenStatus,
    #[serde(rename = "getUserAuthStatus")]
    GetUserAuthStatus,
    #[serde(rename = "initiateUserLogin")]
    InitiateUserLogin,
    #[serde(rename = "userLogout")]
    UserLogout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BackgroundResponse {
    Tracks { tracks: Vec<String> },
    /// The user token is missing, dead, or was rejected by the API.
    NeedsLogin,
    Error { error: String },
    AppTokenStatus { has_token: bool },
    UserAuthStatus { is_logged_in: bool },
    LoginSucceeded,
    LoggedOut,
}

impl BackgroundResponse {
    fn error(message: impl Into<String>) -> Self {
        BackgroundResponse::Error {
            error: message.into(),
        }
    }
}

/// Owner of the token manager; answers background requests one at a time.
pub struct Background {
    tokens: TokenManager,
    prompt: Box<dyn AuthorizationPrompt>,
}

impl Background {
    pub fn new(tokens: TokenManager, prompt: Box<dyn AuthorizationPrompt>) -> Self {
        Self { tokens, prompt }
    }

    pub fn tokens(&mut self) -> &mut TokenManager {
        &mut self.tokens
    }

    /// Tears down the token manager's in-memory state.
    pub fn shutdown(mut self) {
        self.tokens.teardown();
    }

    /// Answers one request. Failures never escape as errors; they come back
    /// as [`BackgroundResponse::Error`] or, for a rejected or missing user
    /// token, [`BackgroundResponse::NeedsLogin`].
    pub async fn handle(&mut self, request: BackgroundRequest) -> BackgroundResponse {
        debug!("Background received {:?}", request);
        match request {
            BackgroundRequest::GetAlbumTracks { album_id } => self.album_tracks(&album_id).await,
            BackgroundRequest::GetAppTokenStatus => BackgroundResponse::AppTokenStatus {
                has_token: self.tokens.get_app_token().await.is_some(),
            },
            BackgroundRequest::GetUserAuthStatus => match self.tokens.is_user_logged_in().await {
                Ok(is_logged_in) => BackgroundResponse::UserAuthStatus { is_logged_in },
                Err(e) => BackgroundResponse::error(e.to_string()),
            },
            BackgroundRequest::InitiateUserLogin => {
                match self.tokens.initiate_user_login(self.prompt.as_ref()).await {
                    Ok(()) => BackgroundResponse::LoginSucceeded,
                    Err(e) => BackgroundResponse::error(e.to_string()),
                }
            }
            BackgroundRequest::UserLogout => match self.tokens.logout().await {
                Ok(()) => BackgroundResponse::LoggedOut,
                Err(e) => BackgroundResponse::error(e.to_string()),
            },
        }
    }

    async fn album_tracks(&mut self, album_id: &str) -> BackgroundResponse {
        if album_id.trim().is_empty() {
            return BackgroundResponse::error("Album ID missing in request.");
        }

        let token = match self.tokens.get_user_token().await {
            Ok(Some(token)) => token,
            Ok(None) => return BackgroundResponse::NeedsLogin,
            Err(e) => {
                return BackgroundResponse::error(format!("Cannot refresh Spotify session: {e}"));
            }
        };

        let result = spotify::tracks::get_album_tracks(
            self.tokens.client(),
            self.tokens.config(),
            album_id,
            &token,
        )
        .await;

        match result {
            Ok(tracks) => BackgroundResponse::Tracks { tracks },
            Err(ApiError::Unauthorized) => {
                warning!("Spotify rejected the stored session, login required");
                if let Err(e) = self.tokens.clear_user_tokens().await {
                    warning!("Cannot clear stored user token: {}", e);
                }
                BackgroundResponse::NeedsLogin
            }
            Err(e) => BackgroundResponse::error(e.to_string()),
        }
    }
}
