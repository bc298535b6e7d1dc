use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value, json};

use crate::{
    config::Config,
    debug,
    error::{AuthError, StorageError},
    management::KeyValueStore,
    spotify,
    types::{Credential, PkceSession, TokenResponse},
    utils, warning,
};

pub const APP_TOKEN_KEY: &str = "app_spotify_access_token";
pub const APP_EXPIRY_KEY: &str = "app_token_expiry_time";
pub const USER_TOKEN_KEY: &str = "user_spotify_access_token";
pub const USER_REFRESH_KEY: &str = "user_spotify_refresh_token";
pub const USER_EXPIRY_KEY: &str = "user_token_expiry_time";

const APP_KEYS: [&str; 2] = [APP_TOKEN_KEY, APP_EXPIRY_KEY];
const USER_KEYS: [&str; 3] = [USER_TOKEN_KEY, USER_REFRESH_KEY, USER_EXPIRY_KEY];

/// Tokens are treated as expired this long before the provider says so.
pub const EXPIRY_MARGIN_MS: i64 = 60_000;

/// The host's interactive, redirect-based authorization facility.
#[async_trait]
pub trait AuthorizationPrompt: Send + Sync {
    /// Shows `auth_url` to the user and resolves with the query parameters of
    /// the redirect back to the application.
    async fn authorize(&self, auth_url: &str) -> Result<HashMap<String, String>, AuthError>;
}

/// In-memory part of the token lifecycle, owned by one [`TokenManager`].
#[derive(Debug, Default)]
pub struct TokenState {
    app: Option<Credential>,
    pending_login: Option<PkceSession>,
}

/// Produces currently valid access tokens.
///
/// Two credentials are managed independently:
/// - the app token (client-credentials grant), cached in memory and mirrored
///   to storage under [`APP_TOKEN_KEY`]/[`APP_EXPIRY_KEY`]
/// - the user token (authorization code with PKCE), read from storage under
///   the `USER_*` keys and refreshed on demand
///
/// All methods take `&mut self`, so refreshes from a single owner never race.
pub struct TokenManager {
    config: Config,
    client: Client,
    store: Arc<dyn KeyValueStore>,
    state: TokenState,
}

impl TokenManager {
    /// Creates the manager and restores a stored, still-valid app token.
    ///
    /// # Arguments
    ///
    /// * `config` - client id, optional secret and the Spotify endpoints
    /// * `client` - HTTP client for the token endpoint and the Web API; build
    ///   it with [`crate::config::http_client`] so requests cannot hang
    /// * `store` - where credentials persist between runs
    ///
    /// A store that cannot be read is logged and treated as empty.
    ///
    /// # Example
    ///
    /// ```rust
    /// let client = config::http_client(config::http_timeout())?;
    /// let store = Arc::new(FileStore::new(FileStore::default_path()));
    /// let mut tokens = TokenManager::init(Config::from_env()?, client, store).await;
    /// let app_token = tokens.get_app_token().await;
    /// ```
    pub async fn init(config: Config, client: Client, store: Arc<dyn KeyValueStore>) -> Self {
        let mut manager = Self {
            config,
            client,
            store,
            state: TokenState::default(),
        };
        manager.load_app_token().await;
        manager
    }

    /// Drops all in-memory state, including a half-finished login.
    ///
    /// Stored credentials are left alone.
    pub fn teardown(&mut self) {
        self.state = TokenState::default();
    }

    /// The configuration the manager was created with, e.g. for the API base
    /// URL and market of track requests.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The HTTP client shared with Web API calls, so they use the same
    /// timeout and connection pool as token requests.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Whether a login is waiting for its redirect.
    pub fn has_pending_login(&self) -> bool {
        self.state.pending_login.is_some()
    }

    async fn load_app_token(&mut self) {
        let stored = match self.store.get(&APP_KEYS).await {
            Ok(stored) => stored,
            Err(e) => {
                warning!("Cannot read stored app token: {}", e);
                return;
            }
        };

        let token = stored.get(APP_TOKEN_KEY).and_then(Value::as_str);
        let expiry = stored.get(APP_EXPIRY_KEY).and_then(Value::as_i64);
        if let (Some(token), Some(expiry)) = (token, expiry) {
            let credential = Credential {
                access_token: token.to_string(),
                refresh_token: None,
                expires_at: expiry,
            };
            if credential.is_usable() {
                debug!("Loaded stored app access token");
                self.state.app = Some(credential);
                return;
            }
        }
        debug!("No valid stored app access token, will fetch when needed");
    }

    /// Returns an app token, requesting a new one when the cached one expired.
    ///
    /// Any failure is logged and reported as `None`: the caller cannot
    /// proceed with app-authenticated calls, but nothing else is affected.
    pub async fn get_app_token(&mut self) -> Option<String> {
        if let Some(credential) = self.state.app.as_ref().filter(|c| c.is_usable()) {
            debug!("Using existing valid app access token");
            return Some(credential.access_token.clone());
        }

        debug!("Requesting new app access token");
        let response =
            spotify::auth::request_client_credentials(&self.client, &self.config).await;
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warning!("Failed to obtain app access token: {}", e);
                self.state.app = None;
                return None;
            }
        };

        let credential = credential_from(response, None);
        let mut items = Map::new();
        items.insert(APP_TOKEN_KEY.to_string(), json!(credential.access_token));
        items.insert(APP_EXPIRY_KEY.to_string(), json!(credential.expires_at));
        if let Err(e) = self.store.set(items).await {
            warning!("Cannot persist app access token: {}", e);
        }

        let token = credential.access_token.clone();
        self.state.app = Some(credential);
        Some(token)
    }

    /// Runs the authorization-code flow with PKCE and stores the user token.
    ///
    /// The verifier lives only for the duration of this call; it is cleared
    /// on success and on every failure path.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Prompt`] if the user closed or never finished the prompt
    /// - [`AuthError::Denied`] if the redirect carried an `error` parameter
    /// - [`AuthError::StateMismatch`] / [`AuthError::MissingCode`] for a bad redirect
    /// - [`AuthError::Provider`] / [`AuthError::Http`] if the code exchange failed
    pub async fn initiate_user_login(
        &mut self,
        prompt: &dyn AuthorizationPrompt,
    ) -> Result<(), AuthError> {
        let code_verifier = utils::generate_code_verifier();
        let code_challenge = utils::generate_code_challenge(&code_verifier);
        self.state.pending_login = Some(PkceSession {
            code_verifier,
            state: utils::generate_state(),
        });

        let result = self.complete_login(prompt, &code_challenge).await;
        self.state.pending_login = None;
        result
    }

    async fn complete_login(
        &mut self,
        prompt: &dyn AuthorizationPrompt,
        code_challenge: &str,
    ) -> Result<(), AuthError> {
        let expected_state = self
            .state
            .pending_login
            .as_ref()
            .map(|s| s.state.clone())
            .ok_or(AuthError::MissingVerifier)?;
        let auth_url =
            spotify::auth::authorize_url(&self.config, code_challenge, &expected_state)?;

        let params = prompt.authorize(&auth_url).await?;
        if let Some(error) = params.get("error") {
            return Err(AuthError::Denied(error.clone()));
        }
        if params.get("state") != Some(&expected_state) {
            return Err(AuthError::StateMismatch);
        }
        let code = params.get("code").ok_or(AuthError::MissingCode)?;

        let session = self
            .state
            .pending_login
            .take()
            .ok_or(AuthError::MissingVerifier)?;
        let response = spotify::auth::exchange_code_pkce(
            &self.client,
            &self.config,
            code,
            &session.code_verifier,
        )
        .await?;

        let credential = credential_from(response, None);
        self.store_user_credential(&credential).await?;
        debug!("User login completed");
        Ok(())
    }

    /// Returns the user token, refreshing it when it has expired.
    ///
    /// `Ok(None)` means the user has to log in again.
    pub async fn get_user_token(&mut self) -> Result<Option<String>, AuthError> {
        let Some(credential) = self.load_user_credential().await? else {
            return Ok(None);
        };
        if credential.is_usable() {
            return Ok(Some(credential.access_token));
        }

        debug!("User access token expired, refreshing");
        self.refresh_user_token().await
    }

    /// Exchanges the stored refresh token for a new access token.
    ///
    /// A missing refresh token or a terminal provider answer clears the user
    /// tokens and yields `Ok(None)`. Other failures are returned as errors
    /// and leave storage untouched so a later attempt can succeed.
    pub async fn refresh_user_token(&mut self) -> Result<Option<String>, AuthError> {
        let refresh_token = self
            .load_user_credential()
            .await?
            .and_then(|c| c.refresh_token);
        let Some(refresh_token) = refresh_token else {
            debug!("No refresh token stored, login required");
            self.clear_user_tokens().await?;
            return Ok(None);
        };

        match spotify::auth::refresh_token(&self.client, &self.config, &refresh_token).await {
            Ok(response) => {
                let credential = credential_from(response, Some(refresh_token));
                self.store_user_credential(&credential).await?;
                Ok(Some(credential.access_token))
            }
            Err(e) if e.is_terminal_grant_error() => {
                warning!("Refresh token rejected ({}), login required", e);
                self.clear_user_tokens().await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Whether user token material is stored.
    pub async fn is_user_logged_in(&self) -> Result<bool, StorageError> {
        Ok(self.load_user_credential().await?.is_some())
    }

    /// Reads the stored user credential. A missing expiry counts as expired.
    pub async fn load_user_credential(&self) -> Result<Option<Credential>, StorageError> {
        let stored = self.store.get(&USER_KEYS).await?;
        let Some(access_token) = stored.get(USER_TOKEN_KEY).and_then(Value::as_str) else {
            return Ok(None);
        };

        Ok(Some(Credential {
            access_token: access_token.to_string(),
            refresh_token: stored
                .get(USER_REFRESH_KEY)
                .and_then(Value::as_str)
                .map(str::to_string),
            expires_at: stored
                .get(USER_EXPIRY_KEY)
                .and_then(Value::as_i64)
                .unwrap_or(0),
        }))
    }

    async fn store_user_credential(&self, credential: &Credential) -> Result<(), StorageError> {
        let mut items = Map::new();
        items.insert(USER_TOKEN_KEY.to_string(), json!(credential.access_token));
        items.insert(USER_EXPIRY_KEY.to_string(), json!(credential.expires_at));
        if let Some(refresh_token) = &credential.refresh_token {
            items.insert(USER_REFRESH_KEY.to_string(), json!(refresh_token));
        }
        self.store.set(items).await
    }

    /// Removes the user-level keys only.
    pub async fn clear_user_tokens(&mut self) -> Result<(), StorageError> {
        self.store.remove(&USER_KEYS).await
    }

    /// Removes all stored credential material and forgets the cached app token.
    pub async fn logout(&mut self) -> Result<(), StorageError> {
        self.state = TokenState::default();
        let keys: Vec<&str> = APP_KEYS.iter().chain(USER_KEYS.iter()).copied().collect();
        self.store.remove(&keys).await
    }
}

/// Turns a token response into a credential whose expiry includes the margin.
fn credential_from(response: TokenResponse, previous_refresh: Option<String>) -> Credential {
    Credential {
        access_token: response.access_token,
        refresh_token: response.refresh_token.or(previous_refresh),
        expires_at: utils::now_millis()
            .saturating_add(response.expires_in.saturating_mul(1000))
            .saturating_sub(EXPIRY_MARGIN_MS),
    }
}
