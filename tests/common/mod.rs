#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use reqwest::{Client, Url};
use rymlinks::{
    config::Config,
    error::AuthError,
    management::{
        AuthorizationPrompt, KeyValueStore, MemoryStore, TokenManager, USER_EXPIRY_KEY,
        USER_REFRESH_KEY, USER_TOKEN_KEY,
    },
    messaging::Background,
};
use serde_json::{Map, json};
use wiremock::MockServer;

// Helper function to create one chart item with a title and a data-links attribute
pub fn chart_item(title: &str, container_id: u32, data_links: &str) -> String {
    format!(
        r#"<div class="page_charts_section_charts_item object_release">
  <div class="page_charts_section_charts_item_info">
    <div class="page_charts_section_charts_item_title">
      <a class="page_charts_section_charts_item_link release" href="/release/album/x/">
        <span class="ui_name_locale_original">{title}</span>
      </a>
    </div>
  </div>
  <div class="page_charts_section_charts_item_media_links">
    <div id="media_link_button_container_charts_{container_id}" data-links='{data_links}'></div>
  </div>
</div>"#
    )
}

// Helper function to wrap chart items in a page
pub fn chart_page(items: &[String]) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>Top albums</title></head><body><div id=\"page_charts_section_charts\">{}</div></body></html>",
        items.join("\n")
    )
}

// Configuration pointing every Spotify endpoint at the mock server
pub fn test_config(server: &MockServer) -> Config {
    let mut config = Config::new("test-client");
    config.client_secret = Some("test-secret".to_string());
    config.token_url = format!("{}/api/token", server.uri());
    config.auth_url = format!("{}/authorize", server.uri());
    config.api_url = format!("{}/v1", server.uri());
    config.market = "US".to_string();
    config
}

pub async fn token_manager(server: &MockServer, store: Arc<MemoryStore>) -> TokenManager {
    token_manager_with_client(server, store, Client::new()).await
}

pub async fn token_manager_with_client(
    server: &MockServer,
    store: Arc<MemoryStore>,
    client: Client,
) -> TokenManager {
    TokenManager::init(test_config(server), client, store).await
}

pub async fn background(server: &MockServer, store: Arc<MemoryStore>) -> Background {
    Background::new(
        token_manager(server, store).await,
        Box::new(FakePrompt::new(PromptBehavior::Approve)),
    )
}

pub fn far_future() -> i64 {
    chrono::Utc::now().timestamp_millis() + 3_600_000
}

// Stores a user credential as a previous login would have
pub async fn seed_user(store: &MemoryStore, access: &str, refresh: Option<&str>, expires_at: i64) {
    let mut items = Map::new();
    items.insert(USER_TOKEN_KEY.to_string(), json!(access));
    items.insert(USER_EXPIRY_KEY.to_string(), json!(expires_at));
    if let Some(refresh) = refresh {
        items.insert(USER_REFRESH_KEY.to_string(), json!(refresh));
    }
    store.set(items).await.unwrap();
}

/// How the fake prompt answers an authorization request.
#[derive(Debug, Clone, Copy)]
pub enum PromptBehavior {
    /// Redirect with a code and the state from the URL.
    Approve,
    /// Redirect with `error=access_denied`.
    Deny,
    /// Redirect with a code but a different state.
    WrongState,
    /// The user closed the window.
    Close,
}

pub struct FakePrompt {
    behavior: PromptBehavior,
    seen: Mutex<Vec<String>>,
}

impl FakePrompt {
    pub fn new(behavior: PromptBehavior) -> Self {
        Self {
            behavior,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Authorization URLs the prompt was shown.
    pub fn seen_urls(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthorizationPrompt for FakePrompt {
    async fn authorize(&self, auth_url: &str) -> Result<HashMap<String, String>, AuthError> {
        self.seen.lock().unwrap().push(auth_url.to_string());

        let url = Url::parse(auth_url).unwrap();
        let state = url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();

        let mut params = HashMap::new();
        match self.behavior {
            PromptBehavior::Approve => {
                params.insert("code".to_string(), "auth-code".to_string());
                params.insert("state".to_string(), state);
            }
            PromptBehavior::Deny => {
                params.insert("error".to_string(), "access_denied".to_string());
                params.insert("state".to_string(), state);
            }
            PromptBehavior::WrongState => {
                params.insert("code".to_string(), "auth-code".to_string());
                params.insert("state".to_string(), "forged".to_string());
            }
            PromptBehavior::Close => {
                return Err(AuthError::Prompt("window closed".to_string()));
            }
        }
        Ok(params)
    }
}
