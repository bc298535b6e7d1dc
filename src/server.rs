use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{Extension, Router, routing::get};
use tokio::sync::{Mutex, oneshot};

use crate::{
    api::{self, CallbackSender},
    error::AuthError,
    info,
    management::AuthorizationPrompt,
    warning,
};

/// How long a login waits for the user to finish in the browser.
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(120);

/// Builds the callback router around the one-shot redirect channel.
pub fn router(sender: CallbackSender) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/callback", get(api::callback))
        .layer(Extension(sender))
}

/// Authorization prompt backed by the system browser and a local callback
/// server bound to the redirect URI's address.
pub struct BrowserPrompt {
    server_address: String,
    timeout: Duration,
}

impl BrowserPrompt {
    pub fn new(server_address: impl Into<String>) -> Self {
        Self {
            server_address: server_address.into(),
            timeout: DEFAULT_LOGIN_TIMEOUT,
        }
    }
}

#[async_trait]
impl AuthorizationPrompt for BrowserPrompt {
    async fn authorize(&self, auth_url: &str) -> Result<HashMap<String, String>, AuthError> {
        let listener = tokio::net::TcpListener::bind(&self.server_address)
            .await
            .map_err(|e| {
                AuthError::Prompt(format!("cannot listen on {}: {}", self.server_address, e))
            })?;

        let (tx, rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = router(Arc::new(Mutex::new(Some(tx))));
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        if webbrowser::open(auth_url).is_err() {
            warning!(
                "Failed to open browser. Please navigate to the following URL manually:\n{}",
                auth_url
            );
        }
        info!("Waiting for Spotify authorization...");

        let outcome = tokio::time::timeout(self.timeout, rx).await;
        let _ = shutdown_tx.send(());
        let _ = server.await;

        match outcome {
            Ok(Ok(params)) => Ok(params),
            Ok(Err(_)) => Err(AuthError::Prompt("callback server stopped".to_string())),
            Err(_) => Err(AuthError::Prompt(format!(
                "no redirect received within {} seconds",
                self.timeout.as_secs()
            ))),
        }
    }
}
