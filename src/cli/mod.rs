//! # CLI Module
//!
//! Command implementations behind the `rymlinks` binary. Each command builds
//! what it needs from the environment, runs one request against the library
//! and renders the result.
//!
//! Status lines go to stderr through the crate's colored macros; the links
//! themselves are printed to stdout, one per line, so they can be piped.
//!
//! ## Commands
//!
//! - [`login`] / [`logout`] / [`status`] - Spotify session handling
//! - [`links`] - Spotify links for a chart page
//! - [`albums`] - table of the albums found on a chart page
//!
//! ## Usage
//!
//! ```bash
//! rymlinks login
//! rymlinks links https://rateyourmusic.com/charts/top/album/2024/
//! rymlinks links saved-chart.html --page-url https://rateyourmusic.com/charts/top/album/1997/ --mode first-track
//! rymlinks albums saved-chart.html
//! ```

mod albums;
mod auth;
mod links;

use std::sync::Arc;

use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::{
    Res,
    config::{self, Config},
    error,
    management::{FileStore, KeyValueStore, TokenManager},
    messaging::Background,
    page::{ChartPage, PageSource},
    server::BrowserPrompt,
    warning,
};

pub use albums::albums;
pub use auth::{login, logout, status};
pub use links::links;

/// HTTP client with the configured request timeout.
fn http_client() -> Client {
    match config::http_client(config::http_timeout()) {
        Ok(client) => client,
        Err(e) => error!("Cannot build HTTP client. Err: {}", e),
    }
}

/// Wires the background service to the environment: configuration from
/// `RYMLINKS_*`, the token file in the data directory and the browser
/// based login prompt.
async fn open_background(client: Client) -> Background {
    match try_open_background(client).await {
        Ok(background) => background,
        Err(e) => error!("Cannot set up Spotify access. Err: {}", e),
    }
}

async fn try_open_background(client: Client) -> Res<Background> {
    let config = Config::from_env()?;
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(FileStore::default_path()));
    let prompt = BrowserPrompt::new(config.server_address.clone());
    let tokens = TokenManager::init(config, client, store).await;
    Ok(Background::new(tokens, Box::new(prompt)))
}

async fn load_page(client: &Client, source: &str, page_url: Option<String>) -> ChartPage {
    match ChartPage::load(client, &PageSource::parse(source), page_url).await {
        Ok(page) => page,
        Err(e) => error!("Cannot load chart page {}. Err: {}", source, e),
    }
}

/// A token cancelled by the first Ctrl-C. A second Ctrl-C exits right away
/// with status 130.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warning!("Cancelling, press Ctrl-C again to quit immediately");
        watcher.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
    cancel
}
