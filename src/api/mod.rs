//! # API Module
//!
//! HTTP endpoints of the short-lived local server that receives the OAuth
//! redirect during `rymlinks login`.
//!
//! - [`callback`] - receives the authorization redirect and forwards its
//!   query parameters to the waiting [`BrowserPrompt`](crate::server::BrowserPrompt)
//! - [`health`] - reports status and version, handy to check that the
//!   redirect URI points at the right address
//!
//! ```rust,ignore
//! use axum::{Router, routing::get};
//! use rymlinks::api::{callback, health};
//!
//! let app = Router::new()
//!     .route("/callback", get(callback))
//!     .route("/health", get(health));
//! ```

mod callback;
mod health;

pub use callback::CallbackSender;
pub use callback::callback;
pub use health::health;
