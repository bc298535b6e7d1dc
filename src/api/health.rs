use axum::{Extension, response::Json};
use serde_json::{Value, json};

use super::CallbackSender;

pub async fn health(Extension(sender): Extension<CallbackSender>) -> Json<Value> {
    let awaiting_redirect = sender.lock().await.is_some();
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "awaiting_redirect": awaiting_redirect,
    }))
}
