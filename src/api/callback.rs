use std::{collections::HashMap, sync::Arc};

use axum::{Extension, extract::Query, response::Html};
use tokio::sync::{Mutex, oneshot};

/// Hands the redirect parameters of one login to the waiting prompt.
pub type CallbackSender = Arc<Mutex<Option<oneshot::Sender<HashMap<String, String>>>>>;

/// OAuth redirect target.
///
/// Forwards the query parameters unchanged; validating `state` and
/// exchanging `code` is the token manager's job. Only the first redirect is
/// forwarded, later hits just get the page.
pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    Extension(sender): Extension<CallbackSender>,
) -> Html<&'static str> {
    let page = if params.contains_key("error") {
        Html("<h4>Login failed.</h4><p>You can close this window.</p>")
    } else if params.contains_key("code") {
        Html("<h2>Authentication successful.</h2><p>Close this browser window.</p>")
    } else {
        Html("<h4>Missing authorization code.</h4>")
    };

    if let Some(tx) = sender.lock().await.take() {
        let _ = tx.send(params);
    }
    page
}
