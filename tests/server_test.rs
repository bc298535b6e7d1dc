use std::sync::Arc;

use rymlinks::server::router;
use tokio::sync::{Mutex, oneshot};

#[tokio::test]
async fn test_callback_forwards_redirect_once() {
    let (tx, rx) = oneshot::channel();
    let app = router(Arc::new(Mutex::new(Some(tx))));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let health: serde_json::Value = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["awaiting_redirect"], true);

    let page = client
        .get(format!("http://{addr}/callback?code=abc&state=xyz"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("successful"));

    let params = rx.await.unwrap();
    assert_eq!(params.get("code").map(String::as_str), Some("abc"));
    assert_eq!(params.get("state").map(String::as_str), Some("xyz"));

    // The channel is used up, later redirects only get the page
    let status = client
        .get(format!("http://{addr}/callback?error=access_denied"))
        .send()
        .await
        .unwrap()
        .status();
    assert!(status.is_success());

    let health: serde_json::Value = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["awaiting_redirect"], false);
}
