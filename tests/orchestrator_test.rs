mod common;

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use common::{
    FakePrompt, PromptBehavior, background, chart_item, chart_page, far_future, seed_user,
    token_manager_with_client,
};
use rymlinks::config;
use rymlinks::error::Cancelled;
use rymlinks::management::MemoryStore;
use rymlinks::messaging::Background;
use rymlinks::orchestrator::{LinkOutcome, Orchestrator};
use rymlinks::page::ChartPage;
use rymlinks::types::LinkMode;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ALBUM_CHART: &str = "https://rateyourmusic.com/charts/top/album/1997/";
const SONG_CHART: &str = "https://rateyourmusic.com/charts/top/song/1997/";

// Two album chart items, a1 and a2
fn two_album_page() -> ChartPage {
    let html = chart_page(&[
        chart_item("First", 1, r#"{"spotify":{"a1":{"type":"album","default":true}}}"#),
        chart_item("Second", 2, r#"{"spotify":{"a2":{"type":"album"}}}"#),
    ]);
    ChartPage::from_html(html, Some(ALBUM_CHART.to_string()))
}

fn tracks_body(ids: &[&str]) -> serde_json::Value {
    let items: Vec<_> = ids
        .iter()
        .map(|id| json!({"external_urls": {"spotify": format!("https://open.spotify.com/track/{id}")}}))
        .collect();
    json!({ "items": items })
}

fn track(id: &str) -> String {
    format!("https://open.spotify.com/track/{id}")
}

async fn mount_tracks(server: &MockServer, album: &str, ids: &[&str], expected: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/albums/{album}/tracks")))
        .respond_with(ResponseTemplate::new(200).set_body_json(tracks_body(ids)))
        .expect(expected)
        .mount(server)
        .await;
}

async fn logged_in_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "user-1", Some("refresh-1"), far_future()).await;
    store
}

#[tokio::test]
async fn test_all_tracks_are_collected_and_deduplicated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/albums/a1/tracks"))
        .and(query_param("market", "US"))
        .and(query_param("limit", "50"))
        .and(header("authorization", "Bearer user-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tracks_body(&["t1", "t2"])))
        .expect(1)
        .mount(&server)
        .await;
    mount_tracks(&server, "a2", &["t2", "t3"], 1).await;

    let page = two_album_page();
    let mut bg = background(&server, logged_in_store().await).await;
    let outcome = Orchestrator::new(&page, &mut bg)
        .with_delay(Duration::ZERO)
        .get_links(LinkMode::AllTracks, &CancellationToken::new())
        .await;

    assert_eq!(
        outcome,
        Ok(LinkOutcome::Links {
            links: vec![track("t1"), track("t2"), track("t3")],
            label: "track".to_string(),
        })
    );
}

#[tokio::test]
async fn test_first_track_mode_takes_one_per_album() {
    let server = MockServer::start().await;
    mount_tracks(&server, "a1", &["t1", "t2"], 1).await;
    mount_tracks(&server, "a2", &["t3", "t4"], 1).await;

    let page = two_album_page();
    let mut bg = background(&server, logged_in_store().await).await;
    let outcome = Orchestrator::new(&page, &mut bg)
        .with_delay(Duration::ZERO)
        .get_links(LinkMode::FirstTrack, &CancellationToken::new())
        .await;

    assert_eq!(
        outcome,
        Ok(LinkOutcome::Links {
            links: vec![track("t1"), track("t3")],
            label: "track".to_string(),
        })
    );
}

#[tokio::test]
async fn test_unauthorized_halts_loop_and_discards_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/albums/a1/tracks"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"status": 401, "message": "The access token expired"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_tracks(&server, "a2", &["t3"], 0).await;

    let store = logged_in_store().await;
    let page = two_album_page();
    let mut bg = background(&server, store.clone()).await;
    let outcome = Orchestrator::new(&page, &mut bg)
        .with_delay(Duration::ZERO)
        .get_links(LinkMode::AllTracks, &CancellationToken::new())
        .await;

    assert_eq!(outcome, Ok(LinkOutcome::LoginRequired));
    // The rejected user token is gone
    assert!(store.keys().await.is_empty());
}

#[tokio::test]
async fn test_unauthorized_after_success_still_discards_results() {
    let server = MockServer::start().await;
    mount_tracks(&server, "a1", &["t1"], 1).await;
    Mock::given(method("GET"))
        .and(path("/v1/albums/a2/tracks"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let page = two_album_page();
    let mut bg = background(&server, logged_in_store().await).await;
    let outcome = Orchestrator::new(&page, &mut bg)
        .with_delay(Duration::ZERO)
        .get_links(LinkMode::AllTracks, &CancellationToken::new())
        .await;

    assert_eq!(outcome, Ok(LinkOutcome::LoginRequired));
}

#[tokio::test]
async fn test_api_error_skips_album_and_continues() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/albums/a1/tracks"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"status": 404, "message": "Non existing id"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_tracks(&server, "a2", &["t3"], 1).await;

    let page = two_album_page();
    let mut bg = background(&server, logged_in_store().await).await;
    let outcome = Orchestrator::new(&page, &mut bg)
        .with_delay(Duration::ZERO)
        .get_links(LinkMode::AllTracks, &CancellationToken::new())
        .await;

    assert_eq!(
        outcome,
        Ok(LinkOutcome::Links {
            links: vec![track("t3")],
            label: "track".to_string(),
        })
    );
}

#[tokio::test]
async fn test_all_albums_failing_yields_no_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let page = two_album_page();
    let mut bg = background(&server, logged_in_store().await).await;
    let outcome = Orchestrator::new(&page, &mut bg)
        .with_delay(Duration::ZERO)
        .get_links(LinkMode::AllTracks, &CancellationToken::new())
        .await;

    assert!(matches!(outcome, Ok(LinkOutcome::NoResults(_))));
}

#[tokio::test]
async fn test_missing_login_requires_login_without_api_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tracks_body(&["t1"])))
        .expect(0)
        .mount(&server)
        .await;

    let page = two_album_page();
    let mut bg = background(&server, Arc::new(MemoryStore::new())).await;
    let outcome = Orchestrator::new(&page, &mut bg)
        .with_delay(Duration::ZERO)
        .get_links(LinkMode::AllTracks, &CancellationToken::new())
        .await;

    assert_eq!(outcome, Ok(LinkOutcome::LoginRequired));
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tracks_body(&["t1"])))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let page = two_album_page();
    let mut bg = background(&server, logged_in_store().await).await;
    let outcome = Orchestrator::new(&page, &mut bg)
        .get_links(LinkMode::AllTracks, &cancel)
        .await;

    assert_eq!(outcome, Err(Cancelled));
}

#[tokio::test]
async fn test_cancelled_during_delay() {
    let server = MockServer::start().await;
    mount_tracks(&server, "a1", &["t1"], 1).await;
    mount_tracks(&server, "a2", &["t2"], 0).await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let page = two_album_page();
    let mut bg = background(&server, logged_in_store().await).await;
    let outcome = Orchestrator::new(&page, &mut bg)
        .with_delay(Duration::from_secs(30))
        .get_links(LinkMode::AllTracks, &cancel)
        .await;

    assert_eq!(outcome, Err(Cancelled));
}

#[tokio::test]
async fn test_cancelled_while_request_in_flight() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/albums/a1/tracks"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(tracks_body(&["t1"]))
                .set_delay(Duration::from_secs(3)),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_tracks(&server, "a2", &["t2"], 0).await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let page = two_album_page();
    let mut bg = background(&server, logged_in_store().await).await;
    let started = Instant::now();
    let outcome = Orchestrator::new(&page, &mut bg)
        .with_delay(Duration::ZERO)
        .get_links(LinkMode::AllTracks, &cancel)
        .await;

    assert_eq!(outcome, Err(Cancelled));
    // The request in flight finishes, then its answer is dropped
    assert!(started.elapsed() >= Duration::from_secs(3));
}

#[tokio::test]
async fn test_slow_track_request_times_out_and_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/albums/a1/tracks"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(tracks_body(&["t1"]))
                .set_delay(Duration::from_secs(5)),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_tracks(&server, "a2", &["t2"], 1).await;

    let client = config::http_client(Duration::from_millis(200)).unwrap();
    let tokens = token_manager_with_client(&server, logged_in_store().await, client).await;
    let mut bg = Background::new(tokens, Box::new(FakePrompt::new(PromptBehavior::Approve)));
    let page = two_album_page();
    let outcome = Orchestrator::new(&page, &mut bg)
        .with_delay(Duration::ZERO)
        .get_links(LinkMode::AllTracks, &CancellationToken::new())
        .await;

    assert_eq!(
        outcome,
        Ok(LinkOutcome::Links {
            links: vec![track("t2")],
            label: "track".to_string(),
        })
    );
}

#[tokio::test]
async fn test_album_mode_returns_page_links() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tracks_body(&["t1"])))
        .expect(0)
        .mount(&server)
        .await;

    let page = two_album_page();
    let mut bg = background(&server, Arc::new(MemoryStore::new())).await;
    let outcome = Orchestrator::new(&page, &mut bg)
        .get_links(LinkMode::Album, &CancellationToken::new())
        .await;

    assert_eq!(
        outcome,
        Ok(LinkOutcome::Links {
            links: vec![
                "https://open.spotify.com/album/a1".to_string(),
                "https://open.spotify.com/album/a2".to_string(),
            ],
            label: "album".to_string(),
        })
    );
}

#[tokio::test]
async fn test_song_chart_ignores_track_mode() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tracks_body(&["x"])))
        .expect(0)
        .mount(&server)
        .await;

    let html = chart_page(&[
        chart_item("Paranoid Android", 1, r#"{"spotify":{"s1":{"type":"track"}}}"#),
        chart_item("Karma Police", 2, r#"{"spotify":{"s2":{"type":"track"}}}"#),
    ]);
    let page = ChartPage::from_html(html, Some(SONG_CHART.to_string()));
    let mut bg = background(&server, logged_in_store().await).await;
    let outcome = Orchestrator::new(&page, &mut bg)
        .get_links(LinkMode::AllTracks, &CancellationToken::new())
        .await;

    assert_eq!(
        outcome,
        Ok(LinkOutcome::Links {
            links: vec![track("s1"), track("s2")],
            label: "song".to_string(),
        })
    );
}

#[tokio::test]
async fn test_non_chart_pages_are_rejected() {
    let server = MockServer::start().await;
    let mut bg = background(&server, logged_in_store().await).await;

    let page = ChartPage::from_html(
        chart_page(&[chart_item("A", 1, r#"{"spotify":{"a1":{}}}"#)]),
        Some("https://example.com/charts/".to_string()),
    );
    let outcome = Orchestrator::new(&page, &mut bg)
        .get_links(LinkMode::Album, &CancellationToken::new())
        .await;
    assert!(matches!(outcome, Ok(LinkOutcome::Rejected(_))));

    let page = ChartPage::from_html(
        "<html></html>",
        Some("https://rateyourmusic.com/artist/radiohead".to_string()),
    );
    let outcome = Orchestrator::new(&page, &mut bg)
        .get_links(LinkMode::AllTracks, &CancellationToken::new())
        .await;
    assert!(matches!(outcome, Ok(LinkOutcome::Rejected(_))));
}

#[tokio::test]
async fn test_page_without_albums_yields_no_results() {
    let server = MockServer::start().await;
    let page = ChartPage::from_html("<html><body></body></html>", Some(ALBUM_CHART.to_string()));
    let mut bg = background(&server, logged_in_store().await).await;

    let outcome = Orchestrator::new(&page, &mut bg)
        .get_links(LinkMode::AllTracks, &CancellationToken::new())
        .await;
    assert!(matches!(outcome, Ok(LinkOutcome::NoResults(_))));

    let outcome = Orchestrator::new(&page, &mut bg)
        .get_links(LinkMode::Album, &CancellationToken::new())
        .await;
    assert!(matches!(outcome, Ok(LinkOutcome::NoResults(_))));
}
