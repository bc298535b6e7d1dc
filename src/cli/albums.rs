use tabled::Table;

use crate::{
    info,
    messaging::{PageRequest, PageResponse},
    types::AlbumTableRow,
    warning,
};

use super::{http_client, load_page};

/// Lists the albums found on a chart page with their Spotify ids.
///
/// Works without Spotify credentials; nothing beyond the page is fetched.
pub async fn albums(source: String, page_url: Option<String>) {
    let page = load_page(&http_client(), &source, page_url).await;

    let albums = match page.handle(PageRequest::ExtractSpotifyAlbumIds) {
        PageResponse::Albums { albums } => albums,
        other => {
            warning!("Unexpected page response: {:?}", other);
            Vec::new()
        }
    };
    if albums.is_empty() {
        warning!("No Spotify album IDs found on this page");
        return;
    }

    let rows: Vec<AlbumTableRow> = albums
        .into_iter()
        .enumerate()
        .map(|(i, album)| AlbumTableRow {
            position: i + 1,
            title: album.title,
            spotify_id: album.id,
        })
        .collect();

    info!("Found {} albums on {:?} chart", rows.len(), page.chart_type());
    println!("{}", Table::new(rows));
}
