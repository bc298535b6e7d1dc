use reqwest::{Client, StatusCode};

use crate::{
    config::Config,
    debug,
    error::ApiError,
    types::{AlbumTracksResponse, ApiErrorResponse},
};

/// Maximum page size of the album tracks endpoint.
pub const TRACKS_PAGE_LIMIT: u32 = 50;

/// Fetches the shareable track URLs of an album.
///
/// Calls `GET {api}/albums/{id}/tracks?market={market}&limit=50` with bearer
/// auth and returns `external_urls.spotify` of every item, skipping items
/// without one. Only the first page is read, which covers all but the
/// longest box sets.
///
/// # Errors
///
/// - [`ApiError::Unauthorized`] on 401; the token must be discarded
/// - [`ApiError::Status`] on any other non-2xx status, with the API's message
/// - [`ApiError::Http`] on network failures or an undecodable body
pub async fn get_album_tracks(
    client: &Client,
    config: &Config,
    album_id: &str,
    token: &str,
) -> Result<Vec<String>, ApiError> {
    let api_url = format!(
        "{uri}/albums/{id}/tracks",
        uri = config.api_url.trim_end_matches('/'),
        id = album_id,
    );

    let limit = TRACKS_PAGE_LIMIT.to_string();

    debug!("Fetching tracks for album {}", album_id);
    let response = client
        .get(&api_url)
        .query(&[
            ("market", config.market.as_str()),
            ("limit", limit.as_str()),
        ])
        .bearer_auth(token)
        .send()
        .await?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized);
    }
    if !status.is_success() {
        let message = response
            .json::<ApiErrorResponse>()
            .await
            .ok()
            .and_then(|body| body.error.message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });
        return Err(ApiError::Status {
            status: status.as_u16(),
            message,
        });
    }

    let body = response.json::<AlbumTracksResponse>().await?;
    let urls: Vec<String> = body
        .items
        .into_iter()
        .filter_map(|track| track.external_urls.and_then(|u| u.spotify))
        .collect();

    debug!("Found {} tracks for album {}", urls.len(), album_id);
    Ok(urls)
}
