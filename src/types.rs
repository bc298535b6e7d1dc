use chrono::Utc;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tabled::Tabled;

/// An access token plus its optional refresh token and absolute expiry.
///
/// `expires_at` is in Unix milliseconds and already includes the safety
/// margin, so a credential is usable exactly while `now < expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: i64,
}

impl Credential {
    pub fn is_usable_at(&self, now_millis: i64) -> bool {
        now_millis < self.expires_at
    }

    pub fn is_usable(&self) -> bool {
        self.is_usable_at(Utc::now().timestamp_millis())
    }
}

/// Successful body of the accounts service token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}

/// Error body of the accounts service token endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenErrorResponse {
    #[serde(default)]
    pub error: String,
    pub error_description: Option<String>,
}

/// One-time material of a login in progress.
#[derive(Debug, Clone)]
pub struct PkceSession {
    pub code_verifier: String,
    pub state: String,
}

/// Kind of object a Spotify link points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Album,
    Track,
    Playlist,
}

impl LinkKind {
    /// Normalizes the `type` declared in a `data-links` entry.
    ///
    /// Unknown or missing types are treated as albums.
    pub fn from_declared(declared: Option<&str>) -> Self {
        match declared.map(str::to_ascii_lowercase).as_deref() {
            Some("track") | Some("tracks") => LinkKind::Track,
            Some("playlist") | Some("playlists") => LinkKind::Playlist,
            _ => LinkKind::Album,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Album => "album",
            LinkKind::Track => "track",
            LinkKind::Playlist => "playlist",
        }
    }
}

/// The `data-links` JSON attribute of a chart item's media container.
///
/// Only the `spotify` provider is read. Its keys are Spotify ids and keep
/// document order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataLinks {
    #[serde(default)]
    pub spotify: Option<Map<String, Value>>,
}

/// A single value of the `spotify` object in `data-links`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyEntry {
    pub id: String,
    pub declared_type: Option<String>,
    pub is_default: bool,
}

impl SpotifyEntry {
    /// Reads an entry leniently: non-string types and non-boolean default
    /// flags are ignored rather than rejected.
    pub fn from_json(id: &str, value: &Value) -> Self {
        let declared_type = value
            .get("type")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        let is_default = value.get("default").and_then(Value::as_bool) == Some(true);
        Self {
            id: id.to_string(),
            declared_type,
            is_default,
        }
    }

    /// Untyped entries count as albums.
    pub fn is_album(&self) -> bool {
        match &self.declared_type {
            None => true,
            Some(t) => t.eq_ignore_ascii_case("album"),
        }
    }

    pub fn kind(&self) -> LinkKind {
        LinkKind::from_declared(self.declared_type.as_deref())
    }
}

/// One selected Spotify entry of a chart item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartEntry {
    pub spotify_id: String,
    pub display_title: String,
    pub kind: LinkKind,
}

/// An album id with the title shown on the chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRef {
    pub id: String,
    pub title: String,
}

#[derive(Tabled)]
pub struct AlbumTableRow {
    #[tabled(rename = "#")]
    pub position: usize,
    pub title: String,
    pub spotify_id: String,
}

/// Body of `GET /albums/{id}/tracks`.
#[derive(Debug, Clone, Deserialize)]
pub struct AlbumTracksResponse {
    #[serde(default)]
    pub items: Vec<TrackItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackItem {
    #[serde(default)]
    pub external_urls: Option<ExternalUrls>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

/// Error body of the Web API: `{"error": {"status": 404, "message": "..."}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub message: Option<String>,
}

/// What kind of page the chart source is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartType {
    Album,
    Song,
    UnknownRym,
    NotRym,
}

impl ChartType {
    pub fn from_url(url: &str) -> Self {
        if url.contains("rateyourmusic.com/charts/") {
            if url.contains("/song/") {
                ChartType::Song
            } else {
                ChartType::Album
            }
        } else if url.contains("rateyourmusic.com/") {
            ChartType::UnknownRym
        } else {
            ChartType::NotRym
        }
    }

    /// Noun used in status messages.
    pub fn label(&self) -> &'static str {
        match self {
            ChartType::Song => "song",
            _ => "album",
        }
    }
}

/// Requested output granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LinkMode {
    /// One link per chart item
    Album,
    /// Every track of every album
    AllTracks,
    /// The first track of every album
    FirstTrack,
}

impl LinkMode {
    pub fn needs_tracks(&self) -> bool {
        matches!(self, LinkMode::AllTracks | LinkMode::FirstTrack)
    }
}
