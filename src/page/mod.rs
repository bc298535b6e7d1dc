//! # Chart page extraction
//!
//! Chart items on rateyourmusic.com carry a media-link container:
//!
//! ```html
//! <div class="page_charts_section_charts_item">
//!   <div class="page_charts_section_charts_item_title">
//!     <a class="release"><span class="ui_name_locale_original">OK Computer</span></a>
//!   </div>
//!   <div id="media_link_button_container_charts_12345"
//!        data-links='{"spotify":{"6dVIqQ8qmQ5GBnJ9shOYGE":{"type":"album","default":true}}}'>
//!   </div>
//! </div>
//! ```
//!
//! [`ChartPage`] finds those containers, picks one Spotify entry per item and
//! turns it into an album id or an `open.spotify.com` link. Problems with a
//! single item are logged and skipped; they never fail the whole page.

pub mod html;

use std::path::PathBuf;

use reqwest::{Client, header::USER_AGENT};

use crate::{
    config::DEFAULT_OPEN_URL,
    debug,
    error::{ExtractionError, PageError},
    messaging::{PageRequest, PageResponse},
    types::{AlbumRef, ChartEntry, ChartType, DataLinks, SpotifyEntry},
    utils, warning,
};
use html::Document;

pub const CONTAINER_ID_PREFIX: &str = "media_link_button_container_charts_";
pub const DATA_LINKS_ATTR: &str = "data-links";
pub const CHART_ITEM_CLASS: &str = "page_charts_section_charts_item";
pub const CHART_ITEM_TITLE_CLASS: &str = "page_charts_section_charts_item_title";
pub const RELEASE_CLASS: &str = "release";
pub const TITLE_NAME_CLASS: &str = "ui_name_locale_original";
pub const UNKNOWN_TITLE: &str = "Unknown Album";

/// Where a chart page comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSource {
    Remote(String),
    Local(PathBuf),
}

impl PageSource {
    /// `http(s)://` arguments are URLs, everything else is a file path.
    pub fn parse(arg: &str) -> Self {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            PageSource::Remote(arg.to_string())
        } else {
            PageSource::Local(PathBuf::from(arg))
        }
    }
}

/// One media-link container with its parsed Spotify entries.
#[derive(Debug, Clone)]
struct MediaContainer {
    entries: Vec<SpotifyEntry>,
    title: String,
}

/// A loaded chart page, the "active tab" of the pipeline.
#[derive(Debug, Clone)]
pub struct ChartPage {
    url: Option<String>,
    document: Document,
    open_url: String,
}

impl ChartPage {
    /// Wraps already fetched markup; `url` drives chart type detection.
    pub fn from_html(html: impl Into<String>, url: Option<String>) -> Self {
        Self {
            url,
            document: Document::parse(html),
            open_url: DEFAULT_OPEN_URL.to_string(),
        }
    }

    /// Overrides the base of generated links (`https://open.spotify.com`).
    pub fn with_open_url(mut self, open_url: impl Into<String>) -> Self {
        self.open_url = open_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Fetches or reads the page.
    ///
    /// # Arguments
    ///
    /// * `client` - used for remote sources only; its timeout bounds the fetch
    /// * `source` - a chart URL or a saved HTML file, see [`PageSource::parse`]
    /// * `page_url` - overrides the URL used for chart type detection; for
    ///   remote sources it defaults to the fetched URL
    ///
    /// # Errors
    ///
    /// - [`PageError::Http`] if the request fails, times out or returns a
    ///   non-2xx status
    /// - [`PageError::Io`] if a local file cannot be read
    ///
    /// # Example
    ///
    /// ```rust
    /// let source = PageSource::parse("saved-chart.html");
    /// let page = ChartPage::load(&client, &source, Some(chart_url)).await?;
    /// ```
    pub async fn load(
        client: &Client,
        source: &PageSource,
        page_url: Option<String>,
    ) -> Result<Self, PageError> {
        match source {
            PageSource::Remote(url) => {
                debug!("Fetching chart page {}", url);
                let html = client
                    .get(url)
                    .header(
                        USER_AGENT,
                        concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
                    )
                    .send()
                    .await?
                    .error_for_status()?
                    .text()
                    .await?;
                Ok(Self::from_html(html, page_url.or_else(|| Some(url.clone()))))
            }
            PageSource::Local(path) => {
                debug!("Reading chart page {}", path.display());
                let html = async_fs::read_to_string(path).await?;
                Ok(Self::from_html(html, page_url))
            }
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Chart type from the page URL. Saved pages without one count as album
    /// charts.
    pub fn chart_type(&self) -> ChartType {
        self.url
            .as_deref()
            .map_or(ChartType::Album, ChartType::from_url)
    }

    /// Answers a request sent to the page context.
    pub fn handle(&self, request: PageRequest) -> PageResponse {
        debug!("Page received {:?}", request);
        match request {
            PageRequest::ExtractSpotifyAlbumIds => PageResponse::Albums {
                albums: self.extract_album_identifiers(),
            },
            PageRequest::ExtractSpotifyLinks => PageResponse::Links {
                links: self.extract_resolvable_links(),
            },
        }
    }

    /// One album id per chart item, deduplicated by id.
    ///
    /// Picks the entry flagged `default`, else the first album (or untyped)
    /// entry. Items with neither contribute nothing. For repeated ids the
    /// first title wins.
    pub fn extract_album_identifiers(&self) -> Vec<AlbumRef> {
        let mut albums: Vec<AlbumRef> = Vec::new();
        for container in self.containers() {
            let Some(entry) = select_album_entry(&container.entries) else {
                continue;
            };
            if albums.iter().any(|a| a.id == entry.id) {
                continue;
            }
            debug!("Found Spotify album {} for \"{}\"", entry.id, container.title);
            albums.push(AlbumRef {
                id: entry.id.clone(),
                title: container.title,
            });
        }
        albums
    }

    /// One selected entry per chart item, in page order.
    pub fn chart_entries(&self) -> Vec<ChartEntry> {
        self.containers()
            .into_iter()
            .filter_map(|container| {
                select_link_entry(&container.entries).map(|entry| ChartEntry {
                    spotify_id: entry.id.clone(),
                    display_title: container.title.clone(),
                    kind: entry.kind(),
                })
            })
            .collect()
    }

    /// `open.spotify.com/<kind>/<id>` links, one per chart item, in order of
    /// first appearance.
    pub fn extract_resolvable_links(&self) -> Vec<String> {
        let mut links: Vec<String> = self
            .chart_entries()
            .iter()
            .map(|entry| {
                format!(
                    "{}/{}/{}",
                    self.open_url,
                    entry.kind.as_str(),
                    entry.spotify_id
                )
            })
            .collect();
        utils::dedup_preserving_order(&mut links);
        links
    }

    fn containers(&self) -> Vec<MediaContainer> {
        let doc = &self.document;
        let found = doc.find_all(|el| {
            el.name == "div"
                && el
                    .attr("id")
                    .is_some_and(|id| id.starts_with(CONTAINER_ID_PREFIX))
        });
        debug!("Found {} media link containers", found.len());

        found
            .into_iter()
            .filter_map(|index| {
                let el = doc.element(index);
                let container_id = el.attr("id").unwrap_or_default();
                let raw = el.attr(DATA_LINKS_ATTR).filter(|raw| !raw.trim().is_empty())?;
                match parse_spotify_entries(container_id, raw) {
                    Ok(entries) if entries.is_empty() => None,
                    Ok(entries) => Some(MediaContainer {
                        entries,
                        title: self.title_for(index),
                    }),
                    Err(e) => {
                        warning!("Skipping chart item: {}", e);
                        None
                    }
                }
            })
            .collect()
    }

    /// Title of the chart item enclosing a container, or [`UNKNOWN_TITLE`].
    fn title_for(&self, container: usize) -> String {
        let doc = &self.document;
        doc.closest(container, |el| el.has_class(CHART_ITEM_CLASS))
            .and_then(|item| doc.find_descendant(item, |el| el.has_class(CHART_ITEM_TITLE_CLASS)))
            .and_then(|title| doc.find_descendant(title, |el| el.has_class(RELEASE_CLASS)))
            .and_then(|release| doc.find_descendant(release, |el| el.has_class(TITLE_NAME_CLASS)))
            .map(|name| doc.text(name))
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
    }
}

/// Parses the Spotify part of a `data-links` attribute, keeping key order.
pub fn parse_spotify_entries(
    container_id: &str,
    raw: &str,
) -> Result<Vec<SpotifyEntry>, ExtractionError> {
    let links: DataLinks =
        serde_json::from_str(raw).map_err(|source| ExtractionError::MalformedLinks {
            container: container_id.to_string(),
            source,
        })?;

    Ok(links
        .spotify
        .map(|spotify| {
            spotify
                .iter()
                .map(|(id, value)| SpotifyEntry::from_json(id, value))
                .collect()
        })
        .unwrap_or_default())
}

/// The entry flagged `default`, else the first album or untyped entry.
pub fn select_album_entry(entries: &[SpotifyEntry]) -> Option<&SpotifyEntry> {
    entries
        .iter()
        .find(|e| e.is_default)
        .or_else(|| entries.iter().find(|e| e.is_album()))
}

/// Like [`select_album_entry`], falling back to the first entry so song
/// charts, whose entries are all tracks, still resolve.
pub fn select_link_entry(entries: &[SpotifyEntry]) -> Option<&SpotifyEntry> {
    select_album_entry(entries).or_else(|| entries.first())
}
