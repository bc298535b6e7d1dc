//! End-to-end pipeline from a chart page to a list of Spotify links.
//!
//! Everything runs sequentially in the caller's task. Cancellation is
//! cooperative: the [`CancellationToken`] is checked before extraction,
//! before every album and after every background request, and it interrupts
//! the delay between albums. A request already in flight is not aborted; its
//! answer is dropped.

use std::time::Duration;

use indicatif::ProgressBar;
use tokio_util::sync::CancellationToken;

use crate::{
    debug,
    error::Cancelled,
    messaging::{Background, BackgroundRequest, BackgroundResponse, PageRequest, PageResponse},
    page::ChartPage,
    types::{AlbumRef, ChartType, LinkMode},
    utils, warning,
};

/// Pause between two album lookups.
pub const TRACK_FETCH_DELAY: Duration = Duration::from_millis(150);

/// Result of one "get links" run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Deduplicated links in first-seen order; `label` names what they
    /// point to (`album`, `song` or `track`).
    Links { links: Vec<String>, label: String },
    NoResults(String),
    /// The user token is missing or was rejected; nothing gathered so far is
    /// kept.
    LoginRequired,
    /// The page is not a chart page.
    Rejected(String),
}

/// Drives one "get links" run for a loaded chart page, answering track
/// requests through the background service.
pub struct Orchestrator<'a> {
    page: &'a ChartPage,
    background: &'a mut Background,
    delay: Duration,
    progress: ProgressBar,
}

impl<'a> Orchestrator<'a> {
    /// Creates an orchestrator with the default [`TRACK_FETCH_DELAY`] and a
    /// hidden progress bar.
    ///
    /// # Arguments
    ///
    /// * `page` - the chart page links are extracted from
    /// * `background` - answers track lookups; it is borrowed mutably for the
    ///   whole run because token refreshes update its state
    ///
    /// # Example
    ///
    /// ```rust
    /// let outcome = Orchestrator::new(&page, &mut background)
    ///     .with_progress(spinner)
    ///     .get_links(LinkMode::AllTracks, &cancel)
    ///     .await?;
    /// ```
    pub fn new(page: &'a ChartPage, background: &'a mut Background) -> Self {
        Self {
            page,
            background,
            delay: TRACK_FETCH_DELAY,
            progress: ProgressBar::hidden(),
        }
    }

    /// Replaces the pause between two album lookups. No pause follows the
    /// last album, and a cancelled run stops waiting at once.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Reports per-album progress on `progress` instead of a hidden bar.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Runs the pipeline for `mode`.
    ///
    /// Song charts always produce general links, whatever `mode` asks for.
    ///
    /// # Arguments
    ///
    /// * `mode` - album/song links straight from the page, or track links
    ///   fetched album by album
    /// * `cancel` - aborts the run; a track request in flight finishes first
    ///   and its answer is dropped
    ///
    /// # Outcomes
    ///
    /// - [`LinkOutcome::Links`] with the deduplicated links
    /// - [`LinkOutcome::NoResults`] if nothing could be gathered
    /// - [`LinkOutcome::LoginRequired`] if the user token is missing or rejected
    /// - [`LinkOutcome::Rejected`] for pages that are not charts
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] when `cancel` fires; links gathered up to that
    /// point are discarded.
    pub async fn get_links(
        &mut self,
        mode: LinkMode,
        cancel: &CancellationToken,
    ) -> Result<LinkOutcome, Cancelled> {
        let chart_type = self.page.chart_type();
        match chart_type {
            ChartType::NotRym => {
                return Ok(LinkOutcome::Rejected(
                    "Cannot get links: Not on a valid RYM chart page.".to_string(),
                ));
            }
            ChartType::UnknownRym => {
                return Ok(LinkOutcome::Rejected(
                    "This RYM page is not a chart. Navigate to a chart page.".to_string(),
                ));
            }
            ChartType::Album | ChartType::Song => {}
        }

        let mode = if chart_type == ChartType::Song {
            LinkMode::Album
        } else {
            mode
        };
        debug!("Getting links for {:?} chart in {:?} mode", chart_type, mode);

        let outcome = if mode.needs_tracks() {
            self.track_links(mode, cancel).await
        } else {
            self.general_links(chart_type, cancel)
        };
        self.progress.finish_and_clear();
        outcome
    }

    fn general_links(
        &mut self,
        chart_type: ChartType,
        cancel: &CancellationToken,
    ) -> Result<LinkOutcome, Cancelled> {
        check(cancel)?;
        let response = self.page.handle(PageRequest::ExtractSpotifyLinks);
        check(cancel)?;

        let label = chart_type.label();
        match response {
            PageResponse::Links { links } if links.is_empty() => Ok(LinkOutcome::NoResults(
                format!("No Spotify {label} links found on this page."),
            )),
            PageResponse::Links { links } => Ok(LinkOutcome::Links {
                links,
                label: label.to_string(),
            }),
            other => {
                warning!("Unexpected page response: {:?}", other);
                Ok(LinkOutcome::NoResults(format!(
                    "Could not extract {label} links from page."
                )))
            }
        }
    }

    async fn track_links(
        &mut self,
        mode: LinkMode,
        cancel: &CancellationToken,
    ) -> Result<LinkOutcome, Cancelled> {
        check(cancel)?;
        let response = self.page.handle(PageRequest::ExtractSpotifyAlbumIds);
        check(cancel)?;

        let albums: Vec<AlbumRef> = match response {
            PageResponse::Albums { albums } => albums,
            other => {
                warning!("Unexpected page response: {:?}", other);
                Vec::new()
            }
        };
        if albums.is_empty() {
            return Ok(LinkOutcome::NoResults(
                "No Spotify album IDs found on this page to fetch tracks for.".to_string(),
            ));
        }

        let total = albums.len();
        self.progress.set_length(total as u64);
        let mut collected: Vec<String> = Vec::new();

        for (i, album) in albums.iter().enumerate() {
            check(cancel)?;
            self.progress.set_message(format!(
                "Fetching tracks for \"{}\" ({}/{})",
                album.title,
                i + 1,
                total
            ));

            let response = self
                .background
                .handle(BackgroundRequest::GetAlbumTracks {
                    album_id: album.id.clone(),
                })
                .await;
            check(cancel)?;

            match response {
                BackgroundResponse::NeedsLogin => {
                    debug!("Login required, dropping {} collected links", collected.len());
                    return Ok(LinkOutcome::LoginRequired);
                }
                BackgroundResponse::Tracks { tracks } if tracks.is_empty() => {
                    warning!("No tracks for album {} (\"{}\")", album.id, album.title);
                }
                BackgroundResponse::Tracks { tracks } => match mode {
                    LinkMode::FirstTrack => collected.extend(tracks.into_iter().take(1)),
                    _ => collected.extend(tracks),
                },
                BackgroundResponse::Error { error } => {
                    warning!(
                        "Skipping album {} (\"{}\"): {}",
                        album.id,
                        album.title,
                        error
                    );
                }
                other => {
                    warning!(
                        "Unexpected response for album {} (\"{}\"): {:?}",
                        album.id,
                        album.title,
                        other
                    );
                }
            }
            self.progress.inc(1);

            if i + 1 < total {
                pause(self.delay, cancel).await?;
            }
        }
        check(cancel)?;

        let original = collected.len();
        utils::dedup_preserving_order(&mut collected);
        debug!("Deduplicated track links: {} -> {}", original, collected.len());

        if collected.is_empty() {
            return Ok(LinkOutcome::NoResults(
                "No tracks found for the albums on this page, or errors occurred during fetch."
                    .to_string(),
            ));
        }
        Ok(LinkOutcome::Links {
            links: collected,
            label: "track".to_string(),
        })
    }
}

fn check(cancel: &CancellationToken) -> Result<(), Cancelled> {
    if cancel.is_cancelled() {
        Err(Cancelled)
    } else {
        Ok(())
    }
}

/// Sleeps for `delay` unless cancelled first.
async fn pause(delay: Duration, cancel: &CancellationToken) -> Result<(), Cancelled> {
    tokio::select! {
        _ = cancel.cancelled() => Err(Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
