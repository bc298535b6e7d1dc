use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    error,
    error::Cancelled,
    orchestrator::{LinkOutcome, Orchestrator},
    success,
    types::LinkMode,
    warning,
};

use super::{cancel_on_ctrl_c, http_client, load_page, open_background};

/// Prints the Spotify links of a chart page, one per line.
///
/// `source` is a chart URL or a saved HTML file; `page_url` supplies the
/// chart URL for saved files so the chart type can be detected.
pub async fn links(source: String, page_url: Option<String>, mode: LinkMode) {
    let client = http_client();
    let mut background = open_background(client.clone()).await;
    let open_url = background.tokens().config().open_url.clone();
    let page = load_page(&client, &source, page_url)
        .await
        .with_open_url(open_url);

    let cancel = cancel_on_ctrl_c();
    let outcome = Orchestrator::new(&page, &mut background)
        .with_progress(spinner())
        .get_links(mode, &cancel)
        .await;

    match outcome {
        Ok(LinkOutcome::Links { links, label }) => {
            for link in &links {
                println!("{link}");
            }
            success!("Found {} {} links", links.len(), label);
        }
        Ok(LinkOutcome::NoResults(message)) => warning!("{}", message),
        Ok(LinkOutcome::LoginRequired) => {
            error!("Spotify login required. Please run `rymlinks login` and try again")
        }
        Ok(LinkOutcome::Rejected(message)) => error!("{}", message),
        Err(Cancelled) => warning!("Cancelled, no links were kept"),
    }

    background.shutdown();
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
