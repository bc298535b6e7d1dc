//! rymlinks library
//!
//! Turns RateYourMusic chart pages into shareable Spotify links. Chart items
//! embed their streaming links as JSON in a `data-links` attribute; this
//! library scrapes those, resolves them to `open.spotify.com` URLs and, for
//! album charts, can expand every album into its track links through the
//! Spotify Web API.
//!
//! # Modules
//!
//! - `api` - HTTP endpoints for the local OAuth callback server
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `error` - Error taxonomy shared by the token, API and extraction layers
//! - `management` - Token lifecycle and durable key-value storage
//! - `messaging` - Typed requests and responses between page and background
//! - `orchestrator` - End-to-end pipeline from chart page to link list
//! - `page` - Chart page loading and Spotify id extraction
//! - `server` - Local HTTP server for OAuth callbacks
//! - `spotify` - Spotify accounts and Web API calls
//! - `types` - Data structures and type definitions
//! - `utils` - PKCE helpers and small collection utilities

use std::sync::atomic::{AtomicBool, Ordering};

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod management;
pub mod messaging;
pub mod orchestrator;
pub mod page;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

/// A convenient Result type alias for operations that may fail.
///
/// Used at the application edges (CLI, startup) where any error is reported
/// to the user and the concrete type no longer matters.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Enables or disables output of the [`debug!`] macro.
pub fn set_verbose(enabled: bool) {
    VERBOSE.store(enabled, Ordering::Relaxed);
}

/// Returns whether [`debug!`] output is enabled.
pub fn verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Prints an informational message with a blue bullet point.
///
/// Status macros write to stderr; stdout carries only the extracted links so
/// they can be piped.
///
/// # Example
///
/// ```
/// info!("Found {} albums", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only used from CLI entry points; library code reports failures through
/// return values instead.
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Used for recoverable problems such as a skipped chart item or a failed
/// album lookup.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a dimmed diagnostic line when verbose output is enabled.
///
/// Enabled with `--verbose` or the `RYMLINKS_DEBUG` environment variable.
#[macro_export]
macro_rules! debug {
  ($($arg:tt)*) => ({
    if $crate::verbose() {
      use colored::Colorize;
      eprintln!("[{}] {}", "·".dimmed(), std::format_args!($($arg)*).to_string().dimmed());
    }
  })
}
