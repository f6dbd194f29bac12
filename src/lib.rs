//! # trial-dl
//!
//! Crawler that archives recorded court hearings from the public trial video
//! portal.
//!
//! For each court in a region it pages through the published hearings,
//! resolves every new case to its HLS segment list, downloads the segments
//! concurrently, joins them in manifest order into one video and records the
//! case id in SQLite so later runs skip it.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use trial_dl::{Config, Crawler, Database, run_with_shutdown};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.portal.cookie = std::env::var("TRIAL_DL_COOKIE")?;
//!
//!     let db = Arc::new(Database::new(&config.persistence.database_path).await?);
//!     let crawler = Crawler::from_config(&config, db)?;
//!
//!     // Log every saved hearing
//!     let mut events = crawler.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let stats = run_with_shutdown(crawler.cancel_token(), crawler.run_region("530000")).await?;
//!     println!("saved {} hearings", stats.saved);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Segment reassembly and video output
pub mod assembler;
/// Configuration types
pub mod config;
/// Crawl driver
pub mod crawler;
/// Processed-case persistence
pub mod db;
/// Bounded-concurrency segment download
pub mod downloader;
/// Error types
pub mod error;
/// Single-segment retrieval
pub mod fetcher;
/// Manifest resolution
pub mod manifest;
/// Hearing portal adapter
pub mod portal;
/// Progress logging from the event bus
pub mod progress;
/// Explicit case-id input
pub mod task_file;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, FileCollisionAction};
pub use crawler::{Crawler, CrawlerParams};
pub use db::{Database, IdentifierStore};
pub use downloader::DownloadCoordinator;
pub use error::{
    AuthError, DownloadError, Error, FetchError, ReassemblyError, ResolveError, Result,
    StoreError,
};
pub use fetcher::{HttpSegmentFetcher, SegmentFetcher};
pub use manifest::{ManifestResolver, PortalManifestResolver};
pub use portal::{CaseListing, PortalClient};
pub use types::{
    CaseId, CaseOutcome, CaseReference, CourtInfo, CrawlStats, Event, Region, SegmentResult,
    SegmentTask,
};

/// Run a crawl future with graceful signal handling.
///
/// A termination signal cancels `cancel_token`, which makes the crawler stop
/// at the next case boundary and abandon the case in flight. The future's own
/// output is returned either way.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_with_shutdown<F>(cancel_token: CancellationToken, crawl: F) -> F::Output
where
    F: Future,
{
    let watcher = tokio::spawn({
        let token = cancel_token.clone();
        async move {
            tokio::select! {
                _ = wait_for_signal() => {
                    tracing::info!("Shutting down after the current case is abandoned");
                    token.cancel();
                }
                _ = token.cancelled() => {}
            }
        }
    });

    let output = crawl.await;
    watcher.abort();
    output
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_with_shutdown_returns_crawl_output() {
        let token = CancellationToken::new();
        let output = run_with_shutdown(token.clone(), async { 42 }).await;
        assert_eq!(output, 42);
        assert!(!token.is_cancelled());
    }
}
