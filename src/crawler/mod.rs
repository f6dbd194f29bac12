//! Crawl driver.
//!
//! A region crawl walks `session check → court list → listing pages → cases`.
//! Cases are handled one at a time; each passes the dedup gate and is then
//! resolved, downloaded, reassembled, written and finally recorded. Only
//! session, court-list and store failures end the run; everything else is
//! counted and the crawl moves on.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, CrawlConfig, DownloadConfig};
use crate::db::IdentifierStore;
use crate::downloader::DownloadCoordinator;
use crate::error::Result;
use crate::fetcher::HttpSegmentFetcher;
use crate::manifest::{ManifestResolver, PortalManifestResolver};
use crate::portal::{CaseListing, PortalClient};
use crate::types::{CaseId, CaseReference, CourtInfo, CrawlStats, Event};
use crate::utils::pause;

mod case;

use case::Prepared;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Collaborators and settings a [`Crawler`] is assembled from
pub struct CrawlerParams {
    /// Court and case listing source
    pub listing: Arc<dyn CaseListing>,
    /// Case → segment list resolver
    pub resolver: Arc<dyn ManifestResolver>,
    /// Segment download coordinator
    pub coordinator: DownloadCoordinator,
    /// Processed-case store
    pub store: Arc<dyn IdentifierStore>,
    /// Paging and pacing settings
    pub crawl: CrawlConfig,
    /// Output settings
    pub download: DownloadConfig,
    /// Event bus shared with the coordinator
    pub event_tx: broadcast::Sender<Event>,
}

/// Drives a crawl over a region or an explicit list of case ids
pub struct Crawler {
    listing: Arc<dyn CaseListing>,
    resolver: Arc<dyn ManifestResolver>,
    coordinator: DownloadCoordinator,
    store: Arc<dyn IdentifierStore>,
    crawl: CrawlConfig,
    download: DownloadConfig,
    event_tx: broadcast::Sender<Event>,
    cancel_token: CancellationToken,
}

impl Crawler {
    /// Assemble a crawler from explicit collaborators
    pub fn new(params: CrawlerParams) -> Self {
        let CrawlerParams {
            listing,
            resolver,
            coordinator,
            store,
            crawl,
            download,
            event_tx,
        } = params;

        Self {
            listing,
            resolver,
            coordinator,
            store,
            crawl,
            download,
            event_tx,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Build the portal-backed crawler described by `config`
    pub fn from_config(config: &Config, store: Arc<dyn IdentifierStore>) -> Result<Self> {
        let client = PortalClient::new(config.portal.clone())?;
        let resolver = PortalManifestResolver::new(client.clone(), config.crawl.play_delay);
        let fetcher = HttpSegmentFetcher::new(
            config.download.segment_timeout,
            config.portal.user_agents.first().map(String::as_str),
        )?;

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let coordinator =
            DownloadCoordinator::new(Arc::new(fetcher), config.download.workers, event_tx.clone());

        Ok(Self::new(CrawlerParams {
            listing: Arc::new(client),
            resolver: Arc::new(resolver),
            coordinator,
            store,
            crawl: config.crawl.clone(),
            download: config.download.clone(),
            event_tx,
        }))
    }

    /// Subscribe to crawl events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Token that stops the crawl when cancelled
    ///
    /// A case still resolving or downloading at cancellation is abandoned: its
    /// segments are discarded and it is not recorded. A case whose video is
    /// already assembled is written and recorded before the crawl stops.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Request a stop
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    /// Crawl every court of a region
    pub async fn run_region(&self, area_code: &str) -> Result<CrawlStats> {
        self.listing.check_session().await?;

        let courts = self.listing.list_courts(area_code).await?;
        let mut stats = CrawlStats {
            courts: courts.len(),
            ..Default::default()
        };
        tracing::info!(
            area_code,
            courts = courts.len(),
            workers = self.coordinator.workers(),
            "Starting region crawl"
        );

        for court in &courts {
            if self.cancel_token.is_cancelled() {
                stats.interrupted = true;
                break;
            }
            self.crawl_court(court, &mut stats).await?;
        }

        log_summary(&stats);
        Ok(stats)
    }

    /// Process an explicit list of case ids, bypassing court and page listing
    pub async fn run_case_ids(&self, ids: &[CaseId]) -> Result<CrawlStats> {
        let cases: Vec<_> = ids.iter().cloned().map(CaseReference::from_id).collect();
        let mut stats = CrawlStats::default();

        tracing::info!(
            cases = cases.len(),
            workers = self.coordinator.workers(),
            "Starting task-file crawl"
        );
        self.process_cases(&cases, &mut stats).await?;

        log_summary(&stats);
        Ok(stats)
    }

    /// Page through one court until an empty or short page, or the page cap
    async fn crawl_court(&self, court: &CourtInfo, stats: &mut CrawlStats) -> Result<()> {
        for page in 1..=self.crawl.max_pages {
            if self.cancel_token.is_cancelled() {
                stats.interrupted = true;
                return Ok(());
            }

            let listed = self
                .listing
                .list_cases(court, page, self.crawl.page_size)
                .await;
            pause(&self.crawl.listing_delay).await;

            let cases = match listed {
                Ok(cases) => cases,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        court = %court.court_name,
                        page,
                        error = %e,
                        "Failed to fetch listing page, moving to next page"
                    );
                    stats.page_failures += 1;
                    continue;
                }
            };
            stats.pages += 1;

            if cases.is_empty() {
                tracing::debug!(court = %court.court_name, page, "Empty listing page, court done");
                break;
            }

            let before = *stats;
            self.process_cases(&cases, stats).await?;
            tracing::info!(
                court = %court.court_name,
                page,
                total = cases.len(),
                skipped = stats.skipped - before.skipped,
                saved = stats.saved - before.saved,
                failed = stats.failed() - before.failed(),
                "Finished listing page"
            );

            if cases.len() < self.crawl.page_size {
                tracing::debug!(court = %court.court_name, page, "Short listing page, court done");
                break;
            }
        }
        Ok(())
    }

    /// Run each case through the dedup gate and processing, one at a time
    async fn process_cases(&self, cases: &[CaseReference], stats: &mut CrawlStats) -> Result<()> {
        for case in cases {
            let prepared = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => {
                    tracing::info!(case_id = %case.case_id, "Shutdown requested, abandoning case");
                    stats.interrupted = true;
                    return Ok(());
                }
                prepared = self.prepare_case(case) => prepared?,
            };

            // a written video is always recorded, so saving is not raced against shutdown
            let outcome = match prepared {
                Prepared::Finished(outcome) => outcome,
                Prepared::Assembled { video, segments } => {
                    let outcome = self.save_case(case, video, segments).await?;
                    tokio::select! {
                        _ = self.cancel_token.cancelled() => {}
                        _ = pause(&self.crawl.save_delay) => {}
                    }
                    outcome
                }
            };
            stats.record(&outcome);
        }
        Ok(())
    }
}

fn log_summary(stats: &CrawlStats) {
    tracing::info!(
        courts = stats.courts,
        pages = stats.pages,
        page_failures = stats.page_failures,
        cases = stats.cases_seen,
        saved = stats.saved,
        skipped = stats.skipped,
        resolve_failures = stats.resolve_failures,
        download_failures = stats.download_failures,
        reassembly_failures = stats.reassembly_failures,
        write_failures = stats.write_failures,
        interrupted = stats.interrupted,
        "Crawl finished"
    );
}
