//! Bounded-concurrency segment download for one case.
//!
//! All tasks of a manifest are pushed through a `buffer_unordered` stream so at
//! most `workers` fetches are in flight. Results are collected by the single
//! consumer loop in [`DownloadCoordinator::run`]; fetches never share a buffer.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::broadcast;

use crate::error::DownloadError;
use crate::fetcher::SegmentFetcher;
use crate::types::{CaseId, Event, SegmentResult, SegmentTask};

/// Runs every segment fetch of a case and joins on all of them
#[derive(Clone)]
pub struct DownloadCoordinator {
    fetcher: Arc<dyn SegmentFetcher>,
    workers: usize,
    event_tx: broadcast::Sender<Event>,
}

impl DownloadCoordinator {
    /// Create a coordinator running at most `workers` fetches at once (minimum 1)
    pub fn new(
        fetcher: Arc<dyn SegmentFetcher>,
        workers: usize,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            fetcher,
            workers: workers.max(1),
            event_tx,
        }
    }

    /// Maximum number of concurrent fetches
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Fetch all `tasks`, waiting for every one to finish
    ///
    /// Emits [`Event::SegmentFetched`] after each completion. Results come back
    /// in completion order; if any fetch failed the whole batch is rejected
    /// with the failed indices in ascending order.
    pub async fn run(
        &self,
        case_id: &CaseId,
        tasks: Vec<SegmentTask>,
    ) -> Result<Vec<SegmentResult>, DownloadError> {
        let total = tasks.len();
        let mut results = Vec::with_capacity(total);
        let mut failed_indices = Vec::new();
        let mut completed = 0usize;

        tracing::debug!(
            case_id = %case_id,
            segments = total,
            workers = self.workers,
            "Starting segment download"
        );

        let mut fetches = stream::iter(tasks)
            .map(|task| {
                let fetcher = Arc::clone(&self.fetcher);
                async move { fetcher.fetch(task).await }
            })
            .buffer_unordered(self.workers);

        while let Some(outcome) = fetches.next().await {
            completed += 1;
            let failed = match outcome {
                Ok(result) => {
                    results.push(result);
                    false
                }
                Err(e) => {
                    tracing::warn!(
                        case_id = %case_id,
                        sequence_index = e.index(),
                        error = %e,
                        "Segment fetch failed"
                    );
                    failed_indices.push(e.index());
                    true
                }
            };

            self.event_tx
                .send(Event::SegmentFetched {
                    case_id: case_id.clone(),
                    completed,
                    total,
                    failed,
                })
                .ok();
        }

        if !failed_indices.is_empty() {
            failed_indices.sort_unstable();
            return Err(DownloadError::PartialFailure {
                failed_indices,
                total,
            });
        }

        Ok(results)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
