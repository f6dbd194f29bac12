//! Event-bus subscriber that logs per-case download progress.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::types::{CaseId, Event};

/// Progress is logged each time a case crosses another multiple of this percentage
const PROGRESS_STEP_PERCENT: usize = 10;

/// Tracks which progress step was last reported for the current case
#[derive(Debug, Default)]
pub struct ProgressSteps {
    current: Option<(CaseId, usize)>,
}

impl ProgressSteps {
    /// Record a completion and return the percentage to report, if a new step was reached
    pub fn advance(&mut self, case_id: &CaseId, completed: usize, total: usize) -> Option<usize> {
        if total == 0 {
            return None;
        }
        let percent = completed.min(total) * 100 / total;
        let step = percent / PROGRESS_STEP_PERCENT;

        let last = match &self.current {
            Some((id, last)) if id == case_id => *last,
            _ => 0,
        };
        self.current = Some((case_id.clone(), last.max(step)));
        (step > last).then_some(step * PROGRESS_STEP_PERCENT)
    }
}

/// Spawn a task that logs segment progress until the event channel closes
pub fn spawn_progress_logger(mut events: broadcast::Receiver<Event>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut steps = ProgressSteps::default();
        let mut failed_segments = 0usize;

        loop {
            match events.recv().await {
                Ok(Event::CaseStarted { .. }) => failed_segments = 0,
                Ok(Event::ManifestResolved { case_id, segments }) => {
                    tracing::info!(case_id = %case_id, segments, "Downloading segments");
                }
                Ok(Event::SegmentFetched {
                    case_id,
                    completed,
                    total,
                    failed,
                }) => {
                    if failed {
                        failed_segments += 1;
                    }
                    if let Some(percent) = steps.advance(&case_id, completed, total) {
                        tracing::info!(
                            case_id = %case_id,
                            completed,
                            total,
                            failed = failed_segments,
                            "Download progress {percent}%"
                        );
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Progress logger lagged behind event bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
