//! Per-case processing: dedup gate, resolve, download, reassemble, write, record.
//!
//! [`Crawler::prepare_case`] may be abandoned at any await point. Once it has
//! produced a video, [`Crawler::save_case`] writes and records it as one step.

use crate::assembler::{artifact_file_name, assemble, write_artifact};
use crate::error::Result;
use crate::types::{CaseOutcome, CaseReference, Event};

use super::Crawler;

/// Where a case stands once its segments are in memory
pub(super) enum Prepared {
    /// Skipped or failed; nothing to write
    Finished(CaseOutcome),
    /// Segments joined in order, ready to be written and recorded
    Assembled {
        video: Vec<u8>,
        segments: usize,
    },
}

impl Crawler {
    /// Skip a case the store already holds, otherwise bring it up to an assembled video
    ///
    /// Only store failures are returned as errors.
    pub(super) async fn prepare_case(&self, case: &CaseReference) -> Result<Prepared> {
        if self.store.exists(&case.case_id).await? {
            tracing::debug!(case_id = %case.case_id, "Already processed, skipping");
            self.emit(Event::CaseSkipped {
                case_id: case.case_id.clone(),
            });
            return Ok(Prepared::Finished(CaseOutcome::Skipped));
        }

        tracing::info!(
            case_id = %case.case_id,
            title = %case.case_title,
            case_no = %case.case_no,
            court = %case.court_name,
            publish_time = %case.publish_time,
            "Processing case"
        );
        self.emit(Event::CaseStarted {
            case_id: case.case_id.clone(),
            title: case.case_title.clone(),
        });

        let tasks = match self.resolver.resolve(case).await {
            Ok(tasks) => tasks,
            Err(e) => {
                self.case_failed(case, &e);
                return Ok(Prepared::Finished(CaseOutcome::ResolveFailed));
            }
        };
        let total = tasks.len();
        self.emit(Event::ManifestResolved {
            case_id: case.case_id.clone(),
            segments: total,
        });

        let results = match self.coordinator.run(&case.case_id, tasks).await {
            Ok(results) => results,
            Err(e) => {
                self.case_failed(case, &e);
                return Ok(Prepared::Finished(CaseOutcome::DownloadFailed));
            }
        };

        match assemble(results, total) {
            Ok(video) => Ok(Prepared::Assembled {
                video,
                segments: total,
            }),
            Err(e) => {
                self.case_failed(case, &e);
                Ok(Prepared::Finished(CaseOutcome::ReassemblyFailed))
            }
        }
    }

    /// Write an assembled video and record the case
    pub(super) async fn save_case(
        &self,
        case: &CaseReference,
        video: Vec<u8>,
        segments: usize,
    ) -> Result<CaseOutcome> {
        let file_name = artifact_file_name(case, &self.download.naming);
        let path = match write_artifact(
            &self.download.save_dir,
            &file_name,
            &video,
            self.download.file_collision,
        )
        .await
        {
            Ok(path) => path,
            Err(e) => {
                self.case_failed(case, &e);
                return Ok(CaseOutcome::WriteFailed);
            }
        };

        self.store.insert(case).await?;

        tracing::info!(
            case_id = %case.case_id,
            path = %path.display(),
            segments,
            bytes = video.len(),
            "Saved hearing video"
        );
        self.emit(Event::CaseSaved {
            case_id: case.case_id.clone(),
            path: path.clone(),
            size_bytes: video.len() as u64,
        });

        Ok(CaseOutcome::Saved { path, segments })
    }

    fn case_failed(&self, case: &CaseReference, error: &dyn std::fmt::Display) {
        tracing::warn!(case_id = %case.case_id, error = %error, "Case failed, leaving it unrecorded");
        self.emit(Event::CaseFailed {
            case_id: case.case_id.clone(),
            error: error.to_string(),
        });
    }

    fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}
