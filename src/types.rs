//! Core types for trial-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Opaque identifier the portal assigns to a recorded hearing
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(pub String);

impl CaseId {
    /// Create a new CaseId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the inner identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CaseId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CaseId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl PartialEq<&str> for CaseId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for CaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// Implement sqlx Type, Encode, and Decode for database operations
impl sqlx::Type<sqlx::Sqlite> for CaseId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for CaseId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for CaseId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// One hearing as listed by the portal. Immutable once retrieved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseReference {
    /// Portal case identifier
    pub case_id: CaseId,
    /// Hearing title
    pub case_title: String,
    /// Docket number
    pub case_no: String,
    /// Court that published the recording
    pub court_name: String,
    /// Hearing start time, `YYYY-MM-DD HH:MM:SS` in portal local time
    pub publish_time: String,
}

impl CaseReference {
    /// Reference carrying only an identifier, used when ids come from a task file
    pub fn from_id(case_id: impl Into<CaseId>) -> Self {
        Self {
            case_id: case_id.into(),
            case_title: String::new(),
            case_no: String::new(),
            court_name: String::new(),
            publish_time: String::new(),
        }
    }
}

/// A court that publishes hearing recordings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourtInfo {
    /// Display name
    pub court_name: String,
    /// Portal court code used by the case listing
    pub court_code: String,
    /// Court level passed back to the case listing
    pub court_level: i32,
}

/// A province or region the portal can be crawled by
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Region display name
    pub name: String,
    /// Area code accepted by the court listing
    pub code: String,
}

/// One segment to fetch. `sequence_index` starts at 1 and is the reassembly order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentTask {
    /// Position of the segment in the manifest (1-based)
    pub sequence_index: u32,
    /// Absolute segment URL
    pub locator: Url,
}

/// Raw bytes of one fetched segment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentResult {
    /// Position of the segment in the manifest (1-based)
    pub sequence_index: u32,
    /// Segment payload
    pub payload: Vec<u8>,
}

/// Event emitted during a crawl
///
/// Sent over a broadcast channel; sending never blocks the pipeline and
/// events are dropped when nobody is subscribed.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A case passed the dedup gate and is being processed
    CaseStarted {
        /// Case ID
        case_id: CaseId,
        /// Case title (may be empty in task-file mode)
        title: String,
    },

    /// The manifest for a case was resolved
    ManifestResolved {
        /// Case ID
        case_id: CaseId,
        /// Number of segments in the manifest
        segments: usize,
    },

    /// One segment fetch finished (successfully or not)
    SegmentFetched {
        /// Case ID
        case_id: CaseId,
        /// Fetches finished so far, including this one
        completed: usize,
        /// Number of segments in the manifest
        total: usize,
        /// Whether this fetch failed
        failed: bool,
    },

    /// The case was written to disk and recorded in the store
    CaseSaved {
        /// Case ID
        case_id: CaseId,
        /// Path of the written video
        path: PathBuf,
        /// Size of the written video in bytes
        size_bytes: u64,
    },

    /// The case was already in the store
    CaseSkipped {
        /// Case ID
        case_id: CaseId,
    },

    /// The case could not be processed and was left out of the store
    CaseFailed {
        /// Case ID
        case_id: CaseId,
        /// Error message
        error: String,
    },
}

/// What happened to one case
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaseOutcome {
    /// Already processed in an earlier run
    Skipped,
    /// Downloaded, written and recorded
    Saved {
        /// Path of the written video
        path: PathBuf,
        /// Number of segments assembled
        segments: usize,
    },
    /// Manifest resolution failed
    ResolveFailed,
    /// One or more segments failed
    DownloadFailed,
    /// Result set did not cover the manifest
    ReassemblyFailed,
    /// The assembled video could not be written
    WriteFailed,
}

/// Counters for one crawl run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStats {
    /// Courts visited
    pub courts: usize,
    /// Listing pages fetched successfully
    pub pages: usize,
    /// Listing pages that failed to load
    pub page_failures: usize,
    /// Cases seen in listings or task files
    pub cases_seen: usize,
    /// Cases downloaded and recorded
    pub saved: usize,
    /// Cases skipped by the dedup gate
    pub skipped: usize,
    /// Cases whose manifest could not be resolved
    pub resolve_failures: usize,
    /// Cases with at least one failed segment
    pub download_failures: usize,
    /// Cases whose results did not cover the manifest
    pub reassembly_failures: usize,
    /// Cases whose video could not be written
    pub write_failures: usize,
    /// The run was stopped by a shutdown request before it finished
    pub interrupted: bool,
}

impl CrawlStats {
    /// Tally one case outcome
    pub fn record(&mut self, outcome: &CaseOutcome) {
        self.cases_seen += 1;
        match outcome {
            CaseOutcome::Skipped => self.skipped += 1,
            CaseOutcome::Saved { .. } => self.saved += 1,
            CaseOutcome::ResolveFailed => self.resolve_failures += 1,
            CaseOutcome::DownloadFailed => self.download_failures += 1,
            CaseOutcome::ReassemblyFailed => self.reassembly_failures += 1,
            CaseOutcome::WriteFailed => self.write_failures += 1,
        }
    }

    /// Cases that were attempted but not recorded
    pub fn failed(&self) -> usize {
        self.resolve_failures + self.download_failures + self.reassembly_failures + self.write_failures
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_id_displays_inner_value() {
        let id = CaseId::new("37114168");
        assert_eq!(id.to_string(), "37114168");
        assert_eq!(id, "37114168");
    }

    #[test]
    fn case_id_serializes_transparently() {
        let json = serde_json::to_string(&CaseId::new("C100")).unwrap();
        assert_eq!(json, "\"C100\"");
    }

    #[test]
    fn from_id_leaves_metadata_empty() {
        let case = CaseReference::from_id("C200");
        assert_eq!(case.case_id, "C200");
        assert!(case.case_title.is_empty());
        assert!(case.publish_time.is_empty());
    }

    #[test]
    fn stats_tally_each_outcome() {
        let mut stats = CrawlStats::default();
        stats.record(&CaseOutcome::Skipped);
        stats.record(&CaseOutcome::Saved {
            path: PathBuf::from("a.mp4"),
            segments: 3,
        });
        stats.record(&CaseOutcome::ResolveFailed);
        stats.record(&CaseOutcome::DownloadFailed);
        stats.record(&CaseOutcome::WriteFailed);

        assert_eq!(stats.cases_seen, 5);
        assert_eq!(stats.saved, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed(), 3);
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let event = Event::SegmentFetched {
            case_id: CaseId::new("C1"),
            completed: 2,
            total: 3,
            failed: false,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "segment_fetched");
        assert_eq!(json["completed"], 2);
    }
}
