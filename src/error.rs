//! Error types for trial-dl
//!
//! Each pipeline stage has its own error enum so the crawl driver can decide,
//! per failure, whether to skip the case or abort the whole run:
//! - [`AuthError`] - the portal session is invalid (fatal)
//! - [`ResolveError`] - play locator or manifest malformed (skip case)
//! - [`FetchError`] - one segment transfer failed (fails the download batch)
//! - [`DownloadError`] - one or more segments failed (case not persisted)
//! - [`ReassemblyError`] - result set does not cover the manifest (skip case)
//! - [`StoreError`] - identifier store unavailable (fatal)

use std::path::PathBuf;
use thiserror::Error;

use crate::types::CaseId;

/// Result type alias for trial-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for trial-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download.workers")
        key: Option<String>,
    },

    /// Portal session is missing, expired or rejected
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Identifier store operation failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Manifest resolution failed for a case
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// A single segment fetch failed
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Segment download batch failed
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Reassembled result set is inconsistent with its manifest
    #[error("reassembly error: {0}")]
    Reassembly(#[from] ReassemblyError),

    /// Court or case listing could not be retrieved or parsed
    #[error("listing error: {0}")]
    Listing(String),

    /// Task file could not be read or contains no usable entries
    #[error("invalid task file {path}: {reason}")]
    InvalidTaskFile {
        /// Path of the task file
        path: PathBuf,
        /// Why the file was rejected
        reason: String,
    },

    /// Output file already exists and cannot be replaced
    #[error("file collision at {path}: {reason}")]
    FileCollision {
        /// The path where the collision occurred
        path: PathBuf,
        /// Why no usable path was found
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error must abort the whole run rather than a single case.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Auth(_) | Error::Store(_) | Error::Config { .. }
        )
    }
}

/// Portal session errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// No cookie was configured
    #[error("no session cookie configured")]
    MissingCookie,

    /// The session check page did not show a logged-in user
    #[error("session cookie has expired, refresh it and rerun")]
    SessionExpired,

    /// The portal rejected the request outright
    #[error("portal rejected the session with HTTP {status}")]
    Rejected {
        /// HTTP status returned by the portal
        status: u16,
    },
}

/// Identifier store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Manifest resolution errors. Every variant means "skip this case".
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The play endpoint returned no play URL
    #[error("no play URL returned for case {case_id}")]
    PlayLocatorMissing {
        /// Case whose play URL was missing
        case_id: CaseId,
    },

    /// The player document or manifest is not usable
    #[error("invalid manifest: {reason}")]
    InvalidManifest {
        /// What was wrong with the upstream document
        reason: String,
    },

    /// Transport failure while resolving
    #[error("request to {url} failed: {message}")]
    Request {
        /// URL that was being fetched
        url: String,
        /// Underlying error message
        message: String,
    },
}

impl ResolveError {
    /// Build an [`ResolveError::InvalidManifest`] from any message
    pub fn invalid(reason: impl Into<String>) -> Self {
        ResolveError::InvalidManifest {
            reason: reason.into(),
        }
    }
}

/// Single segment transfer errors
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connecting or sending the request failed
    #[error("segment {index}: request failed: {message}")]
    Request {
        /// Sequence index of the segment
        index: u32,
        /// Underlying error message
        message: String,
    },

    /// Server answered with a non-success status
    #[error("segment {index}: HTTP {status}")]
    Status {
        /// Sequence index of the segment
        index: u32,
        /// HTTP status code
        status: u16,
    },

    /// Body ended before the advertised length, or the stream broke mid-transfer
    #[error("segment {index}: incomplete transfer ({received} of {expected:?} bytes)")]
    Incomplete {
        /// Sequence index of the segment
        index: u32,
        /// Bytes received before the transfer ended
        received: u64,
        /// Content-Length advertised by the server, if any
        expected: Option<u64>,
    },
}

impl FetchError {
    /// Sequence index of the segment that failed
    pub fn index(&self) -> u32 {
        match self {
            FetchError::Request { index, .. }
            | FetchError::Status { index, .. }
            | FetchError::Incomplete { index, .. } => *index,
        }
    }
}

/// Segment download batch errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// At least one segment failed; the case must not be saved
    #[error("{} of {total} segments failed: {failed_indices:?}", .failed_indices.len())]
    PartialFailure {
        /// Sequence indices that failed, ascending
        failed_indices: Vec<u32>,
        /// Number of segments in the manifest
        total: usize,
    },
}

/// Reassembly consistency errors
#[derive(Debug, Error)]
pub enum ReassemblyError {
    /// A sequence index in 1..=N has no result
    #[error("segment {index} missing from result set")]
    MissingIndex {
        /// The absent sequence index
        index: u32,
    },

    /// A sequence index appears more than once
    #[error("segment {index} appears more than once")]
    DuplicateIndex {
        /// The repeated sequence index
        index: u32,
    },

    /// A sequence index falls outside 1..=N
    #[error("segment {index} outside manifest range 1..={total}")]
    UnexpectedIndex {
        /// The out-of-range sequence index
        index: u32,
        /// Number of segments in the manifest
        total: usize,
    },
}
