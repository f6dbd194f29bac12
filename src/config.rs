//! Configuration types for trial-dl

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Portal connection settings
///
/// The cookie is the only session state. It is passed explicitly to every
/// client built from this config.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Portal base URL (default: "http://tingshen.court.gov.cn")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Script that lists region names and area codes
    #[serde(default = "default_region_map_url")]
    pub region_map_url: String,

    /// Session cookie copied from a logged-in browser
    #[serde(default)]
    pub cookie: String,

    /// Referer header sent with portal requests
    #[serde(default = "default_referer")]
    pub referer: String,

    /// User agents to rotate through, one picked at random per request
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,

    /// Timeout for listing, play and manifest requests (default: 30s)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            region_map_url: default_region_map_url(),
            cookie: String::new(),
            referer: default_referer(),
            user_agents: default_user_agents(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Listing traversal and request pacing
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Cases requested per listing page (default: 15)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Maximum listing pages visited per court (default: 100)
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Pause after each listing page
    #[serde(default = "default_listing_delay")]
    pub listing_delay: DelayRange,

    /// Pause after each play URL lookup
    #[serde(default = "default_play_delay")]
    pub play_delay: DelayRange,

    /// Pause after each saved video
    #[serde(default = "default_save_delay")]
    pub save_delay: DelayRange,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            listing_delay: default_listing_delay(),
            play_delay: default_play_delay(),
            save_delay: default_save_delay(),
        }
    }
}

/// Segment download and output settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory videos are written to (default: "save_video")
    #[serde(default = "default_save_dir")]
    pub save_dir: PathBuf,

    /// Maximum concurrent segment fetches per case (default: 15)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Timeout for a single segment fetch (default: 60s)
    #[serde(default = "default_segment_timeout", with = "duration_serde")]
    pub segment_timeout: Duration,

    /// Output file naming
    #[serde(default)]
    pub naming: ArtifactNaming,

    /// File collision handling
    #[serde(default)]
    pub file_collision: FileCollisionAction,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            save_dir: default_save_dir(),
            workers: default_workers(),
            segment_timeout: default_segment_timeout(),
            naming: ArtifactNaming::default(),
            file_collision: FileCollisionAction::default(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Database path (default: "trial.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Main configuration
///
/// Every field has a default, so an empty JSON object is a valid config file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Portal connection settings
    #[serde(default)]
    pub portal: PortalConfig,

    /// Listing traversal and pacing
    #[serde(default)]
    pub crawl: CrawlConfig,

    /// Segment download and output settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Data storage
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Config {
    /// Load a JSON config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.download.workers == 0 {
            return Err(config_error("workers must be at least 1", "download.workers"));
        }
        if self.crawl.page_size == 0 {
            return Err(config_error("page size must be at least 1", "crawl.page_size"));
        }
        if self.crawl.max_pages == 0 {
            return Err(config_error("page cap must be at least 1", "crawl.max_pages"));
        }
        if self.portal.user_agents.is_empty() {
            return Err(config_error(
                "at least one user agent is required",
                "portal.user_agents",
            ));
        }
        if url::Url::parse(&self.portal.base_url).is_err() {
            return Err(config_error(
                format!("base URL {:?} is not a valid URL", self.portal.base_url),
                "portal.base_url",
            ));
        }
        for (key, range) in [
            ("crawl.listing_delay", &self.crawl.listing_delay),
            ("crawl.play_delay", &self.crawl.play_delay),
            ("crawl.save_delay", &self.crawl.save_delay),
        ] {
            if range.min > range.max {
                return Err(config_error("delay minimum exceeds maximum", key));
            }
        }
        Ok(())
    }
}

fn config_error(message: impl Into<String>, key: &str) -> Error {
    Error::Config {
        message: message.into(),
        key: Some(key.to_string()),
    }
}

/// A jittered pause, picked uniformly between `min` and `max`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    /// Lower bound, in milliseconds when serialized
    #[serde(with = "millis_serde")]
    pub min: Duration,
    /// Upper bound, in milliseconds when serialized
    #[serde(with = "millis_serde")]
    pub max: Duration,
}

impl DelayRange {
    /// A range from `min_ms` to `max_ms` milliseconds
    pub const fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min: Duration::from_millis(min_ms),
            max: Duration::from_millis(max_ms),
        }
    }

    /// No pause at all
    pub const fn none() -> Self {
        Self::from_millis(0, 0)
    }

    /// Whether this range never pauses
    pub fn is_zero(&self) -> bool {
        self.max.is_zero()
    }
}

/// How output video files are named
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactNaming {
    /// Text prepended to every file name (default: none)
    #[serde(default)]
    pub prefix: String,

    /// Append `_<caseId>` so identical titles don't collide (default: false)
    #[serde(default)]
    pub append_case_id: bool,
}

/// File collision handling strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCollisionAction {
    /// Append (1), (2), etc. to filename (default)
    #[default]
    Rename,
    /// Overwrite existing file
    Overwrite,
    /// Skip the file, keep existing
    Skip,
}

// Default value functions
fn default_base_url() -> String {
    "http://tingshen.court.gov.cn".to_string()
}

fn default_region_map_url() -> String {
    "http://sts.videoincloud.com/static/libs/raphael/mapData_aa5c121.js".to_string()
}

fn default_referer() -> String {
    "http://tingshen.court.gov.cn/".to_string()
}

fn default_user_agents() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36 Edg/119.0.0.0".into(),
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36".into(),
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15".into(),
        "Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/119.0".into(),
    ]
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_page_size() -> usize {
    15
}

fn default_max_pages() -> u32 {
    100
}

fn default_listing_delay() -> DelayRange {
    DelayRange::from_millis(5_000, 7_000)
}

fn default_play_delay() -> DelayRange {
    DelayRange::from_millis(1_000, 1_500)
}

fn default_save_delay() -> DelayRange {
    DelayRange::from_millis(3_000, 3_500)
}

fn default_save_dir() -> PathBuf {
    PathBuf::from("save_video")
}

fn default_workers() -> usize {
    15
}

fn default_segment_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_database_path() -> PathBuf {
    PathBuf::from("trial.db")
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Millisecond Duration serialization helper
mod millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_portal_behaviour() {
        let config = Config::default();
        assert_eq!(config.crawl.page_size, 15);
        assert_eq!(config.crawl.max_pages, 100);
        assert_eq!(config.download.workers, 15);
        assert_eq!(config.crawl.listing_delay, DelayRange::from_millis(5_000, 7_000));
        assert_eq!(config.persistence.database_path, PathBuf::from("trial.db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_json_object_yields_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.download.workers, 15);
        assert_eq!(config.portal.base_url, "http://tingshen.court.gov.cn");
        assert!(!config.portal.user_agents.is_empty());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let json = r#"{
            "download": { "workers": 4, "naming": { "prefix": "yn_", "append_case_id": true } },
            "crawl": { "play_delay": { "min": 0, "max": 250 } }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.download.workers, 4);
        assert_eq!(config.download.naming.prefix, "yn_");
        assert!(config.download.naming.append_case_id);
        assert_eq!(config.download.save_dir, PathBuf::from("save_video"));
        assert_eq!(config.crawl.play_delay.max, Duration::from_millis(250));
        assert_eq!(config.crawl.page_size, 15);
    }

    #[test]
    fn durations_serialize_as_integers() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(json["portal"]["request_timeout"], 30);
        assert_eq!(json["crawl"]["save_delay"]["min"], 3000);
        assert_eq!(json["download"]["file_collision"], "rename");
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let mut config = Config::default();
        config.download.workers = 0;

        match config.validate() {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("download.workers")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_inverted_delay() {
        let mut config = Config::default();
        config.crawl.save_delay = DelayRange::from_millis(500, 100);

        match config.validate() {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("crawl.save_delay")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.portal.base_url = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_file_reports_parse_errors_as_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ \"download\": { \"workers\": \"many\" } }").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn from_file_reads_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "portal": { "cookie": "JSESSIONID=abc" } }"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.portal.cookie, "JSESSIONID=abc");
    }
}
