//! Manifest resolution: case → play locator → player document → segment list.
//!
//! The pure helpers in this module do all parsing and validation so the
//! network side ([`PortalManifestResolver`]) stays a thin sequence of fetches.

use url::Url;

use crate::config::DelayRange;
use crate::error::ResolveError;
use crate::portal::PortalClient;
use crate::types::{CaseReference, SegmentTask};
use crate::utils::pause;

type Result<T> = std::result::Result<T, ResolveError>;

/// Turns a case into its ordered list of segment tasks
///
/// Implementations either return tasks numbered `1..=N` without gaps or
/// fail; every error means "skip this case".
#[async_trait::async_trait]
pub trait ManifestResolver: Send + Sync {
    /// Resolve the segment tasks for one case
    async fn resolve(&self, case: &CaseReference) -> Result<Vec<SegmentTask>>;
}

/// Resolver backed by the portal's play endpoint and the CDN player page
pub struct PortalManifestResolver {
    client: PortalClient,
    play_delay: DelayRange,
}

impl PortalManifestResolver {
    /// Create a resolver that pauses for `play_delay` after each play-locator lookup
    pub fn new(client: PortalClient, play_delay: DelayRange) -> Self {
        Self { client, play_delay }
    }
}

#[async_trait::async_trait]
impl ManifestResolver for PortalManifestResolver {
    async fn resolve(&self, case: &CaseReference) -> Result<Vec<SegmentTask>> {
        let raw_play_url = self.client.play_url(&case.case_id).await?;
        pause(&self.play_delay).await;

        let play_url = normalize_locator(&raw_play_url, self.client.base_url())?;
        tracing::debug!(case_id = %case.case_id, play_url = %play_url, "Resolved play locator");

        let document = self.client.fetch_text(&play_url).await?;
        let raw_manifest_url = extract_manifest_url(&document)
            .ok_or_else(|| ResolveError::invalid("player document has no manifest URL"))?;
        let manifest_url = normalize_locator(&raw_manifest_url, &play_url)?;

        let playlist = self.client.fetch_text(&manifest_url).await?;
        let tasks = parse_segment_list(&playlist, &manifest_url)?;
        validate_contiguous(&tasks)?;

        tracing::debug!(
            case_id = %case.case_id,
            manifest = %manifest_url,
            segments = tasks.len(),
            "Parsed segment list"
        );
        Ok(tasks)
    }
}

/// Make a locator absolute
///
/// Scheme-relative locators (`//host/path`) get `http:`, absolute URLs are
/// kept, and anything else is joined onto `base`.
pub fn normalize_locator(raw: &str, base: &Url) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ResolveError::invalid("empty locator"));
    }

    let parsed = if raw.starts_with("//") {
        Url::parse(&format!("http:{raw}"))
    } else {
        match Url::parse(raw) {
            Err(url::ParseError::RelativeUrlWithoutBase) => base.join(raw),
            other => other,
        }
    };

    parsed.map_err(|e| ResolveError::invalid(format!("bad locator {raw:?}: {e}")))
}

/// Pull the manifest URL out of the player page's `url: '...',` marker
pub fn extract_manifest_url(document: &str) -> Option<String> {
    let marker = regex::Regex::new(r"url: '(.*?)',").ok()?;
    marker
        .captures(document)
        .map(|caps| caps[1].trim().to_string())
        .filter(|url| !url.is_empty())
}

/// Parse an HLS media playlist into tasks numbered from 1 in document order
///
/// Lines that are empty or contain `#` are not segments. Relative segment
/// lines are resolved against `manifest_url`.
pub fn parse_segment_list(playlist: &str, manifest_url: &Url) -> Result<Vec<SegmentTask>> {
    let playlist = playlist.trim_start_matches('\u{feff}');
    if !playlist.trim_start().starts_with("#EXTM3U") {
        return Err(ResolveError::invalid("document is not an HLS playlist"));
    }
    if playlist.contains("#EXT-X-STREAM-INF") {
        return Err(ResolveError::invalid(
            "master playlist found where a media playlist was expected",
        ));
    }

    let tasks = playlist
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains('#'))
        .enumerate()
        .map(|(i, line)| {
            Ok(SegmentTask {
                sequence_index: i as u32 + 1,
                locator: normalize_locator(line, manifest_url)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if tasks.is_empty() {
        return Err(ResolveError::invalid("playlist lists no segments"));
    }
    Ok(tasks)
}

/// Check that tasks are numbered exactly `1..=N` in order
pub fn validate_contiguous(tasks: &[SegmentTask]) -> Result<()> {
    if tasks.is_empty() {
        return Err(ResolveError::invalid("playlist lists no segments"));
    }
    for (position, task) in tasks.iter().enumerate() {
        let expected = position as u32 + 1;
        if task.sequence_index != expected {
            return Err(ResolveError::invalid(format!(
                "segment numbering broken at position {expected}: found {}",
                task.sequence_index
            )));
        }
    }
    Ok(())
}
