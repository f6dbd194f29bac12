//! Utility functions for file naming, path collisions, timestamps and pacing

use crate::config::{DelayRange, FileCollisionAction};
use crate::error::{Error, Result};
use chrono::{FixedOffset, TimeZone};
use rand::Rng;
use std::path::{Path, PathBuf};

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Portal timestamps are rendered in China Standard Time (UTC+8)
const PORTAL_UTC_OFFSET_SECS: i32 = 8 * 3600;

/// Get a unique path for a file, handling collisions according to the specified action
///
/// # Returns
///
/// Returns the final path to use. For Rename action, this may have a suffix added.
/// For Skip action, returns an error if the file already exists.
/// For Overwrite action, returns the original path unchanged.
///
/// # Examples
///
/// ```
/// use trial_dl::utils::get_unique_path;
/// use trial_dl::config::FileCollisionAction;
/// use std::path::Path;
///
/// let path = Path::new("/tmp/hearing.mp4");
/// let unique = get_unique_path(path, FileCollisionAction::Rename).unwrap();
/// // If /tmp/hearing.mp4 exists, returns /tmp/hearing (1).mp4
/// ```
pub fn get_unique_path(path: &Path, action: FileCollisionAction) -> Result<PathBuf> {
    match action {
        FileCollisionAction::Overwrite => Ok(path.to_path_buf()),
        FileCollisionAction::Skip => {
            if path.exists() {
                return Err(Error::FileCollision {
                    path: path.to_path_buf(),
                    reason: "File already exists and collision action is Skip".to_string(),
                });
            }
            Ok(path.to_path_buf())
        }
        FileCollisionAction::Rename => {
            if !path.exists() {
                return Ok(path.to_path_buf());
            }

            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| Error::FileCollision {
                    path: path.to_path_buf(),
                    reason: "Cannot extract file stem".to_string(),
                })?;
            let extension = path.extension().and_then(|e| e.to_str());
            let parent = path.parent().ok_or_else(|| Error::FileCollision {
                path: path.to_path_buf(),
                reason: "Cannot extract parent directory".to_string(),
            })?;

            for i in 1..=MAX_RENAME_ATTEMPTS {
                let new_name = match extension {
                    Some(ext) => format!("{} ({}).{}", stem, i, ext),
                    None => format!("{} ({})", stem, i),
                };
                let new_path = parent.join(new_name);
                if !new_path.exists() {
                    return Ok(new_path);
                }
            }

            Err(Error::FileCollision {
                path: path.to_path_buf(),
                reason: format!(
                    "Could not find unique filename after {} attempts",
                    MAX_RENAME_ATTEMPTS
                ),
            })
        }
    }
}

/// Strip characters that are not allowed in file names on common filesystems
///
/// Removes `< > : " / \ | ? *` and ASCII control characters, then trims
/// surrounding whitespace and dots.
///
/// ```
/// use trial_dl::utils::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("张三诉李四: 合同纠纷?"), "张三诉李四 合同纠纷");
/// ```
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .filter(|c| !c.is_ascii_control())
        .collect();
    cleaned.trim().trim_matches('.').trim().to_string()
}

/// Longest prefix of `s` that fits in `max_bytes` without splitting a character
///
/// ```
/// use trial_dl::utils::truncate_on_char_boundary;
///
/// assert_eq!(truncate_on_char_boundary("庭审录像", 7), "庭审");
/// assert_eq!(truncate_on_char_boundary("hearing", 64), "hearing");
/// ```
pub fn truncate_on_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Render an epoch-milliseconds timestamp as `YYYY-MM-DD HH:MM:SS` in portal local time
///
/// Returns `None` for timestamps chrono cannot represent.
pub fn format_epoch_millis(millis: i64) -> Option<String> {
    let offset = FixedOffset::east_opt(PORTAL_UTC_OFFSET_SECS)?;
    offset
        .timestamp_millis_opt(millis)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Sleep for a random duration within `range`; returns immediately for an empty range
pub async fn pause(range: &DelayRange) {
    if range.is_zero() {
        return;
    }
    let delay = if range.min >= range.max {
        range.max
    } else {
        rand::thread_rng().gen_range(range.min..=range.max)
    };
    tokio::time::sleep(delay).await;
}
