//! Reassembly of fetched segments into one video file.

use std::path::{Path, PathBuf};

use crate::config::{ArtifactNaming, FileCollisionAction};
use crate::error::{ReassemblyError, Result};
use crate::types::{CaseReference, SegmentResult};
use crate::utils::{get_unique_path, sanitize_file_name, truncate_on_char_boundary};

/// Extension of every written video
const ARTIFACT_EXTENSION: &str = "mp4";

/// Upper bound on a video file name in bytes
///
/// Leaves room under the common 255-byte limit for the `.part` suffix and a
/// ` (n)` collision counter.
const MAX_FILE_NAME_BYTES: usize = 240;

/// Suffix of the temporary file a video is written to before it is renamed
const PARTIAL_SUFFIX: &str = ".part";

/// Concatenate segment payloads in ascending index order
///
/// The results must cover `1..=expected_total` exactly once each; completion
/// order does not matter.
pub fn assemble(
    mut results: Vec<SegmentResult>,
    expected_total: usize,
) -> std::result::Result<Vec<u8>, ReassemblyError> {
    results.sort_unstable_by_key(|r| r.sequence_index);

    if let Some(stray) = results
        .iter()
        .find(|r| r.sequence_index == 0 || r.sequence_index as usize > expected_total)
    {
        return Err(ReassemblyError::UnexpectedIndex {
            index: stray.sequence_index,
            total: expected_total,
        });
    }

    if let Some(pair) = results
        .windows(2)
        .find(|pair| pair[0].sequence_index == pair[1].sequence_index)
    {
        return Err(ReassemblyError::DuplicateIndex {
            index: pair[0].sequence_index,
        });
    }

    // indices are now distinct and in range, so a short set has a hole
    if results.len() < expected_total {
        let index = results
            .iter()
            .zip(1u32..)
            .find(|(r, expected)| r.sequence_index != *expected)
            .map(|(_, expected)| expected)
            .unwrap_or(results.len() as u32 + 1);
        return Err(ReassemblyError::MissingIndex { index });
    }

    let size = results.iter().map(|r| r.payload.len()).sum();
    let mut video = Vec::with_capacity(size);
    for result in results {
        video.extend_from_slice(&result.payload);
    }
    Ok(video)
}

/// File name for a case's video
///
/// Uses the sanitized hearing title, optionally suffixed with `_<caseId>`, and
/// falls back to the case id when the title is empty after sanitizing. Long
/// titles are cut on a character boundary so the name stays within 240 bytes.
///
/// # Examples
///
/// ```
/// use trial_dl::assembler::artifact_file_name;
/// use trial_dl::config::ArtifactNaming;
/// use trial_dl::types::CaseReference;
///
/// let mut case = CaseReference::from_id("C100");
/// case.case_title = "张某诉李某: 合同纠纷".to_string();
/// assert_eq!(
///     artifact_file_name(&case, &ArtifactNaming::default()),
///     "张某诉李某 合同纠纷.mp4"
/// );
/// ```
pub fn artifact_file_name(case: &CaseReference, naming: &ArtifactNaming) -> String {
    let prefix = sanitize_file_name(&naming.prefix);
    let case_id = match sanitize_file_name(case.case_id.as_str()) {
        id if id.is_empty() => "hearing".to_string(),
        id => id,
    };

    let mut reserved = prefix.len() + ARTIFACT_EXTENSION.len() + 1;
    if naming.append_case_id {
        reserved += case_id.len() + 1;
    }
    let title = sanitize_file_name(&case.case_title);
    let title = truncate_on_char_boundary(&title, MAX_FILE_NAME_BYTES.saturating_sub(reserved))
        .trim_end()
        .trim_end_matches('.')
        .to_string();

    let stem = if title.is_empty() {
        case_id
    } else if naming.append_case_id {
        format!("{title}_{case_id}")
    } else {
        title
    };

    format!("{prefix}{stem}.{ARTIFACT_EXTENSION}")
}

/// Write a video under `dir`, returning the final path
///
/// Bytes go to a `.part` file first and are renamed into place, so a partial
/// video is never visible under its final name.
pub async fn write_artifact(
    dir: &Path,
    file_name: &str,
    bytes: &[u8],
    collision: FileCollisionAction,
) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    let path = get_unique_path(&dir.join(file_name), collision)?;
    let mut partial = path.clone().into_os_string();
    partial.push(PARTIAL_SUFFIX);
    let partial = PathBuf::from(partial);

    if let Err(e) = tokio::fs::write(&partial, bytes).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e.into());
    }
    if let Err(e) = tokio::fs::rename(&partial, &path).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e.into());
    }

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "Wrote video");
    Ok(path)
}
