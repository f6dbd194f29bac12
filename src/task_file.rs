//! Explicit case-id input.
//!
//! A task file is an Excel workbook (`.xlsx`, `.xls`, `.ods`) or a CSV/plain
//! text export with one hearing per row. Only the first column is read (the
//! first sheet for workbooks); it holds either a bare case id or a hearing page
//! URL whose last path segment is the id. A first row without any digit is a
//! column header and is ignored.

use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader};

use crate::error::{Error, Result};
use crate::types::CaseId;

/// Placeholder spreadsheet exports write into empty cells
const EMPTY_CELL: &str = "nan";

/// Leading bytes of zip-based (xlsx, ods) and OLE (xls) workbooks
const WORKBOOK_MAGIC: [&[u8]; 2] = [b"PK\x03\x04", b"\xD0\xCF\x11\xE0"];

/// Extract case ids from first-column cells, keeping first-seen order
pub fn case_ids_from_cells<I, S>(cells: I) -> Vec<CaseId>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();

    cells
        .into_iter()
        .enumerate()
        .filter_map(|(row, cell)| {
            let cell = cell.as_ref().trim();
            if row == 0 && !cell.chars().any(|c| c.is_ascii_digit()) {
                return None;
            }
            case_id_from_cell(cell)
        })
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Extract case ids from CSV or plain-text task file contents
pub fn parse_task_list(contents: &str) -> std::result::Result<Vec<CaseId>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(contents.trim_start_matches('\u{feff}').as_bytes());

    let cells = reader
        .records()
        .map(|record| record.map(|r| r.get(0).unwrap_or_default().to_string()))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(case_ids_from_cells(cells))
}

/// Read a task file from disk, detecting workbooks by their content
pub async fn read_task_file(path: &Path) -> Result<Vec<CaseId>> {
    let invalid = |reason: String| Error::InvalidTaskFile {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| invalid(e.to_string()))?;

    let ids = if WORKBOOK_MAGIC.iter().any(|magic| bytes.starts_with(magic)) {
        let cells = tokio::task::spawn_blocking(move || workbook_first_column(bytes))
            .await
            .map_err(|e| invalid(e.to_string()))?
            .map_err(|e| invalid(e.to_string()))?;
        case_ids_from_cells(cells)
    } else {
        let contents = String::from_utf8(bytes).map_err(|e| invalid(e.to_string()))?;
        parse_task_list(&contents).map_err(|e| invalid(e.to_string()))?
    };

    if ids.is_empty() {
        return Err(invalid("no case ids found".to_string()));
    }

    for id in &ids {
        tracing::debug!(case_id = %id, "Queued case from task file");
    }
    tracing::info!(path = %path.display(), cases = ids.len(), "Loaded task file");
    Ok(ids)
}

/// First column of the first sheet, one string per row
fn workbook_first_column(bytes: Vec<u8>) -> std::result::Result<Vec<String>, calamine::Error> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(calamine::Error::Msg("workbook has no sheets"))??;

    Ok(range
        .rows()
        .map(|row| row.first().map(cell_text).unwrap_or_default())
        .collect())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        // numeric ids come back as floats
        Data::Float(f) if f.fract() == 0.0 => format!("{f:.0}"),
        other => other.to_string(),
    }
}

fn case_id_from_cell(cell: &str) -> Option<CaseId> {
    if cell.is_empty() || cell.eq_ignore_ascii_case(EMPTY_CELL) {
        return None;
    }
    let path = cell.split(['?', '#']).next().unwrap_or_default();
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(CaseId::from)
}
