//! Court listing for a region.

use serde::Deserialize;

use super::{PortalClient, lenient};
use crate::error::{Error, Result};
use crate::types::CourtInfo;

const COURTS_PATH: &str = "/court/courts";

/// Court type the portal uses for the supreme court, which publishes no regional hearings
const SUPREME_COURT_TYPE: i64 = 2;

#[derive(Debug, Deserialize)]
struct CourtsResponse {
    data: Option<CourtsData>,
}

#[derive(Debug, Deserialize)]
struct CourtsData {
    #[serde(default)]
    courts: Option<Vec<CourtEntry>>,
}

/// One court as returned by `/court/courts`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourtEntry {
    /// Display name
    pub court_name: String,
    /// Court code
    #[serde(deserialize_with = "lenient::string")]
    pub court_code: String,
    /// Portal court type; the listing level is `type - 1`
    #[serde(rename = "type", deserialize_with = "lenient::int")]
    pub court_type: i64,
    /// Region name the court belongs to
    #[serde(default)]
    pub area_name: Option<String>,
    /// Lower-level courts under this one
    #[serde(default)]
    pub courts: Option<Vec<CourtEntry>>,
}

impl CourtEntry {
    fn to_info(&self) -> CourtInfo {
        CourtInfo {
            court_name: self.court_name.clone(),
            court_code: self.court_code.clone(),
            court_level: (self.court_type - 1) as i32,
        }
    }
}

/// Parse a `/court/courts` response body into its top-level entries
pub fn parse_court_listing(body: &str) -> Result<Vec<CourtEntry>> {
    let response: CourtsResponse = serde_json::from_str(body)
        .map_err(|e| Error::Listing(format!("court listing returned unexpected JSON: {e}")))?;
    Ok(response.data.and_then(|d| d.courts).unwrap_or_default())
}

/// Reduce the court tree to the courts whose hearings are listed
///
/// Supreme-court entries are dropped. A court with sub-courts is replaced by
/// them; a court without any is kept itself.
pub fn flatten_courts(entries: &[CourtEntry]) -> Vec<CourtInfo> {
    entries
        .iter()
        .filter(|court| court.court_type != SUPREME_COURT_TYPE)
        .flat_map(|court| match court.courts.as_deref() {
            Some(children) if !children.is_empty() => {
                children.iter().map(CourtEntry::to_info).collect()
            }
            _ => vec![court.to_info()],
        })
        .collect()
}

pub(super) async fn list_courts(client: &PortalClient, area_code: &str) -> Result<Vec<CourtInfo>> {
    let response: CourtsResponse = client
        .get_json(COURTS_PATH, &[("areaCode", area_code.to_string())])
        .await?;
    let entries = response.data.and_then(|d| d.courts).unwrap_or_default();

    let courts = flatten_courts(&entries);
    let area_name = entries
        .first()
        .and_then(|c| c.area_name.as_deref())
        .unwrap_or(area_code);
    tracing::info!(area = %area_name, courts = courts.len(), "Resolved court list");

    Ok(courts)
}
