//! Paged hearing listing for a court.

use serde::Deserialize;

use super::{PortalClient, lenient};
use crate::error::{Error, Result};
use crate::types::{CaseId, CaseReference, CourtInfo};
use crate::utils::format_epoch_millis;

const CASES_PATH: &str = "/search/a/revmor/full";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CasesResponse {
    // required but nullable: an error envelope without the field is not an empty page
    #[serde(deserialize_with = "Option::deserialize")]
    result_list: Option<Vec<CaseEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaseEntry {
    #[serde(deserialize_with = "lenient::string")]
    case_id: String,
    #[serde(default)]
    case_no: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    court_name: Option<String>,
    #[serde(default, deserialize_with = "optional_millis")]
    begin_time: Option<i64>,
}

fn optional_millis<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "lenient::int")] i64);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(millis)| millis))
}

impl From<CaseEntry> for CaseReference {
    fn from(entry: CaseEntry) -> Self {
        CaseReference {
            case_id: CaseId::new(entry.case_id),
            case_title: entry.title.unwrap_or_default(),
            case_no: entry.case_no.unwrap_or_default(),
            court_name: entry.court_name.unwrap_or_default(),
            publish_time: entry
                .begin_time
                .and_then(format_epoch_millis)
                .unwrap_or_default(),
        }
    }
}

/// Parse a case listing body
///
/// A null `resultList` is an empty page. A body without the field (an error
/// envelope or an expired-session reply) is an [`Error::Listing`].
pub fn parse_case_listing(body: &str) -> Result<Vec<CaseReference>> {
    let response: CasesResponse = serde_json::from_str(body)
        .map_err(|e| Error::Listing(format!("case listing returned unexpected JSON: {e}")))?;
    Ok(into_references(response))
}

fn into_references(response: CasesResponse) -> Vec<CaseReference> {
    response
        .result_list
        .unwrap_or_default()
        .into_iter()
        .map(CaseReference::from)
        .collect()
}

fn listing_query(court: &CourtInfo, page: u32, page_size: usize) -> Vec<(&'static str, String)> {
    vec![
        ("unUnionIds", String::new()),
        ("label", String::new()),
        ("courtCode", court.court_code.clone()),
        ("catalogId", String::new()),
        ("pageNumber", page.to_string()),
        ("courtLevel", court.court_level.to_string()),
        ("dataType", "2".to_string()),
        ("pageSize", page_size.to_string()),
        ("level", "0".to_string()),
        ("extType", String::new()),
        ("isOts", String::new()),
        ("timeFlag", "0".to_string()),
        ("keywords", String::new()),
    ]
}

pub(super) async fn list_cases(
    client: &PortalClient,
    court: &CourtInfo,
    page: u32,
    page_size: usize,
) -> Result<Vec<CaseReference>> {
    tracing::info!(court = %court.court_name, page, "Fetching case listing page");

    let response: CasesResponse = client
        .get_json(CASES_PATH, &listing_query(court, page, page_size))
        .await?;
    Ok(into_references(response))
}
