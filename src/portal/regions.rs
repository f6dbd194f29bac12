//! Region names and area codes.
//!
//! The portal's map widget ships a script with one object per region,
//! carrying `areaName:"..."` and `post:"..."` fields. The `post` value is the
//! area code the court listing expects.

use regex::Regex;
use url::Url;

use super::PortalClient;
use crate::error::{Error, Result};
use crate::types::Region;

/// Regions present in the map data whose courts are not on the portal
const EXCLUDED_REGIONS: [&str; 3] = ["香港", "台湾", "澳门"];

/// Pair region names with their area codes and drop excluded regions
///
/// Names and codes are paired in document order before filtering so that an
/// excluded region never shifts the codes of the regions after it.
pub fn parse_region_script(script: &str) -> Vec<Region> {
    let (Ok(names), Ok(codes)) = (
        Regex::new(r#"areaName:"(.*?)","#),
        Regex::new(r#"post:"(.*?)""#),
    ) else {
        return Vec::new();
    };

    names
        .captures_iter(script)
        .zip(codes.captures_iter(script))
        .map(|(name, code)| Region {
            name: name[1].to_string(),
            code: code[1].to_string(),
        })
        .filter(|region| !EXCLUDED_REGIONS.contains(&region.name.as_str()))
        .collect()
}

/// Fetch the map-data script and return the crawlable regions
pub async fn list_regions(client: &PortalClient) -> Result<Vec<Region>> {
    let url = Url::parse(&client.config().region_map_url).map_err(|e| Error::Config {
        message: format!("invalid region map URL: {e}"),
        key: Some("portal.region_map_url".to_string()),
    })?;

    let script = client
        .fetch_text(&url)
        .await
        .map_err(|e| Error::Listing(format!("failed to fetch region map: {e}")))?;

    let regions = parse_region_script(&script);
    if regions.is_empty() {
        return Err(Error::Listing(
            "region map contained no area codes".to_string(),
        ));
    }

    tracing::info!(regions = regions.len(), "Loaded region list");
    Ok(regions)
}
