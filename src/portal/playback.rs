//! Play locator, player document and manifest retrieval.

use serde::Deserialize;
use url::Url;

use super::PortalClient;
use crate::error::ResolveError;
use crate::types::CaseId;

const SHOW_PLAY_PATH: &str = "/cmn/showPlay";

#[derive(Debug, Deserialize)]
struct ShowPlayResponse {
    data: Option<ShowPlayData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShowPlayData {
    #[serde(default)]
    play_url: Option<String>,
}

fn request_error(url: &Url, err: impl std::fmt::Display) -> ResolveError {
    ResolveError::Request {
        url: url.to_string(),
        message: err.to_string(),
    }
}

impl PortalClient {
    /// Raw play URL for a case as returned by the portal (often scheme-relative)
    pub async fn play_url(&self, case_id: &CaseId) -> Result<String, ResolveError> {
        let url = self.endpoint(SHOW_PLAY_PATH).map_err(|e| ResolveError::Request {
            url: SHOW_PLAY_PATH.to_string(),
            message: e.to_string(),
        })?;

        let response = self
            .get(url.clone())
            .query(&[("caseId", case_id.as_str())])
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(request_error(&url, format!("HTTP {status}")));
        }

        let body: ShowPlayResponse = response.json().await.map_err(|e| request_error(&url, e))?;

        body.data
            .and_then(|d| d.play_url)
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ResolveError::PlayLocatorMissing {
                case_id: case_id.clone(),
            })
    }

    /// GET a document (player page or manifest) as text
    pub async fn fetch_text(&self, url: &Url) -> Result<String, ResolveError> {
        let response = self
            .get(url.clone())
            .send()
            .await
            .map_err(|e| request_error(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(request_error(url, format!("HTTP {status}")));
        }
        response.text().await.map_err(|e| request_error(url, e))
    }
}
