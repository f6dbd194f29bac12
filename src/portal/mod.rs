//! HTTP adapter for the hearing portal.
//!
//! [`PortalClient`] owns the session cookie and header set; nothing here keeps
//! process-wide state. The crawl driver only sees the [`CaseListing`] trait so
//! it can be exercised without a network.
//!
//! - [`session`] - cookie validity check
//! - [`courts`] - court listing for a region
//! - [`cases`] - paged hearing listing for a court
//! - [`playback`] - play URL, player document and manifest retrieval
//! - [`regions`] - region names and area codes

use rand::seq::SliceRandom;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::PortalConfig;
use crate::error::{Error, Result};
use crate::types::{CaseReference, CourtInfo};

mod cases;
mod courts;
mod playback;
pub mod regions;
mod session;

pub use cases::parse_case_listing;
pub use courts::{CourtEntry, flatten_courts, parse_court_listing};

/// Listing side of the portal as seen by the crawl driver
#[async_trait::async_trait]
pub trait CaseListing: Send + Sync {
    /// Fail with [`crate::error::AuthError`] unless the session is usable
    async fn check_session(&self) -> Result<()>;

    /// Courts of a region, flattened to the lowest level that publishes hearings
    async fn list_courts(&self, area_code: &str) -> Result<Vec<CourtInfo>>;

    /// One page (1-based) of a court's hearings
    async fn list_cases(
        &self,
        court: &CourtInfo,
        page: u32,
        page_size: usize,
    ) -> Result<Vec<CaseReference>>;
}

/// Client for the portal's JSON and HTML endpoints
#[derive(Clone)]
pub struct PortalClient {
    http: reqwest::Client,
    base_url: Url,
    config: PortalConfig,
}

impl PortalClient {
    /// Build a client from an explicit portal configuration
    pub fn new(config: PortalConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| Error::Config {
            message: format!("invalid portal base URL {:?}: {}", config.base_url, e),
            key: Some("portal.base_url".to_string()),
        })?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .default_headers(default_headers(&config)?)
            .build()?;

        Ok(Self {
            http,
            base_url,
            config,
        })
    }

    /// The configuration this client was built from
    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    /// Base URL every portal path is resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a portal path such as `/court/courts` against the base URL
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| Error::Config {
            message: format!("cannot join {path:?} onto base URL: {e}"),
            key: Some("portal.base_url".to_string()),
        })
    }

    /// Start a GET request with a randomly picked user agent
    pub(crate) fn get(&self, url: Url) -> reqwest::RequestBuilder {
        let request = self.http.get(url);
        match self.config.user_agents.choose(&mut rand::thread_rng()) {
            Some(agent) => request.header(header::USER_AGENT, agent),
            None => request,
        }
    }

    /// GET a JSON endpoint and decode it, mapping every failure to [`Error::Listing`]
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        let response = self
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Listing(format!("request to {path} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Listing(format!("{path} returned HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Listing(format!("reading {path} response failed: {e}")))?;
        serde_json::from_str(&body)
            .map_err(|e| Error::Listing(format!("{path} returned unexpected JSON: {e}")))
    }
}

#[async_trait::async_trait]
impl CaseListing for PortalClient {
    async fn check_session(&self) -> Result<()> {
        session::check_session(self).await
    }

    async fn list_courts(&self, area_code: &str) -> Result<Vec<CourtInfo>> {
        courts::list_courts(self, area_code).await
    }

    async fn list_cases(
        &self,
        court: &CourtInfo,
        page: u32,
        page_size: usize,
    ) -> Result<Vec<CaseReference>> {
        cases::list_cases(self, court, page, page_size).await
    }
}

/// Header set sent with every portal request (user agent is added per request)
fn default_headers(config: &PortalConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-CN,zh;q=0.9"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(
        HeaderName::from_static("x-requested-with"),
        HeaderValue::from_static("XMLHttpRequest"),
    );

    if !config.referer.is_empty() {
        let referer = HeaderValue::from_str(&config.referer).map_err(|e| Error::Config {
            message: format!("referer is not a valid header value: {e}"),
            key: Some("portal.referer".to_string()),
        })?;
        headers.insert(header::REFERER, referer);
    }

    if !config.cookie.is_empty() {
        let mut cookie = HeaderValue::from_str(config.cookie.trim()).map_err(|e| Error::Config {
            message: format!("cookie is not a valid header value: {e}"),
            key: Some("portal.cookie".to_string()),
        })?;
        cookie.set_sensitive(true);
        headers.insert(header::COOKIE, cookie);
    }

    Ok(headers)
}

/// Serde helpers for fields the portal sends as either strings or numbers
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Str(String),
    }

    /// Accept `"123"` or `123`, yielding a string
    pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => n.to_string(),
            Raw::Float(f) => f.to_string(),
            Raw::Str(s) => s,
        })
    }

    /// Accept `"123"` or `123`, yielding an integer
    pub fn int<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(deserializer)? {
            Raw::Int(n) => Ok(n),
            Raw::Float(f) => Ok(f as i64),
            Raw::Str(s) => s
                .trim()
                .parse()
                .map_err(|_| D::Error::custom(format!("expected an integer, got {s:?}"))),
        }
    }
}
