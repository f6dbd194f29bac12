//! Single-segment retrieval.

use std::time::Duration;

use reqwest::header;

use crate::error::{Error, FetchError};
use crate::types::{SegmentResult, SegmentTask};

/// Largest up-front allocation made from an advertised Content-Length
const MAX_PREALLOCATION: u64 = 16 * 1024 * 1024;

/// Retrieves the bytes of one segment
///
/// One call is one attempt; there is no retry. Implementations must not touch
/// state shared with other fetches.
#[async_trait::async_trait]
pub trait SegmentFetcher: Send + Sync {
    /// Fetch one segment, consuming its task
    async fn fetch(&self, task: SegmentTask) -> Result<SegmentResult, FetchError>;
}

/// HTTP fetcher that streams the body chunk by chunk
#[derive(Clone)]
pub struct HttpSegmentFetcher {
    http: reqwest::Client,
}

impl HttpSegmentFetcher {
    /// Build a fetcher with a per-request timeout and a fixed user agent
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> crate::error::Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if let Some(agent) = user_agent {
            let value = header::HeaderValue::from_str(agent).map_err(|e| Error::Config {
                message: format!("user agent is not a valid header value: {e}"),
                key: Some("portal.user_agents".to_string()),
            })?;
            let mut headers = header::HeaderMap::new();
            headers.insert(header::USER_AGENT, value);
            builder = builder.default_headers(headers);
        }
        Ok(Self {
            http: builder.build()?,
        })
    }
}

#[async_trait::async_trait]
impl SegmentFetcher for HttpSegmentFetcher {
    async fn fetch(&self, task: SegmentTask) -> Result<SegmentResult, FetchError> {
        let index = task.sequence_index;

        let mut response =
            self.http
                .get(task.locator)
                .send()
                .await
                .map_err(|e| FetchError::Request {
                    index,
                    message: e.to_string(),
                })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                index,
                status: status.as_u16(),
            });
        }

        let expected = response.content_length();
        let mut payload =
            Vec::with_capacity(expected.unwrap_or(0).min(MAX_PREALLOCATION) as usize);

        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => payload.extend_from_slice(&chunk),
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(
                        sequence_index = index,
                        received = payload.len(),
                        error = %e,
                        "Segment stream broke mid-transfer"
                    );
                    return Err(FetchError::Incomplete {
                        index,
                        received: payload.len() as u64,
                        expected,
                    });
                }
            }
        }

        let received = payload.len() as u64;
        if let Some(expected_len) = expected
            && received < expected_len
        {
            return Err(FetchError::Incomplete {
                index,
                received,
                expected,
            });
        }

        tracing::trace!(sequence_index = index, bytes = received, "Fetched segment");
        Ok(SegmentResult {
            sequence_index: index,
            payload,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;
    use wiremock::matchers::{header as header_matcher, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpSegmentFetcher {
        HttpSegmentFetcher::new(Duration::from_secs(5), Some("trial-dl-test")).unwrap()
    }

    fn task(index: u32, url: &str) -> SegmentTask {
        SegmentTask {
            sequence_index: index,
            locator: Url::parse(url).unwrap(),
        }
    }

    #[tokio::test]
    async fn fetch_returns_full_body_with_index() {
        let server = MockServer::start().await;
        let body = vec![7u8; 64 * 1024];
        Mock::given(method("GET"))
            .and(path("/seg-4.ts"))
            .and(header_matcher("User-Agent", "trial-dl-test"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let result = fetcher()
            .fetch(task(4, &format!("{}/seg-4.ts", server.uri())))
            .await
            .unwrap();

        assert_eq!(result.sequence_index, 4);
        assert_eq!(result.payload, body);
    }

    #[tokio::test]
    async fn fetch_reports_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/seg-2.ts"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(task(2, &format!("{}/seg-2.ts", server.uri())))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status { index: 2, status: 404 }));
    }

    #[tokio::test]
    async fn fetch_reports_connection_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = fetcher()
            .fetch(task(9, &format!("http://{addr}/seg-9.ts")))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Request { index: 9, .. }));
        assert_eq!(err.index(), 9);
    }

    #[tokio::test]
    async fn fetch_times_out_as_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![1u8; 16])
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let fetcher = HttpSegmentFetcher::new(Duration::from_millis(200), None).unwrap();
        let err = fetcher
            .fetch(task(1, &format!("{}/slow.ts", server.uri())))
            .await
            .unwrap_err();

        assert_eq!(err.index(), 1);
    }
}
