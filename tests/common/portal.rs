//! Mock hearing portal and CDN served by wiremock

use std::path::Path;

use trial_dl::Config;
use trial_dl::config::DelayRange;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Cookie every test config carries
pub const TEST_COOKIE: &str = "SESSION=integration";

/// Portal and CDN on one mock server
pub struct MockPortal {
    /// Underlying wiremock server
    pub server: MockServer,
}

impl MockPortal {
    /// Start a portal with no routes mounted
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL of the mock portal
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Session page showing a logged-in user
    pub async fn mount_session_ok(&self) {
        Mock::given(method("GET"))
            .and(path("/u/collect"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<html><h3 id="username">archivist</h3></html>"#),
            )
            .mount(&self.server)
            .await;
    }

    /// Session page without a user (expired cookie)
    pub async fn mount_session_expired(&self) {
        Mock::given(method("GET"))
            .and(path("/u/collect"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&self.server)
            .await;
    }

    /// One region with a single court `code`, expecting `calls` court-list requests
    pub async fn mount_single_court(&self, area_code: &str, code: &str, calls: u64) {
        let body = format!(
            r#"{{"data": {{"courts": [
                {{"courtName": "最高人民法院", "courtCode": "0", "type": 2, "areaName": "云南", "courts": null}},
                {{"courtName": "Court {code}", "courtCode": "{code}", "type": 4, "areaName": "云南", "courts": []}}
            ]}}}}"#
        );
        Mock::given(method("GET"))
            .and(path("/court/courts"))
            .and(query_param("areaCode", area_code))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(calls)
            .mount(&self.server)
            .await;
    }

    /// Listing page `page` of court `code` containing `case_ids`
    pub async fn mount_case_page(&self, code: &str, page: u32, case_ids: &[&str]) {
        let entries: Vec<String> = case_ids
            .iter()
            .map(|id| {
                format!(
                    r#"{{"caseId": "{id}", "caseNo": "No.{id}", "title": "Hearing {id}", "courtName": "Court {code}", "beginTime": 1685586600000}}"#
                )
            })
            .collect();
        Mock::given(method("GET"))
            .and(path("/search/a/revmor/full"))
            .and(query_param("courtCode", code))
            .and(query_param("pageNumber", page.to_string()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!(r#"{{"resultList": [{}]}}"#, entries.join(","))),
            )
            .mount(&self.server)
            .await;
    }

    /// Listing page `page` of court `code` answering with a raw body
    pub async fn mount_listing_reply(&self, code: &str, page: u32, body: &str) {
        Mock::given(method("GET"))
            .and(path("/search/a/revmor/full"))
            .and(query_param("courtCode", code))
            .and(query_param("pageNumber", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
            .mount(&self.server)
            .await;
    }

    /// Play endpoint, player page, playlist and segments for one hearing
    ///
    /// `segments[i]` is served as segment `i + 1`; `None` answers HTTP 500.
    /// The play endpoint must be hit exactly `play_calls` times.
    pub async fn mount_hearing(&self, case_id: &str, segments: &[Option<&str>], play_calls: u64) {
        let scheme_relative = self.uri().trim_start_matches("http:").to_string();

        Mock::given(method("GET"))
            .and(path("/cmn/showPlay"))
            .and(query_param("caseId", case_id))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"{{"data": {{"playUrl": "{scheme_relative}/live/{case_id}"}}}}"#
            )))
            .expect(play_calls)
            .mount(&self.server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("/live/{case_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                "<script>new Player({{ id: 'v', url: '{scheme_relative}/hls/{case_id}/index.m3u8', autoplay: true }});</script>"
            )))
            .mount(&self.server)
            .await;

        let mut playlist = String::from("#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:10\n");
        for index in 1..=segments.len() {
            playlist.push_str(&format!("#EXTINF:10.0,\n{index}.ts\n"));
        }
        playlist.push_str("#EXT-X-ENDLIST\n");

        Mock::given(method("GET"))
            .and(path(format!("/hls/{case_id}/index.m3u8")))
            .respond_with(ResponseTemplate::new(200).set_body_string(playlist))
            .mount(&self.server)
            .await;

        for (i, segment) in segments.iter().enumerate() {
            let response = match segment {
                Some(body) => ResponseTemplate::new(200).set_body_bytes(body.as_bytes().to_vec()),
                None => ResponseTemplate::new(500),
            };
            Mock::given(method("GET"))
                .and(path(format!("/hls/{case_id}/{}.ts", i + 1)))
                .respond_with(response)
                .mount(&self.server)
                .await;
        }
    }
}

/// Configuration pointing at `portal`, writing under `dir`, without politeness delays
pub fn test_config(portal: &MockPortal, dir: &Path) -> Config {
    let mut config = Config::default();
    config.portal.base_url = portal.uri();
    config.portal.cookie = TEST_COOKIE.to_string();
    config.crawl.listing_delay = DelayRange::none();
    config.crawl.play_delay = DelayRange::none();
    config.crawl.save_delay = DelayRange::none();
    config.download.save_dir = dir.join("save_video");
    config.download.workers = 4;
    config.persistence.database_path = dir.join("trial.db");
    config
}
