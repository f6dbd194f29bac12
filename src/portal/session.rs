//! Session cookie check.

use scraper::{Html, Selector};

use super::PortalClient;
use crate::error::{AuthError, Error, Result};

/// Page that shows the logged-in user's name when the cookie is valid
const SESSION_CHECK_PATH: &str = "/u/collect";

pub(super) async fn check_session(client: &PortalClient) -> Result<()> {
    if client.config().cookie.trim().is_empty() {
        return Err(AuthError::MissingCookie.into());
    }

    let url = client.endpoint(SESSION_CHECK_PATH)?;
    let response = client.get(url).send().await?;

    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(AuthError::Rejected {
            status: status.as_u16(),
        }
        .into());
    }
    if !status.is_success() {
        return Err(Error::Listing(format!(
            "session check returned HTTP {status}"
        )));
    }

    let body = response.text().await?;
    match logged_in_user(&body) {
        Some(user) => {
            tracing::info!(user = %user, "Portal session is valid");
            Ok(())
        }
        None => {
            tracing::error!("Portal session cookie has expired, refresh it before rerunning");
            Err(AuthError::SessionExpired.into())
        }
    }
}

/// Text of `h3#username`, if the page shows one
pub(crate) fn logged_in_user(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("h3#username").ok()?;
    document
        .select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .find(|name| !name.is_empty())
}
