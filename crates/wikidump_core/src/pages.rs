use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::client::WikiTransport;
use crate::error::{WikiError, WikiResult};

/// A rendered page, built by [`fetch_page`] and persisted right away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub title: String,
    pub page_id: Option<i64>,
    pub url: String,
    pub raw_html: String,
    pub display_title: String,
}

/// True iff the wiki marks `title` as a redirect. Any failure counts as "not a
/// redirect" so a flaky info call never blocks a download.
pub fn is_redirect<A: WikiTransport>(api: &mut A, title: &str) -> bool {
    let response = api.get_json(&[
        ("action", "query".to_string()),
        ("titles", title.to_string()),
        ("prop", "info".to_string()),
    ]);
    let payload = match response {
        Ok(payload) => payload,
        Err(error) => {
            debug!(title, %error, "redirect check failed; assuming not a redirect");
            return false;
        }
    };

    match serde_json::from_value::<InfoResponse>(payload) {
        Ok(parsed) => parsed
            .query
            .pages
            .first()
            .is_some_and(|page| page.get("redirect").is_some()),
        Err(error) => {
            debug!(title, %error, "unexpected info payload; assuming not a redirect");
            false
        }
    }
}

/// Render `title` through `action=parse`, then look up its canonical URL.
pub fn fetch_page<A: WikiTransport>(api: &mut A, title: &str) -> WikiResult<PageRecord> {
    let response = api.get_json(&[
        ("action", "parse".to_string()),
        ("page", title.to_string()),
        ("prop", "text|displaytitle".to_string()),
    ])?;
    let parsed: ParseResponse = serde_json::from_value(response)?;
    let parse = parsed
        .parse
        .filter(|payload| !payload.is_empty())
        .ok_or_else(|| WikiError::NotFound {
            title: title.to_string(),
        })?;

    let info_response = api.get_json(&[
        ("action", "query".to_string()),
        ("prop", "info".to_string()),
        ("titles", title.to_string()),
        ("inprop", "url".to_string()),
    ])?;
    let info: InfoResponse = serde_json::from_value(info_response)?;
    let url = info
        .query
        .pages
        .first()
        .and_then(|page| page.get("fullurl"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let canonical_title = parse.title.unwrap_or_else(|| title.to_string());
    Ok(PageRecord {
        display_title: parse
            .displaytitle
            .unwrap_or_else(|| canonical_title.clone()),
        title: canonical_title,
        page_id: parse.pageid,
        url,
        raw_html: parse.text.unwrap_or_default(),
    })
}

#[derive(Debug, Deserialize, Default)]
struct InfoResponse {
    #[serde(default)]
    query: InfoPayload,
}

#[derive(Debug, Deserialize, Default)]
struct InfoPayload {
    #[serde(default)]
    pages: Vec<serde_json::Map<String, Value>>,
}

#[derive(Debug, Deserialize, Default)]
struct ParseResponse {
    parse: Option<ParsePayload>,
}

#[derive(Debug, Deserialize, Default)]
struct ParsePayload {
    title: Option<String>,
    pageid: Option<i64>,
    text: Option<String>,
    displaytitle: Option<String>,
}

impl ParsePayload {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.pageid.is_none()
            && self.text.is_none()
            && self.displaytitle.is_none()
    }
}
