use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::{Client, Request};
use reqwest::header::USER_AGENT;
use serde_json::Value;
use tracing::debug;

use crate::config::DownloaderConfig;
use crate::error::{WikiError, WikiResult};

/// One GET against `api.php`. `format=json` and `formatversion=2` are added by
/// the implementation; callers only pass action parameters.
pub trait WikiTransport {
    fn get_json(&mut self, params: &[(&str, String)]) -> WikiResult<Value>;
    fn request_count(&self) -> usize;
}

pub struct MediaWikiClient {
    client: Client,
    api_url: Url,
    user_agent: String,
    request_count: usize,
}

impl MediaWikiClient {
    pub fn new(wiki_url: &str, config: &DownloaderConfig) -> WikiResult<Self> {
        let api_url = api_url_from_wiki_url(wiki_url)?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            api_url,
            user_agent: config.user_agent.clone(),
            request_count: 0,
        })
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// The GET that [`WikiTransport::get_json`] sends for `params`.
    pub fn build_request(&self, params: &[(&str, String)]) -> WikiResult<Request> {
        let request = self
            .client
            .get(self.api_url.clone())
            .header(USER_AGENT, self.user_agent.as_str())
            .query(&request_pairs(params))
            .build()?;
        Ok(request)
    }
}

impl WikiTransport for MediaWikiClient {
    fn get_json(&mut self, params: &[(&str, String)]) -> WikiResult<Value> {
        let request = self.build_request(params)?;
        self.request_count += 1;
        debug!(url = %request.url(), "requesting MediaWiki API");
        let response = self.client.execute(request)?;

        let status = response.status().as_u16();
        let body = response.text()?;
        decode_response(status, &body)
    }

    fn request_count(&self) -> usize {
        self.request_count
    }
}

/// Query pairs for one API call: the JSON format switches first, then the
/// caller's parameters in order.
pub fn request_pairs(params: &[(&str, String)]) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(params.len() + 2);
    pairs.push(("format".to_string(), "json".to_string()));
    pairs.push(("formatversion".to_string(), "2".to_string()));
    for (key, value) in params {
        pairs.push(((*key).to_string(), value.clone()));
    }
    pairs
}

/// Join `api.php` onto a wiki base URL, keeping any subdirectory
/// (`https://host/w` becomes `https://host/w/api.php`).
pub fn api_url_from_wiki_url(wiki_url: &str) -> WikiResult<Url> {
    let invalid = |reason: String| WikiError::InvalidUrl {
        url: wiki_url.to_string(),
        reason,
    };

    let mut base = Url::parse(wiki_url.trim()).map_err(|error| invalid(error.to_string()))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", base.scheme())));
    }
    if base.path().ends_with("api.php") {
        return Ok(base);
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("api.php")
        .map_err(|error| invalid(error.to_string()))
}

/// Classify a raw API response: non-200 status, malformed JSON, then an
/// `error` object in the payload.
pub fn decode_response(status: u16, body: &str) -> WikiResult<Value> {
    if status != 200 {
        return Err(WikiError::http_status(status, body));
    }

    let payload: Value = serde_json::from_str(body)?;
    if let Some(error) = payload.get("error") {
        let code = error
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error");
        let info = error
            .get("info")
            .and_then(Value::as_str)
            .unwrap_or("unknown info");
        return Err(WikiError::Api {
            code: code.to_string(),
            info: info.to_string(),
        });
    }
    Ok(payload)
}
