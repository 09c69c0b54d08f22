use std::collections::BTreeMap;
use std::thread::sleep;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::client::WikiTransport;
use crate::error::WikiResult;

/// Most titles the list APIs hand out per request.
pub const MAX_BATCH: usize = 500;

const CATEGORY_PREFIX: &str = "Category:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSource {
    AllPages,
    Category(String),
}

impl PageSource {
    pub fn from_category(category: Option<&str>) -> Self {
        match category.map(str::trim) {
            Some(name) if !name.is_empty() => Self::Category(name.to_string()),
            _ => Self::AllPages,
        }
    }

    fn list_name(&self) -> &'static str {
        match self {
            Self::AllPages => "allpages",
            Self::Category(_) => "categorymembers",
        }
    }

    fn base_params(&self, batch: usize) -> Vec<(&'static str, String)> {
        match self {
            Self::AllPages => vec![
                ("action", "query".to_string()),
                ("list", "allpages".to_string()),
                ("aplimit", batch.to_string()),
            ],
            Self::Category(name) => vec![
                ("action", "query".to_string()),
                ("list", "categorymembers".to_string()),
                ("cmtitle", category_title(name)),
                ("cmtype", "page".to_string()),
                ("cmlimit", batch.to_string()),
            ],
        }
    }
}

/// Continuation key/value set echoed back under `continue`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationCursor(BTreeMap<String, String>);

impl PaginationCursor {
    fn from_payload(payload: Map<String, Value>) -> Option<Self> {
        let values = payload
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(text) => text,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect::<BTreeMap<_, _>>();
        if values.is_empty() {
            None
        } else {
            Some(Self(values))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// Walk a paged list API until `limit` titles are collected or the API stops
/// returning a continuation. Returns at most `limit` titles in API order.
pub fn list_titles<A: WikiTransport>(
    api: &mut A,
    source: &PageSource,
    limit: usize,
    delay: Duration,
) -> WikiResult<Vec<String>> {
    let mut titles = Vec::new();
    let mut cursor: Option<PaginationCursor> = None;
    let batch = limit.min(MAX_BATCH);

    while titles.len() < limit {
        let response = {
            let mut params: Vec<(&str, String)> = source.base_params(batch);
            if let Some(cursor) = &cursor {
                for (key, value) in cursor.iter() {
                    params.retain(|(existing, _)| *existing != key);
                    params.push((key, value.to_string()));
                }
            }
            api.get_json(&params)?
        };
        let parsed: ListResponse = serde_json::from_value(response)?;
        let items = match source {
            PageSource::AllPages => parsed.query.allpages,
            PageSource::Category(_) => parsed.query.categorymembers,
        };
        debug!(list = source.list_name(), received = items.len(), "list batch");
        for item in items {
            if titles.len() >= limit {
                break;
            }
            titles.push(item.title);
        }

        cursor = parsed.continuation.and_then(PaginationCursor::from_payload);
        if cursor.is_none() || titles.len() >= limit {
            break;
        }
        sleep(delay);
    }

    info!(list = source.list_name(), collected = titles.len(), "listing finished");
    Ok(titles)
}

pub fn list_all_pages<A: WikiTransport>(
    api: &mut A,
    limit: usize,
    delay: Duration,
) -> WikiResult<Vec<String>> {
    list_titles(api, &PageSource::AllPages, limit, delay)
}

pub fn list_category_members<A: WikiTransport>(
    api: &mut A,
    category: &str,
    limit: usize,
    delay: Duration,
) -> WikiResult<Vec<String>> {
    list_titles(api, &PageSource::Category(category.to_string()), limit, delay)
}

fn category_title(name: &str) -> String {
    if name.starts_with(CATEGORY_PREFIX) {
        name.to_string()
    } else {
        format!("{CATEGORY_PREFIX}{name}")
    }
}

#[derive(Debug, Deserialize, Default)]
struct ListResponse {
    #[serde(default)]
    query: ListPayload,
    #[serde(default, rename = "continue")]
    continuation: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize, Default)]
struct ListPayload {
    #[serde(default)]
    allpages: Vec<TitleItem>,
    #[serde(default)]
    categorymembers: Vec<TitleItem>,
}

#[derive(Debug, Deserialize)]
struct TitleItem {
    title: String,
}
