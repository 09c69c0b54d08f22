//! Core library for `wikidump`: walks a MediaWiki `api.php`, cleans the
//! rendered HTML of each page and persists it, and converts saved pages to
//! Markdown.

pub mod cleaner;
pub mod client;
pub mod config;
pub mod download;
pub mod error;
pub mod listing;
pub mod markdown;
pub mod naming;
pub mod pages;
