use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::cleaner::clean_content;
use crate::client::{MediaWikiClient, WikiTransport};
use crate::config::DownloaderConfig;
use crate::listing::{PageSource, list_titles};
use crate::naming::{html_path, sanitize_filename, unique_html_path};
use crate::pages::{PageRecord, fetch_page, is_redirect};

/// Candidates requested per wanted page, to absorb skips and redirects.
pub const CANDIDATE_MULTIPLIER: usize = 3;

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub output_dir: PathBuf,
    pub limit: usize,
    pub category: Option<String>,
    pub force: bool,
    pub list_delay: Duration,
    pub download_delay: Duration,
}

impl DownloadOptions {
    pub fn new(output_dir: impl Into<PathBuf>, limit: usize, config: &DownloaderConfig) -> Self {
        Self {
            output_dir: output_dir.into(),
            limit,
            category: None,
            force: false,
            list_delay: config.list_delay(),
            download_delay: config.download_delay(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageAction {
    Downloaded,
    Skipped,
    Redirect,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageOutcome {
    pub title: String,
    pub action: PageAction,
    pub path: Option<String>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadReport {
    pub success: bool,
    pub source: String,
    pub output_dir: String,
    pub limit: usize,
    pub candidates: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub redirects: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub pages: Vec<PageOutcome>,
    pub request_count: usize,
}

impl DownloadReport {
    fn new(options: &DownloadOptions, source: &PageSource) -> Self {
        Self {
            success: true,
            source: match source {
                PageSource::AllPages => "allpages".to_string(),
                PageSource::Category(name) => format!("category:{name}"),
            },
            output_dir: normalize_path(&options.output_dir),
            limit: options.limit,
            candidates: 0,
            downloaded: 0,
            skipped: 0,
            redirects: 0,
            failed: 0,
            errors: Vec::new(),
            pages: Vec::new(),
            request_count: 0,
        }
    }

    /// Outcomes that count towards the limit.
    pub fn completed(&self) -> usize {
        self.downloaded + self.skipped + self.redirects
    }

    fn record(&mut self, title: &str, action: PageAction, path: Option<&Path>, detail: Option<String>) {
        match action {
            PageAction::Downloaded => self.downloaded += 1,
            PageAction::Skipped => self.skipped += 1,
            PageAction::Redirect => self.redirects += 1,
            PageAction::Failed => {
                self.failed += 1;
                if let Some(detail) = &detail {
                    self.errors.push(format!("{title}: {detail}"));
                }
            }
        }
        self.pages.push(PageOutcome {
            title: title.to_string(),
            action,
            path: path.map(normalize_path),
            detail,
        });
    }
}

pub fn download_pages(
    wiki_url: &str,
    config: &DownloaderConfig,
    options: &DownloadOptions,
) -> Result<DownloadReport> {
    let mut client = MediaWikiClient::new(wiki_url, config)
        .with_context(|| format!("failed to set up MediaWiki client for {wiki_url}"))?;
    info!(api_url = %client.api_url(), "using MediaWiki API");
    download_pages_with_api(&mut client, options)
}

pub fn download_pages_with_api<A: WikiTransport>(
    api: &mut A,
    options: &DownloadOptions,
) -> Result<DownloadReport> {
    ensure_output_dir(&options.output_dir)?;

    let source = PageSource::from_category(options.category.as_deref());
    let mut report = DownloadReport::new(options, &source);
    let wanted = options.limit.saturating_mul(CANDIDATE_MULTIPLIER);

    let candidates = match list_titles(api, &source, wanted, options.list_delay) {
        Ok(titles) => titles,
        Err(error) => {
            error!(%error, "failed to list pages");
            report.errors.push(format!("listing failed: {error}"));
            report.success = false;
            report.request_count = api.request_count();
            return Ok(report);
        }
    };
    report.candidates = candidates.len();
    info!(candidates = candidates.len(), limit = options.limit, "found candidate pages");

    let mut written: HashSet<PathBuf> = HashSet::new();
    for (index, title) in candidates.iter().enumerate() {
        if report.completed() >= options.limit {
            break;
        }
        info!("[{}/{}] {title}", index + 1, candidates.len());

        let base = sanitize_filename(title, None);
        let target = html_path(&options.output_dir, &base);
        if target.exists() && !options.force && !written.contains(&target) {
            info!(path = %target.display(), "already downloaded; skipping");
            report.record(title, PageAction::Skipped, Some(&target), Some("exists".to_string()));
            continue;
        }

        if is_redirect(api, title) {
            let path = write_path(&options.output_dir, &base, options.force, &written);
            match fs::write(&path, "") {
                Ok(()) => {
                    info!(path = %path.display(), "redirect; wrote placeholder");
                    written.insert(path.clone());
                    report.record(title, PageAction::Redirect, Some(&path), None);
                }
                Err(error) => {
                    warn!(title = %title, %error, "failed to write redirect placeholder");
                    report.record(
                        title,
                        PageAction::Failed,
                        None,
                        Some(format!("failed to write {}: {error}", path.display())),
                    );
                }
            }
            continue;
        }

        match download_one(api, title, options, &written) {
            Ok(path) => {
                info!(path = %path.display(), "saved");
                written.insert(path.clone());
                report.record(title, PageAction::Downloaded, Some(&path), None);
                sleep(options.download_delay);
            }
            Err(error) => {
                let detail = format!("{error:#}");
                warn!(title = %title, error = %detail, "download failed");
                report.record(title, PageAction::Failed, None, Some(detail));
            }
        }
    }

    info!(
        downloaded = report.downloaded,
        skipped = report.skipped,
        redirects = report.redirects,
        failed = report.failed,
        "download complete"
    );
    report.request_count = api.request_count();
    report.success = report.failed == 0;
    Ok(report)
}

/// Persist a page unconditionally, suffixing the name if it is taken.
pub fn save_page(output_dir: &Path, record: &PageRecord) -> Result<PathBuf> {
    let base = sanitize_filename(&record.title, record.page_id);
    let path = unique_html_path(output_dir, &base);
    write_record(&path, record)?;
    Ok(path)
}

pub fn ensure_output_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))
}

fn download_one<A: WikiTransport>(
    api: &mut A,
    title: &str,
    options: &DownloadOptions,
    written: &HashSet<PathBuf>,
) -> Result<PathBuf> {
    let record = fetch_page(api, title)?;
    if !options.force {
        return save_page(&options.output_dir, &record);
    }
    let base = sanitize_filename(&record.title, record.page_id);
    let path = write_path(&options.output_dir, &base, true, written);
    write_record(&path, &record)?;
    Ok(path)
}

/// Without `force` the first name free on disk wins. With `force`, disk is
/// ignored and the first name not yet written by this run is reused, so a
/// forced re-run lands on the same files as the run before it.
fn write_path(dir: &Path, base: &str, force: bool, written: &HashSet<PathBuf>) -> PathBuf {
    if !force {
        return unique_html_path(dir, base);
    }
    let mut candidate = html_path(dir, base);
    let mut counter = 1usize;
    while written.contains(&candidate) {
        candidate = html_path(dir, &format!("{base}_{counter}"));
        counter += 1;
    }
    candidate
}

fn write_record(path: &Path, record: &PageRecord) -> Result<()> {
    let content = clean_content(&record.raw_html, &record.title);
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
