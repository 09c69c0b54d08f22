use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result, bail};
use htmd::HtmlToMarkdown;
use htmd::options::{BulletListMarker, HeadingStyle, Options};
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::download::ensure_output_dir;
use crate::naming::HTML_EXTENSION;

pub const MARKDOWN_EXTENSION: &str = "md";

static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();
static HEADING_ONLY_RE: OnceLock<Regex> = OnceLock::new();
static ANCHOR_TAG_RE: OnceLock<Regex> = OnceLock::new();
static BLANK_RUN_RE: OnceLock<Regex> = OnceLock::new();

#[allow(clippy::expect_used)]
fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("valid regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Empty,
    HeadingOnly,
}

impl SkipReason {
    pub fn describe(self) -> &'static str {
        match self {
            Self::Empty => "empty file",
            Self::HeadingOnly => "file with only an h1 tag",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    Converted,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub file: String,
    pub action: FileAction,
    pub output: Option<String>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionReport {
    pub input_dir: String,
    pub output_dir: String,
    pub found: usize,
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub files: Vec<FileOutcome>,
}

impl ConversionReport {
    fn push(&mut self, outcome: FileOutcome) {
        match outcome.action {
            FileAction::Converted => self.converted += 1,
            FileAction::Skipped => self.skipped += 1,
            FileAction::Failed => self.failed += 1,
        }
        self.files.push(outcome);
    }
}

/// Decide whether saved page HTML carries anything worth converting: empty
/// files and files holding a lone `<h1>` (redirect placeholders, blank pages)
/// are skipped.
pub fn should_skip(html: &str) -> Option<SkipReason> {
    let trimmed = html.trim();
    if trimmed.is_empty() {
        return Some(SkipReason::Empty);
    }
    let collapsed = regex(&WHITESPACE_RE, r"\s+").replace_all(trimmed, " ");
    if regex(&HEADING_ONLY_RE, r"(?is)^<h1[^>]*>.*?</h1>$").is_match(&collapsed) {
        return Some(SkipReason::HeadingOnly);
    }
    None
}

pub struct MarkdownConverter {
    input_dir: PathBuf,
    output_dir: PathBuf,
    converter: HtmlToMarkdown,
}

impl MarkdownConverter {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        ensure_output_dir(&output_dir)?;
        let converter = HtmlToMarkdown::builder()
            .skip_tags(vec!["script", "style"])
            .options(Options {
                heading_style: HeadingStyle::Atx,
                bullet_list_marker: BulletListMarker::Dash,
                ..Default::default()
            })
            .build();

        Ok(Self {
            input_dir: input_dir.into(),
            output_dir,
            converter,
        })
    }

    /// `*.html` files directly under the input directory, sorted.
    pub fn find_html_files(&self) -> Result<Vec<PathBuf>> {
        if !self.input_dir.is_dir() {
            bail!("input directory {} does not exist", self.input_dir.display());
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.input_dir).min_depth(1).max_depth(1) {
            let entry = entry
                .with_context(|| format!("failed to list {}", self.input_dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            let is_html = path
                .extension()
                .is_some_and(|extension| extension == HTML_EXTENSION);
            if is_html && !hidden {
                files.push(path.to_path_buf());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Convert HTML to Markdown: ATX headings, `-` bullets, scripts and styles
    /// dropped, links unwrapped to their text.
    pub fn convert_html(&self, html: &str) -> Result<String> {
        let unlinked = regex(&ANCHOR_TAG_RE, r"(?is)</?a\b[^>]*>").replace_all(html, "");
        let markdown = self
            .converter
            .convert(&unlinked)
            .context("failed to convert HTML to Markdown")?;

        let trimmed_lines = markdown
            .split('\n')
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n");
        let collapsed = regex(&BLANK_RUN_RE, r"\n{3,}").replace_all(&trimmed_lines, "\n\n");
        Ok(collapsed.trim().to_string())
    }

    /// `<output_dir>/<stem>.md`; an existing file is overwritten.
    pub fn output_path(&self, html_path: &Path) -> PathBuf {
        let stem = html_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.output_dir
            .join(format!("{stem}.{MARKDOWN_EXTENSION}"))
    }

    pub fn convert_file(&self, html_path: &Path) -> Result<PathBuf> {
        let html = fs::read_to_string(html_path)
            .with_context(|| format!("failed to read {}", html_path.display()))?;
        self.write_markdown(html_path, &html)
    }

    /// Convert one file, applying the skip rules. A missing file is an error;
    /// anything after that is reported in the outcome.
    pub fn convert_single(&self, html_path: &Path) -> Result<FileOutcome> {
        if !html_path.is_file() {
            bail!("file {} does not exist", html_path.display());
        }
        Ok(self.process(html_path))
    }

    pub fn convert_all(&self) -> Result<ConversionReport> {
        let files = self.find_html_files()?;
        let mut report = ConversionReport {
            input_dir: normalize_path(&self.input_dir),
            output_dir: normalize_path(&self.output_dir),
            found: files.len(),
            ..ConversionReport::default()
        };
        if files.is_empty() {
            info!(input_dir = %self.input_dir.display(), "no HTML files found");
            return Ok(report);
        }

        info!(count = files.len(), "found HTML files to convert");
        for (index, file) in files.iter().enumerate() {
            info!(
                "[{}/{}] converting {}",
                index + 1,
                files.len(),
                file.file_name().unwrap_or_default().to_string_lossy()
            );
            report.push(self.process(file));
        }

        info!(
            converted = report.converted,
            skipped = report.skipped,
            failed = report.failed,
            "conversion complete"
        );
        Ok(report)
    }

    fn process(&self, html_path: &Path) -> FileOutcome {
        let file = normalize_path(html_path);
        let html = match fs::read_to_string(html_path) {
            Ok(html) => html,
            Err(error) => {
                warn!(file = %file, %error, "failed to read file");
                return FileOutcome {
                    file,
                    action: FileAction::Failed,
                    output: None,
                    detail: Some(format!("failed to read: {error}")),
                };
            }
        };

        if let Some(reason) = should_skip(&html) {
            info!(file = %file, reason = reason.describe(), "skipping");
            return FileOutcome {
                file,
                action: FileAction::Skipped,
                output: None,
                detail: Some(reason.describe().to_string()),
            };
        }

        match self.write_markdown(html_path, &html) {
            Ok(output) => FileOutcome {
                file,
                action: FileAction::Converted,
                output: Some(normalize_path(&output)),
                detail: None,
            },
            Err(error) => {
                let detail = format!("{error:#}");
                warn!(file = %file, error = %detail, "conversion failed");
                FileOutcome {
                    file,
                    action: FileAction::Failed,
                    output: None,
                    detail: Some(detail),
                }
            }
        }
    }

    fn write_markdown(&self, html_path: &Path, html: &str) -> Result<PathBuf> {
        let markdown = self.convert_html(html)?;
        let output = self.output_path(html_path);
        fs::write(&output, markdown)
            .with_context(|| format!("failed to write {}", output.display()))?;
        Ok(output)
    }
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::tempdir;

    use super::{FileAction, MarkdownConverter, SkipReason, should_skip};

    fn converter(root: &Path) -> MarkdownConverter {
        MarkdownConverter::new(root.join("wiki_pages"), root.join("markdown_pages"))
            .expect("converter")
    }

    #[test]
    fn skip_rules() {
        assert_eq!(should_skip(""), Some(SkipReason::Empty));
        assert_eq!(should_skip(" \n\t "), Some(SkipReason::Empty));
        assert_eq!(should_skip("<h1>Title</h1>"), Some(SkipReason::HeadingOnly));
        assert_eq!(
            should_skip("  <H1 class=\"x\">Multi\nline</H1>\n"),
            Some(SkipReason::HeadingOnly)
        );
        assert_eq!(should_skip("<h1>Title</h1>\n<p>Body</p>"), None);
        assert_eq!(should_skip("<p>Body</p>"), None);
    }

    #[test]
    fn converts_headings_lists_and_strips_links_and_scripts() {
        let temp = tempdir().expect("tempdir");
        let converter = converter(temp.path());

        let markdown = converter
            .convert_html(
                "<h1>Title</h1>\n<script>alert(1)</script><style>p{}</style>\n<p>See <a href=\"/wiki/Other\">other page</a>.</p>\n<ul><li>one</li><li>two</li></ul>",
            )
            .expect("convert");

        assert!(markdown.starts_with("# Title"));
        assert!(markdown.contains("other page"));
        assert!(!markdown.contains("/wiki/Other"));
        assert!(!markdown.contains("alert"));
        assert!(!markdown.contains("p{}"));
        assert!(
            markdown
                .lines()
                .any(|line| line.starts_with('-') && line.contains("one"))
        );
        assert!(!markdown.contains("\n\n\n"));
        assert!(markdown.lines().all(|line| line == line.trim_end()));
        assert_eq!(markdown, markdown.trim());
    }

    #[test]
    fn output_path_swaps_extension() {
        let temp = tempdir().expect("tempdir");
        let converter = converter(temp.path());
        let output = converter.output_path(Path::new("/somewhere/Alpha beta.html"));
        assert_eq!(output, temp.path().join("markdown_pages").join("Alpha beta.md"));
    }

    #[test]
    fn convert_all_reports_each_file() {
        let temp = tempdir().expect("tempdir");
        let input = temp.path().join("wiki_pages");
        fs::create_dir_all(&input).expect("create input");
        fs::write(input.join("Alpha.html"), "<h1>Alpha</h1>\n<p>Body text</p>").expect("write");
        fs::write(input.join("Beta.html"), "").expect("write");
        fs::write(input.join("Gamma.html"), "<h1>Gamma</h1>").expect("write");
        fs::write(input.join("notes.txt"), "<p>ignored</p>").expect("write");
        fs::create_dir_all(input.join("nested")).expect("create nested");
        fs::write(input.join("nested").join("Deep.html"), "<p>deep</p>").expect("write");

        let converter = converter(temp.path());
        let report = converter.convert_all().expect("convert all");

        assert_eq!(report.found, 3);
        assert_eq!(report.converted, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(report.files[0].action, FileAction::Converted);
        let output = temp.path().join("markdown_pages").join("Alpha.md");
        let markdown = fs::read_to_string(output).expect("read");
        assert!(markdown.starts_with("# Alpha"));
        assert!(markdown.contains("Body text"));
        assert!(!temp.path().join("markdown_pages").join("Beta.md").exists());
        assert!(!temp.path().join("markdown_pages").join("Deep.md").exists());
    }

    #[test]
    fn convert_all_with_no_files_is_not_an_error() {
        let temp = tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("wiki_pages")).expect("create input");
        let report = converter(temp.path()).convert_all().expect("convert all");
        assert_eq!(report.found, 0);
        assert!(report.files.is_empty());
    }

    #[test]
    fn missing_input_dir_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let error = converter(temp.path()).convert_all().expect_err("must fail");
        assert!(error.to_string().contains("does not exist"));
    }

    #[test]
    fn convert_single_skips_and_rejects_missing_files() {
        let temp = tempdir().expect("tempdir");
        let converter = converter(temp.path());

        let error = converter
            .convert_single(&temp.path().join("missing.html"))
            .expect_err("must fail");
        assert!(error.to_string().contains("does not exist"));

        let heading_only = temp.path().join("Heading.html");
        fs::write(&heading_only, "<h1>Heading</h1>").expect("write");
        let outcome = converter.convert_single(&heading_only).expect("outcome");
        assert_eq!(outcome.action, FileAction::Skipped);

        let page = temp.path().join("Page.html");
        fs::write(&page, "<p>Hello</p>").expect("write");
        let outcome = converter.convert_single(&page).expect("outcome");
        assert_eq!(outcome.action, FileAction::Converted);
        let written = converter.convert_file(&page).expect("convert file");
        assert_eq!(fs::read_to_string(written).expect("read"), "Hello");
    }
}
