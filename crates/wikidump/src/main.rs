use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use wikidump::{init_tracing, print_errors};
use wikidump_core::config::DownloaderConfig;
use wikidump_core::download::{DownloadOptions, DownloadReport, download_pages};

#[derive(Debug, Parser)]
#[command(
    name = "wikidump",
    version,
    about = "Download rendered pages from a MediaWiki wiki"
)]
struct Cli {
    #[arg(
        value_name = "WIKI_URL",
        help = "Base URL of the MediaWiki instance (e.g. https://en.wikipedia.org/w)"
    )]
    wiki_url: String,
    #[arg(short, long, default_value_t = 10, help = "Maximum number of pages to download")]
    limit: usize,
    #[arg(short, long, value_name = "NAME", help = "Download only pages from this category")]
    category: Option<String>,
    #[arg(
        short,
        long,
        value_name = "DIR",
        default_value = "wiki_pages",
        help = "Output directory for downloaded pages"
    )]
    output: PathBuf,
    #[arg(short, long, help = "Re-download pages whose file already exists")]
    force: bool,
    #[arg(long, value_name = "PATH", help = "TOML config file")]
    config: Option<PathBuf>,
    #[arg(long, help = "Print the final report as JSON")]
    json: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let config = DownloaderConfig::load(cli.config.as_deref())?;
    let mut options = DownloadOptions::new(&cli.output, cli.limit, &config);
    options.category = cli.category.clone();
    options.force = cli.force;

    info!(
        wiki_url = %cli.wiki_url,
        output = %cli.output.display(),
        category = cli.category.as_deref().unwrap_or("<none>"),
        "starting download"
    );
    let report = download_pages(&cli.wiki_url, &config, &options)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &DownloadReport) {
    println!("download complete");
    println!("source: {}", report.source);
    println!("output_dir: {}", report.output_dir);
    println!("limit: {}", report.limit);
    println!("candidates: {}", report.candidates);
    println!("downloaded: {}", report.downloaded);
    println!("skipped_existing: {}", report.skipped);
    println!("redirects: {}", report.redirects);
    println!("failed: {}", report.failed);
    println!("requests: {}", report.request_count);
    print_errors(&report.errors);
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["wikidump", "https://wiki.example.org/w"]);
        assert_eq!(cli.wiki_url, "https://wiki.example.org/w");
        assert_eq!(cli.limit, 10);
        assert!(cli.category.is_none());
        assert_eq!(cli.output.to_string_lossy(), "wiki_pages");
        assert!(!cli.force);
    }

    #[test]
    fn all_flags() {
        let cli = Cli::parse_from([
            "wikidump",
            "https://wiki.example.org",
            "--limit",
            "25",
            "-c",
            "Lore",
            "-o",
            "pages",
            "--force",
            "--json",
        ]);
        assert_eq!(cli.limit, 25);
        assert_eq!(cli.category.as_deref(), Some("Lore"));
        assert_eq!(cli.output.to_string_lossy(), "pages");
        assert!(cli.force);
        assert!(cli.json);
    }

    #[test]
    fn wiki_url_is_required() {
        assert!(Cli::try_parse_from(["wikidump"]).is_err());
    }
}
