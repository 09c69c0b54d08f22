use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use wikidump::{init_tracing, print_errors};
use wikidump_core::markdown::{ConversionReport, FileAction, FileOutcome, MarkdownConverter};

#[derive(Debug, Parser)]
#[command(
    name = "wikidump-md",
    version,
    about = "Convert downloaded wiki HTML pages to Markdown"
)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "DIR",
        default_value = "wiki_pages",
        help = "Input directory containing HTML files"
    )]
    input: PathBuf,
    #[arg(
        short,
        long,
        value_name = "DIR",
        default_value = "markdown_pages",
        help = "Output directory for Markdown files"
    )]
    output: PathBuf,
    #[arg(short, long, value_name = "PATH", help = "Convert a single HTML file instead")]
    file: Option<PathBuf>,
    #[arg(long, help = "Print the final report as JSON")]
    json: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let converter = MarkdownConverter::new(&cli.input, &cli.output)?;

    if let Some(file) = &cli.file {
        let outcome = converter.convert_single(file)?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        } else {
            print_outcome(&outcome);
        }
        return Ok(());
    }

    let report = converter.convert_all()?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_outcome(outcome: &FileOutcome) {
    match outcome.action {
        FileAction::Converted => println!(
            "converted: {} -> {}",
            outcome.file,
            outcome.output.as_deref().unwrap_or("<unknown>")
        ),
        FileAction::Skipped => println!(
            "skipped: {} ({})",
            outcome.file,
            outcome.detail.as_deref().unwrap_or("nothing to convert")
        ),
        FileAction::Failed => println!(
            "failed: {} ({})",
            outcome.file,
            outcome.detail.as_deref().unwrap_or("unknown error")
        ),
    }
}

fn print_report(report: &ConversionReport) {
    println!("conversion complete");
    println!("input_dir: {}", report.input_dir);
    println!("output_dir: {}", report.output_dir);
    println!("found: {}", report.found);
    println!("converted: {}", report.converted);
    println!("skipped: {}", report.skipped);
    println!("failed: {}", report.failed);
    let errors = report
        .files
        .iter()
        .filter(|outcome| outcome.action == FileAction::Failed)
        .map(|outcome| {
            format!(
                "{}: {}",
                outcome.file,
                outcome.detail.as_deref().unwrap_or("unknown error")
            )
        })
        .collect::<Vec<_>>();
    print_errors(&errors);
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;

    #[test]
    fn defaults_match_download_layout() {
        let cli = Cli::parse_from(["wikidump-md"]);
        assert_eq!(cli.input.to_string_lossy(), "wiki_pages");
        assert_eq!(cli.output.to_string_lossy(), "markdown_pages");
        assert!(cli.file.is_none());
    }

    #[test]
    fn single_file_flag() {
        let cli = Cli::parse_from(["wikidump-md", "-f", "wiki_pages/Alpha.html", "-o", "out"]);
        assert_eq!(
            cli.file.as_deref().map(|path| path.to_string_lossy().into_owned()),
            Some("wiki_pages/Alpha.html".to_string())
        );
        assert_eq!(cli.output.to_string_lossy(), "out");
    }
}
