// src/main.rs
// =============================================================================
// Entry point of the sitemap-scraper CLI.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing, written to stderr)
// 3. Launch the headless browser and build the pipeline
// 4. Dispatch to the subcommand (crawl, page, serve)
// 5. Print results and exit with a proper code
//    (0 = every page scraped, 1 = some pages failed, 2 = request-level error)
// =============================================================================

mod clean; // src/clean.rs - cross-page boilerplate removal
mod cli; // src/cli.rs - command-line parsing
mod config; // src/config.rs - pipeline tunables and job shape
mod fetch; // src/fetch/ - gate, renderer, extraction
mod pipeline; // src/pipeline.rs - the orchestrator
mod record; // src/record.rs - page records
mod server; // src/server.rs - POST /scrape
mod sitemap; // src/sitemap/ - robots.txt and sitemap resolution

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use config::ScrapeJob;
use fetch::ChromiumRenderer;
use pipeline::Pipeline;
use record::PageRecord;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{:#}", e), "scrape failed");
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Logs go to stderr so `--json` output on stdout stays parseable.
// RUST_LOG overrides the default level.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sitemap_scraper=info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let config = cli.tuning.pipeline_config();
    let renderer = Arc::new(ChromiumRenderer::launch(cli.tuning.chrome_path.clone()).await?);
    let pipeline = Arc::new(Pipeline::new(&config, renderer)?);

    let outcome = match cli.command {
        Commands::Crawl {
            domain,
            max_pages,
            tables,
            html,
            json,
        } => {
            let job = ScrapeJob::crawl(domain, max_pages)
                .with_tables(tables)
                .with_html(html);
            scrape_and_print(&pipeline, &job, json).await
        }
        Commands::Page {
            url,
            tables,
            html,
            json,
        } => {
            let job = ScrapeJob::single_page(url)
                .with_tables(tables)
                .with_html(html);
            scrape_and_print(&pipeline, &job, json).await
        }
        Commands::Serve { port } => server::serve(Arc::clone(&pipeline), port)
            .await
            .map(|()| 0),
    };

    // Always stop the browser, even when the command failed
    if let Err(e) = pipeline.shutdown().await {
        error!(error = %format!("{:#}", e), "browser shutdown failed");
    }

    outcome
}

async fn scrape_and_print(pipeline: &Pipeline, job: &ScrapeJob, json: bool) -> Result<i32> {
    let records = pipeline.execute(job).await?;
    print_results(&records, json)?;

    let failed = records.iter().filter(|r| !r.is_ok()).count();
    Ok(if failed > 0 { 1 } else { 0 })
}

// Prints the records either as a table or as JSON
fn print_results(records: &[PageRecord], json: bool) -> Result<()> {
    if json {
        let output = serde_json::json!({ "results": records });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_table(records);
    }
    Ok(())
}

// Human-readable summary, one line per page
fn print_table(records: &[PageRecord]) {
    println!("{:<60} {:<8} {:<40}", "URL", "STATUS", "TITLE / ERROR");
    println!("{}", "=".repeat(110));

    for record in records {
        let url_display = truncate(&record.url, 57);

        match (record.content(), record.error()) {
            (Some(content), _) => {
                let title = content.title.as_deref().unwrap_or("(no title)");
                println!("{:<60} {:<8} {:<40}", url_display, "OK", truncate(title, 40));
                println!(
                    "{:<60} {:<8} h1={} h2={} h3={} paragraphs={}",
                    "",
                    "",
                    content.h1.len(),
                    content.h2.len(),
                    content.h3.len(),
                    content.paragraphs.len()
                );
            }
            (None, Some(error)) => {
                println!("{:<60} {:<8} {:<40}", url_display, "FAILED", truncate(error, 40));
            }
            (None, None) => {}
        }
    }

    println!();

    let ok_count = records.iter().filter(|r| r.is_ok()).count();
    println!("Summary:");
    println!("   OK: {}", ok_count);
    println!("   Failed: {}", records.len() - ok_count);
    println!("   Total: {}", records.len());
}

// Shortens a string for display, on a char boundary
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate("https://example.com/", 57), "https://example.com/");
    }

    #[test]
    fn test_truncate_long_text_on_char_boundary() {
        let long = "é".repeat(50);
        let shortened = truncate(&long, 10);
        assert_eq!(shortened.chars().count(), 10);
        assert!(shortened.ends_with("..."));
    }
}
