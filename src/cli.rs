// src/cli.rs
// =============================================================================
// Command-line interface, built with clap's derive API.
//
// Subcommands:
//   crawl <domain>   discover sitemaps and scrape up to --max-pages pages
//   page <url>       scrape one page
//   serve            expose POST /scrape over HTTP
//
// Pipeline tunables are global flags so every subcommand shares them.
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::{PipelineConfig, DEFAULT_MAX_PAGES};

#[derive(Parser, Debug)]
#[command(
    name = "sitemap-scraper",
    version,
    about = "Scrape a website through its sitemaps and return cleaned, structured content",
    long_about = "sitemap-scraper finds a domain's sitemaps (robots.txt or /sitemap.xml), renders \
                  every listed page in headless Chromium, extracts titles, headings, paragraphs \
                  and tables, and strips text that repeats across pages (navigation, footers)."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub tuning: Tuning,

    /// Emit logs as JSON lines instead of human-readable text
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl a domain through its sitemaps
    ///
    /// Example: sitemap-scraper crawl example.com --max-pages 20
    Crawl {
        /// Domain to crawl (a scheme and trailing slash are stripped)
        domain: String,

        /// Maximum number of pages to fetch
        #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
        max_pages: usize,

        /// Also extract tables as rows of cell texts
        #[arg(long)]
        tables: bool,

        /// Also include the rendered HTML of each page
        #[arg(long)]
        html: bool,

        /// Output results as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Scrape a single page
    ///
    /// Example: sitemap-scraper page https://example.com/pricing --tables
    Page {
        /// Absolute URL of the page
        url: String,

        /// Also extract tables as rows of cell texts
        #[arg(long)]
        tables: bool,

        /// Also include the rendered HTML of each page
        #[arg(long)]
        html: bool,

        /// Output results as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run the HTTP server (POST /scrape)
    Serve {
        /// Port to listen on
        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,
    },
}

#[derive(Args, Debug)]
pub struct Tuning {
    /// Pages rendered at the same time
    #[arg(long, global = true, default_value_t = 3)]
    pub concurrency: usize,

    /// Paragraphs found on more pages than this are removed as boilerplate
    #[arg(long, global = true, default_value_t = 3)]
    pub threshold: usize,

    /// Per-page navigation timeout, in seconds
    #[arg(long, global = true, default_value_t = 15)]
    pub nav_timeout_secs: u64,

    /// Whole-request timeout, in seconds
    #[arg(long, global = true, default_value_t = 300)]
    pub request_timeout_secs: u64,

    /// How many levels of sitemap indexes to follow
    #[arg(long, global = true, default_value_t = 5)]
    pub max_sitemap_depth: usize,

    /// Chrome/Chromium executable (auto-detected when omitted)
    #[arg(long, global = true, env = "CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,
}

impl Tuning {
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            concurrency: self.concurrency,
            repetition_threshold: self.threshold,
            navigation_timeout: Duration::from_secs(self.nav_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_sitemap_depth: self.max_sitemap_depth,
            ..PipelineConfig::default()
        }
    }
}
