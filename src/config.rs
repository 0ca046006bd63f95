// src/config.rs
// =============================================================================
// Tunables for one pipeline and the shape of a single scrape job.
//
// PipelineConfig is built once (from CLI flags) and shared by every request
// the pipeline serves. ScrapeJob describes one request: which mode to run
// and which optional outputs (tables, raw HTML) each page record carries.
// =============================================================================

use std::time::Duration;

// Some origin servers reject default client identifiers, so sitemap and
// robots.txt requests present themselves as a desktop browser
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

pub const DEFAULT_MAX_PAGES: usize = 50;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum number of pages rendered at the same time
    pub concurrency: usize,
    /// A paragraph seen on more pages than this is treated as boilerplate
    pub repetition_threshold: usize,
    pub robots_timeout: Duration,
    pub sitemap_timeout: Duration,
    pub navigation_timeout: Duration,
    /// How many levels of sitemap indexes are followed
    pub max_sitemap_depth: usize,
    /// Upper bound for a whole request (discovery + fetch + clean)
    pub request_timeout: Duration,
    pub user_agent: String,
    /// Scheme used to build robots.txt / default sitemap URLs from a domain
    pub origin_scheme: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            repetition_threshold: 3,
            robots_timeout: Duration::from_secs(5),
            sitemap_timeout: Duration::from_secs(10),
            navigation_timeout: Duration::from_secs(15),
            max_sitemap_depth: 5,
            request_timeout: Duration::from_secs(300),
            user_agent: BROWSER_USER_AGENT.to_string(),
            origin_scheme: "https".to_string(),
        }
    }
}

// Which of the two request shapes a job uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeMode {
    /// Render and extract exactly one URL
    SinglePage { url: String },
    /// Discover the domain's sitemaps and fetch up to max_pages of them
    DomainCrawl { domain: String, max_pages: usize },
}

// Optional outputs added to every success record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Tables as rows of cell texts
    pub tables: bool,
    /// The rendered document itself
    pub html: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeJob {
    pub mode: ScrapeMode,
    pub options: ExtractOptions,
}

impl ScrapeJob {
    pub fn crawl(domain: impl Into<String>, max_pages: usize) -> Self {
        Self {
            mode: ScrapeMode::DomainCrawl {
                domain: domain.into(),
                max_pages,
            },
            options: ExtractOptions::default(),
        }
    }

    pub fn single_page(url: impl Into<String>) -> Self {
        Self {
            mode: ScrapeMode::SinglePage { url: url.into() },
            options: ExtractOptions::default(),
        }
    }

    pub fn with_tables(mut self, tables: bool) -> Self {
        self.options.tables = tables;
        self
    }

    pub fn with_html(mut self, html: bool) -> Self {
        self.options.html = html;
        self
    }
}
