// src/pipeline.rs
// =============================================================================
// The orchestrator: domain in, cleaned page records out.
//
// run(domain, max_pages, options):
// 1. Normalize the domain (strip scheme and trailing slash)
// 2. Discover the sitemap URLs (robots.txt or the default location)
// 3. Expand every sitemap, concatenate, drop duplicate URLs, keep max_pages
// 4. Fetch every page at once; the gate lets N render at a time; wait for
//    all of them, failures included
// 5. Clean the whole batch
//
// Data only moves forward: resolver -> fetcher -> cleaner. Nothing is
// retried and nothing is kept between runs.
// =============================================================================

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use futures::future::join_all;
use tracing::{debug, info};
use url::Url;

use crate::clean::ContentCleaner;
use crate::config::{ExtractOptions, PipelineConfig, ScrapeJob, ScrapeMode};
use crate::fetch::{ConcurrencyGate, PageFetcher, Renderer};
use crate::record::PageRecord;
use crate::sitemap::SitemapResolver;

pub struct Pipeline {
    resolver: SitemapResolver,
    fetcher: PageFetcher,
    cleaner: ContentCleaner,
    renderer: Arc<dyn Renderer>,
    request_timeout: Duration,
}

impl Pipeline {
    // Builds a pipeline around a rendering engine
    //
    // The gate is created here and owned by the pipeline, so every job this
    // pipeline runs shares the same concurrency cap.
    pub fn new(config: &PipelineConfig, renderer: Arc<dyn Renderer>) -> Result<Self> {
        let gate = ConcurrencyGate::new(config.concurrency);
        let fetcher = PageFetcher::new(Arc::clone(&renderer), gate, config.navigation_timeout);
        debug!(
            concurrency = fetcher.gate().capacity(),
            threshold = config.repetition_threshold,
            "pipeline ready"
        );

        Ok(Self {
            resolver: SitemapResolver::new(config)?,
            fetcher,
            cleaner: ContentCleaner::new(config.repetition_threshold),
            renderer,
            request_timeout: config.request_timeout,
        })
    }

    // Runs one job, bounded by the request timeout
    //
    // Errors here are request-level: an unusable domain or URL, or the
    // deadline passing (the error then wraps tokio's Elapsed).
    pub async fn execute(&self, job: &ScrapeJob) -> Result<Vec<PageRecord>> {
        let work = async {
            match &job.mode {
                ScrapeMode::DomainCrawl { domain, max_pages } => {
                    self.run(domain, *max_pages, job.options).await
                }
                ScrapeMode::SinglePage { url } => self.scrape_page(url, job.options).await,
            }
        };

        tokio::time::timeout(self.request_timeout, work)
            .await
            .with_context(|| {
                format!(
                    "request did not finish within {}s",
                    self.request_timeout.as_secs()
                )
            })?
    }

    // Domain-crawl mode
    pub async fn run(
        &self,
        domain: &str,
        max_pages: usize,
        options: ExtractOptions,
    ) -> Result<Vec<PageRecord>> {
        let domain = normalize_domain(domain)?;
        let urls = self.collect_page_urls(&domain, max_pages).await;
        info!(domain = %domain, pages = urls.len(), "fetching pages");

        let records = self.fetch_all(&urls, options).await;
        Ok(self.clean(records))
    }

    // Single-page mode: one URL, no sitemap discovery
    pub async fn scrape_page(&self, url: &str, options: ExtractOptions) -> Result<Vec<PageRecord>> {
        let url = validate_page_url(url)?;
        let record = self.fetcher.fetch(&url, options).await;
        Ok(self.clean(vec![record]))
    }

    // Discover -> expand -> dedup -> truncate
    async fn collect_page_urls(&self, domain: &str, max_pages: usize) -> Vec<String> {
        let sitemaps = self.resolver.discover(domain).await;
        let expanded = join_all(sitemaps.iter().map(|sitemap| self.resolver.expand(sitemap))).await;

        let mut seen = HashSet::new();
        let mut urls: Vec<String> = expanded
            .into_iter()
            .flatten()
            .filter(|url| seen.insert(url.clone()))
            .collect();

        let found = urls.len();
        urls.truncate(max_pages);
        info!(domain, found, selected = urls.len(), "page URLs resolved");
        urls
    }

    // Launches every fetch together and waits for all of them
    async fn fetch_all(&self, urls: &[String], options: ExtractOptions) -> Vec<PageRecord> {
        join_all(urls.iter().map(|url| self.fetcher.fetch(url, options))).await
    }

    fn clean(&self, records: Vec<PageRecord>) -> Vec<PageRecord> {
        let failed = records.iter().filter(|r| !r.is_ok()).count();
        let cleaned = self.cleaner.clean(records);
        info!(
            records = cleaned.len(),
            failed,
            threshold = self.cleaner.threshold(),
            "batch cleaned"
        );
        cleaned
    }

    // Shuts the rendering engine down
    pub async fn shutdown(&self) -> Result<()> {
        self.renderer.shutdown().await
    }
}

// Strips the scheme and trailing slashes from a domain
//
// Examples:
//   "https://example.com/" -> "example.com"
//   "example.com"          -> "example.com"
//   ""                     -> error
pub fn normalize_domain(input: &str) -> Result<String> {
    let trimmed = input.trim();
    let lower = trimmed.to_ascii_lowercase();

    let without_scheme = if lower.starts_with("https://") {
        &trimmed["https://".len()..]
    } else if lower.starts_with("http://") {
        &trimmed["http://".len()..]
    } else {
        trimmed
    };
    let domain = without_scheme.trim_end_matches('/');

    if domain.is_empty() {
        return Err(anyhow!("domain must not be empty"));
    }

    // The domain is only used to build absolute URLs, so it has to make one
    let candidate = format!("https://{}/", domain);
    let parsed = Url::parse(&candidate).with_context(|| format!("invalid domain '{}'", input))?;
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(anyhow!("invalid domain '{}'", input));
    }

    Ok(domain.to_string())
}

// Checks a single-page URL: absolute, http or https
//
// Returns the parsed form, so "https://Example.com" becomes
// "https://example.com/".
pub fn validate_page_url(input: &str) -> Result<String> {
    let url = Url::parse(input.trim()).with_context(|| format!("invalid URL '{}'", input))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(anyhow!("unsupported URL scheme '{}'", url.scheme()));
    }
    Ok(url.to_string())
}
