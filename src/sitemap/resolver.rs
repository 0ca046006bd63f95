// src/sitemap/resolver.rs
// =============================================================================
// Turns a domain into the flat list of page URLs its sitemaps declare.
//
// Two steps:
// 1. discover(domain): read robots.txt for `Sitemap:` lines; if there are
//    none (or robots.txt can't be fetched) use https://{domain}/sitemap.xml
// 2. expand(sitemap): fetch and parse the document; a sitemap index is
//    expanded recursively (depth-first, in order of appearance), a url set
//    yields its <loc> values
//
// Failure policy: nothing here returns an error to the caller. A robots.txt
// failure degrades to the default sitemap, and a failed sitemap fetch or parse
// only empties its own branch; sibling branches keep their results.
//
// Recursion is bounded two ways: a maximum index depth, and a visited set so
// an index that lists itself (directly or through another index) is only
// expanded once.
// =============================================================================

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use futures::future::{BoxFuture, FutureExt};
use reqwest::Client;
use tracing::{debug, info, warn};

use super::robots::sitemap_directives;
use super::xml::{parse_sitemap, SitemapDocument};
use crate::config::PipelineConfig;

pub struct SitemapResolver {
    client: Client,
    origin_scheme: String,
    robots_timeout: Duration,
    sitemap_timeout: Duration,
    max_depth: usize,
}

impl SitemapResolver {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        // One client for every robots.txt / sitemap request (connection pooling)
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            origin_scheme: config.origin_scheme.clone(),
            robots_timeout: config.robots_timeout,
            sitemap_timeout: config.sitemap_timeout,
            max_depth: config.max_sitemap_depth,
        })
    }

    // Finds the sitemap URLs for a (normalized) domain
    //
    // Returns the robots.txt directives when there are any, otherwise the
    // single default location. Never fails.
    pub async fn discover(&self, domain: &str) -> Vec<String> {
        let origin = format!("{}://{}", self.origin_scheme, domain);
        let robots_url = format!("{}/robots.txt", origin);

        match self.get_text(&robots_url, self.robots_timeout).await {
            Ok(body) => {
                let sitemaps = sitemap_directives(&body);
                if !sitemaps.is_empty() {
                    info!(domain, count = sitemaps.len(), "sitemaps declared in robots.txt");
                    return sitemaps;
                }
                debug!(domain, "robots.txt has no Sitemap directive");
            }
            Err(e) => {
                debug!(domain, error = %e, "robots.txt unavailable");
            }
        }

        let fallback = format!("{}/sitemap.xml", origin);
        info!(domain, sitemap = %fallback, "using default sitemap location");
        vec![fallback]
    }

    // Expands one sitemap into its page URLs
    //
    // An unreachable or malformed sitemap yields an empty list.
    pub async fn expand(&self, sitemap_url: &str) -> Vec<String> {
        let mut visited = HashSet::new();
        self.expand_branch(sitemap_url.to_string(), 0, &mut visited)
            .await
    }

    // Recursive step. Async recursion needs a boxed future, since the
    // future's size would otherwise depend on itself.
    fn expand_branch<'a>(
        &'a self,
        sitemap_url: String,
        depth: usize,
        visited: &'a mut HashSet<String>,
    ) -> BoxFuture<'a, Vec<String>> {
        async move {
            if !visited.insert(sitemap_url.clone()) {
                warn!(sitemap = %sitemap_url, "sitemap already expanded, skipping cycle");
                return Vec::new();
            }

            let document = match self.fetch_document(&sitemap_url).await {
                Ok(document) => document,
                Err(e) => {
                    warn!(sitemap = %sitemap_url, error = %e, "dropping sitemap branch");
                    return Vec::new();
                }
            };

            match document {
                SitemapDocument::UrlSet(pages) => {
                    debug!(sitemap = %sitemap_url, pages = pages.len(), "url set parsed");
                    pages
                }
                SitemapDocument::Index(children) => {
                    if depth >= self.max_depth {
                        warn!(
                            sitemap = %sitemap_url,
                            max_depth = self.max_depth,
                            "sitemap index nested too deep, skipping its children"
                        );
                        return Vec::new();
                    }

                    debug!(sitemap = %sitemap_url, children = children.len(), "sitemap index parsed");
                    let mut pages = Vec::new();
                    for child in children {
                        let mut child_pages = self.expand_branch(child, depth + 1, visited).await;
                        pages.append(&mut child_pages);
                    }
                    pages
                }
            }
        }
        .boxed()
    }

    async fn fetch_document(&self, sitemap_url: &str) -> Result<SitemapDocument> {
        let body = self.get_text(sitemap_url, self.sitemap_timeout).await?;
        parse_sitemap(&body)
    }

    // GET a URL and return its body; a non-2xx status is an error
    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP {} from {}", response.status(), url));
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("failed to read body of {}", url))?;
        Ok(body)
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is BoxFuture?
//    - An async fn that calls itself would have an infinitely sized future
//    - Boxing the future puts it on the heap, so its size is known
//    - .boxed() from futures::FutureExt does the pinning and boxing
//
// 2. Why pass `visited` as &mut HashSet?
//    - Every level of the recursion shares one set of seen sitemaps
//    - Branches run one after another, so a plain mutable borrow is enough
// -----------------------------------------------------------------------------
