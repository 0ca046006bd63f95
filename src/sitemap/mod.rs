// src/sitemap/mod.rs
// =============================================================================
// Sitemap discovery and expansion.
//
// Submodules:
// - robots: reads `Sitemap:` directives from robots.txt
// - xml: parses urlset / sitemapindex documents
// - resolver: fetches both over HTTP and walks sitemap indexes recursively
// =============================================================================

mod resolver;
mod robots;
mod xml;

pub use resolver::SitemapResolver;
