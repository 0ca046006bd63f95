// src/sitemap/xml.rs
// =============================================================================
// Parses sitemap protocol documents.
//
// Two document kinds exist:
//   <sitemapindex><sitemap><loc>child sitemap</loc></sitemap>...</sitemapindex>
//   <urlset><url><loc>page</loc></url>...</urlset>
//
// We use quick-xml's streaming reader: it never builds a tree, so large
// sitemaps (50k entries) are cheap to scan. Element names are compared by
// local name, so namespace prefixes don't matter. Only a <loc> directly under
// <url> or <sitemap> counts; extension elements such as <image:loc> are
// skipped.
// =============================================================================

use anyhow::{anyhow, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// A sitemap index: the locations of child sitemaps
    Index(Vec<String>),
    /// A url set: the page URLs, in order of appearance
    UrlSet(Vec<String>),
}

// Parses a sitemap or sitemap-index document
//
// Any root element other than <sitemapindex> is treated as a url set.
// Malformed XML is an error (the caller drops the whole branch).
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut root: Option<String> = None;
    // Local names of the currently open elements
    let mut open: Vec<String> = Vec::new();
    let mut current_loc: Option<String> = None;
    let mut locs = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if root.is_none() {
                    root = Some(name.clone());
                }
                let under_entry = matches!(
                    open.last().map(String::as_str),
                    Some("url") | Some("sitemap")
                );
                if name == "loc" && under_entry {
                    current_loc = Some(String::new());
                }
                open.push(name);
            }
            Ok(Event::Empty(e)) => {
                // A self-closing root like <urlset/> is an empty document
                if root.is_none() {
                    root = Some(String::from_utf8_lossy(e.local_name().as_ref()).to_string());
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(loc) = current_loc.as_mut() {
                    loc.push_str(&e.unescape()?);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(loc) = current_loc.as_mut() {
                    loc.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::End(_)) => {
                if open.pop().as_deref() == Some("loc") {
                    if let Some(loc) = current_loc.take() {
                        let loc = loc.trim();
                        if !loc.is_empty() {
                            locs.push(loc.to_string());
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(anyhow!(
                    "malformed sitemap XML at byte {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
            _ => {}
        }
    }

    match root.as_deref() {
        Some("sitemapindex") => Ok(SitemapDocument::Index(locs)),
        Some(_) => Ok(SitemapDocument::UrlSet(locs)),
        None => Err(anyhow!("sitemap document has no root element")),
    }
}
