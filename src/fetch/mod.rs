// src/fetch/mod.rs
// =============================================================================
// Page fetching: concurrency gate, rendering engine, content extraction.
//
// Submodules:
// - gate: counting gate that bounds renders in flight
// - render: Renderer trait and the headless Chromium implementation
// - extract: HTML -> PageContent (title, headings, paragraphs, tables)
// - fetcher: ties the three together into PageFetcher::fetch
// =============================================================================

mod extract;
mod fetcher;
mod gate;
mod render;

#[cfg(test)]
pub mod scripted;

pub use fetcher::PageFetcher;
pub use gate::ConcurrencyGate;
pub use render::{ChromiumRenderer, Renderer};
