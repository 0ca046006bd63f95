// src/fetch/fetcher.rs
// =============================================================================
// Fetches one page: gate slot -> render -> extract -> PageRecord.
//
// A fetch never fails as a Rust error. Whatever goes wrong (timeout, DNS,
// browser crash) ends up as a failure-shaped PageRecord, so one bad page can't
// abort the batch it belongs to.
//
// The gate permit lives for the whole fetch and is dropped on every return
// path. The navigation timeout cancels the render future; the renderer's tab
// guard closes the tab when that happens.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use super::extract::extract_page;
use super::gate::ConcurrencyGate;
use super::render::Renderer;
use crate::config::ExtractOptions;
use crate::record::PageRecord;

#[derive(Clone)]
pub struct PageFetcher {
    renderer: Arc<dyn Renderer>,
    gate: ConcurrencyGate,
    navigation_timeout: Duration,
}

impl PageFetcher {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        gate: ConcurrencyGate,
        navigation_timeout: Duration,
    ) -> Self {
        Self {
            renderer,
            gate,
            navigation_timeout,
        }
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    // Fetches and extracts one URL
    //
    // Returns a success record with the extracted content, or a failure
    // record whose error is a human-readable message
    pub async fn fetch(&self, url: &str, options: ExtractOptions) -> PageRecord {
        let _permit = match self.gate.acquire().await {
            Ok(permit) => permit,
            Err(e) => return PageRecord::failure(url, e.to_string()),
        };
        debug!(url, in_flight = self.gate.in_flight(), "rendering page");

        let html = match timeout(self.navigation_timeout, self.renderer.render(url)).await {
            Ok(Ok(html)) => html,
            Ok(Err(e)) => {
                let message = describe_render_error(&e);
                warn!(url, error = %message, "page fetch failed");
                return PageRecord::failure(url, message);
            }
            Err(_) => {
                let message = format!(
                    "Navigation timed out after {}ms",
                    self.navigation_timeout.as_millis()
                );
                warn!(url, "page fetch timed out");
                return PageRecord::failure(url, message);
            }
        };

        let content = extract_page(&html, options);
        debug!(
            url,
            paragraphs = content.paragraphs.len(),
            "page extracted"
        );
        PageRecord::success(url, content)
    }
}

// Turns a renderer error into the message stored on the record
//
// The whole context chain is kept ("navigation to X failed: net::ERR_..."),
// and the message is never empty.
fn describe_render_error(error: &anyhow::Error) -> String {
    let message = format!("{:#}", error);
    if message.trim().is_empty() {
        "Rendering failed".to_string()
    } else {
        message
    }
}
