// src/fetch/scripted.rs
// =============================================================================
// An in-memory Renderer for tests.
//
// Each URL is scripted to return HTML, fail with a message, or hang forever
// (to exercise the navigation timeout). Unscripted URLs fail. The renderer
// counts calls and records the highest number of renders running at once,
// which is what the concurrency tests check.
// =============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::render::Renderer;

#[derive(Debug, Clone)]
pub enum Script {
    Html(String),
    Fail(String),
    Hang,
}

#[derive(Default)]
pub struct ScriptedRenderer {
    scripts: HashMap<String, Script>,
    delay: Duration,
    calls: AtomicUsize,
    running: AtomicUsize,
    peak: AtomicUsize,
    rendered: Mutex<Vec<String>>,
}

impl ScriptedRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.scripts.insert(url.to_string(), Script::Html(html.to_string()));
        self
    }

    pub fn failing(mut self, url: &str, message: &str) -> Self {
        self.scripts.insert(url.to_string(), Script::Fail(message.to_string()));
        self
    }

    pub fn hanging(mut self, url: &str) -> Self {
        self.scripts.insert(url.to_string(), Script::Hang);
        self
    }

    // Every render sleeps this long, so concurrent renders overlap
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn rendered_urls(&self) -> Vec<String> {
        self.rendered.lock().map(|urls| urls.clone()).unwrap_or_default()
    }
}

// Decrements the running counter even when the render future is dropped
struct Running<'a>(&'a AtomicUsize);

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Renderer for ScriptedRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut urls) = self.rendered.lock() {
            urls.push(url.to_string());
        }

        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        let _running = Running(&self.running);
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.scripts.get(url) {
            Some(Script::Html(html)) => Ok(html.clone()),
            Some(Script::Fail(message)) => Err(anyhow!("{}", message)),
            Some(Script::Hang) => {
                futures::future::pending::<()>().await;
                Err(anyhow!("unreachable"))
            }
            None => Err(anyhow!("net::ERR_NAME_NOT_RESOLVED at {}", url)),
        }
    }
}
