// src/fetch/render.rs
// =============================================================================
// The rendering capability: "give me the HTML of this URL after the browser
// has parsed it".
//
// Renderer is the seam. The fetcher only knows this trait, which keeps the
// browser out of its tests. ChromiumRenderer is the real implementation:
// one headless Chromium process, and per render call a fresh browser context
// holding one tab. Cookies, storage and cache never carry over from one
// render to another. If the browser dies, the next render relaunches it.
//
// Waiting policy: we wait until the new document's readyState leaves
// "loading" (the DOMContentLoaded point), not until the network is idle.
// The overall time limit is applied by the caller.
// =============================================================================

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams,
};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

// True once the tab has left about:blank and the new document is parsed
const DOCUMENT_PARSED_JS: &str =
    "document.location.href !== 'about:blank' && document.readyState !== 'loading'";

const READY_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[async_trait]
pub trait Renderer: Send + Sync {
    // Navigates to `url` and returns the rendered HTML
    async fn render(&self, url: &str) -> Result<String>;

    // Releases engine-wide resources (the browser process)
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

// One running Chromium process and the task driving its DevTools connection
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    async fn launch(chrome_path: Option<&PathBuf>) -> Result<Self> {
        let mut builder = BrowserConfig::builder().no_sandbox();
        if let Some(path) = chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow!("invalid browser configuration: {}", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // The handler must be polled for the browser to make progress. It
        // ends when the connection is gone, e.g. after a browser crash.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "browser handler event error");
                }
            }
        });

        info!("headless browser launched");
        Ok(Self { browser, handler })
    }

    fn is_alive(&self) -> bool {
        !self.handler.is_finished()
    }
}

pub struct ChromiumRenderer {
    // Read-locked by every render (tabs open concurrently), write-locked
    // to relaunch a dead browser and on shutdown
    session: Arc<RwLock<BrowserSession>>,
    chrome_path: Option<PathBuf>,
}

impl ChromiumRenderer {
    // Launches a headless Chromium
    //
    // chrome_path: explicit executable, otherwise chromiumoxide looks for an
    // installed Chrome/Chromium
    pub async fn launch(chrome_path: Option<PathBuf>) -> Result<Self> {
        let session = BrowserSession::launch(chrome_path.as_ref()).await?;
        Ok(Self {
            session: Arc::new(RwLock::new(session)),
            chrome_path,
        })
    }

    // Replaces the browser if its connection has died
    async fn ensure_alive(&self) -> Result<()> {
        if self.session.read().await.is_alive() {
            return Ok(());
        }

        let mut session = self.session.write().await;
        // Another render may have relaunched it while we waited for the lock
        if session.is_alive() {
            return Ok(());
        }

        warn!("browser connection lost, relaunching");
        let _ = session.browser.kill().await;
        *session = BrowserSession::launch(self.chrome_path.as_ref()).await?;
        Ok(())
    }

    // Opens a tab in a fresh browser context: cookies, storage and cache
    // are private to this render
    async fn open_isolated_tab(&self, url: &str) -> Result<PageGuard> {
        let session = self.session.read().await;
        let context_id = session
            .browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .context("failed to create a browser context")?;

        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(|e| anyhow!("invalid tab request: {}", e))?;

        match session.browser.new_page(params).await {
            Ok(page) => Ok(PageGuard::new(
                page,
                context_id,
                Arc::clone(&self.session),
                url.to_string(),
            )),
            Err(e) => {
                let _ = session.browser.dispose_browser_context(context_id).await;
                Err(anyhow::Error::from(e).context("failed to open a browser tab"))
            }
        }
    }

    async fn navigate(page: &Page, url: &str) -> Result<()> {
        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| anyhow!("invalid navigation request: {}", e))?;

        let response = page.execute(params).await?;

        // DNS failures, refused connections, etc. come back as errorText
        if let Some(error_text) = response.result.error_text.as_ref() {
            return Err(anyhow!("navigation to {} failed: {}", url, error_text));
        }

        // An evaluate error means the execution context is being replaced
        // (a client-side redirect); poll again. The caller's timeout bounds
        // this loop.
        loop {
            let parsed = match page.evaluate(DOCUMENT_PARSED_JS).await {
                Ok(result) => result.into_value::<bool>().unwrap_or(false),
                Err(e) => {
                    debug!(url, error = %e, "document not ready yet");
                    false
                }
            };
            if parsed {
                return Ok(());
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        self.ensure_alive().await?;
        let guard = self.open_isolated_tab(url).await?;

        let html = match Self::navigate(guard.page()?, url).await {
            Ok(()) => guard.page()?.content().await.map_err(anyhow::Error::from),
            Err(e) => Err(e),
        };

        // Close the tab on both outcomes; a close failure doesn't change
        // what the page returned
        if let Err(e) = guard.close().await {
            warn!(url, error = %e, "failed to close browser tab");
        }

        html
    }

    async fn shutdown(&self) -> Result<()> {
        let mut session = self.session.write().await;
        session.browser.close().await.context("failed to close browser")?;
        session
            .browser
            .wait()
            .await
            .context("browser process did not exit")?;
        session.handler.abort();
        info!("headless browser closed");
        Ok(())
    }
}

// Owns one browser tab and its private context, and guarantees both are
// released
//
// close() is the normal path. If the guard is dropped without it (an error
// returned early, or the render future was cancelled by a timeout), Drop
// spawns the release on the runtime captured at construction.
struct PageGuard {
    page: Option<Page>,
    context_id: Option<BrowserContextId>,
    session: Arc<RwLock<BrowserSession>>,
    url: String,
    runtime: tokio::runtime::Handle,
}

impl PageGuard {
    fn new(
        page: Page,
        context_id: BrowserContextId,
        session: Arc<RwLock<BrowserSession>>,
        url: String,
    ) -> Self {
        Self {
            page: Some(page),
            context_id: Some(context_id),
            session,
            url,
            runtime: tokio::runtime::Handle::current(),
        }
    }

    fn page(&self) -> Result<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| anyhow!("browser tab for {} already closed", self.url))
    }

    async fn close(mut self) -> Result<()> {
        let page = self.page.take();
        let context_id = self.context_id.take();
        release(page, context_id, Arc::clone(&self.session)).await?;
        debug!(url = %self.url, "browser tab closed");
        Ok(())
    }
}

// Closes the tab, then disposes its context (which would also close any
// tab the page opened itself)
async fn release(
    page: Option<Page>,
    context_id: Option<BrowserContextId>,
    session: Arc<RwLock<BrowserSession>>,
) -> Result<()> {
    let closed = match page {
        Some(page) => page.close().await.map_err(anyhow::Error::from),
        None => Ok(()),
    };

    if let Some(context_id) = context_id {
        session
            .read()
            .await
            .browser
            .dispose_browser_context(context_id)
            .await
            .context("failed to dispose browser context")?;
    }

    closed
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if self.page.is_none() && self.context_id.is_none() {
            return;
        }

        let page = self.page.take();
        let context_id = self.context_id.take();
        let session = Arc::clone(&self.session);
        let url = std::mem::take(&mut self.url);
        self.runtime.spawn(async move {
            if let Err(e) = release(page, context_id, session).await {
                warn!(url = %url, error = %e, "deferred tab close failed");
            }
        });
    }
}
