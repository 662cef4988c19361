//! Shared headless browser
//!
//! One Chrome process per [`BrowserHandle`], launched on first use and
//! relaunched if its connection is lost. Every render leases its own page;
//! the lease closes the page even when the caller's future is dropped
//! mid-render.

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{Error, Result, config::settings::BrowserSettings};

#[derive(Debug)]
struct LaunchedBrowser {
    browser: RwLock<Browser>,
    handler: JoinHandle<()>,
}

impl LaunchedBrowser {
    fn is_alive(&self) -> bool {
        event_loop_alive(&self.handler)
    }
}

/// The CDP event loop ends when the connection to Chrome is lost
fn event_loop_alive(handler: &JoinHandle<()>) -> bool {
    !handler.is_finished()
}

/// Lazily launched, process-wide browser
#[derive(Debug)]
pub struct BrowserHandle {
    settings: BrowserSettings,
    slot: Mutex<Option<Arc<LaunchedBrowser>>>,
    closed: AtomicBool,
}

impl BrowserHandle {
    /// Create a handle; nothing is launched until the first page is leased
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings,
            slot: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &BrowserSettings {
        &self.settings
    }

    /// Whether a browser process is currently running
    pub fn is_launched(&self) -> bool {
        matches!(
            self.slot.try_lock().as_deref(),
            Ok(Some(launched)) if launched.is_alive()
        )
    }

    /// Chrome configuration derived from settings
    pub fn launch_config(settings: &BrowserSettings) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg(format!("--lang={}", settings.locale));

        if settings.block_assets {
            builder = builder.arg("--blink-settings=imagesEnabled=false");
        }
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &settings.executable {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(Error::renderer_unavailable)
    }

    async fn launch(&self) -> Result<LaunchedBrowser> {
        let config = Self::launch_config(&self.settings)?;
        info!("Launching headless browser");
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| Error::renderer_unavailable(e.to_string()))?;

        let task = tokio::spawn(async move {
            while handler.next().await.is_some() {}
            debug!("Browser event loop finished");
        });

        Ok(LaunchedBrowser {
            browser: RwLock::new(browser),
            handler: task,
        })
    }

    /// The running browser, launching or relaunching it as needed.
    ///
    /// The slot lock is held across the launch, so concurrent first callers
    /// share one process. A failed launch leaves the slot empty and the next
    /// call retries.
    async fn launched(&self) -> Result<Arc<LaunchedBrowser>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::renderer_unavailable("browser has been shut down"));
        }

        let mut slot = self.slot.lock().await;
        if let Some(launched) = slot.as_ref() {
            if launched.is_alive() {
                return Ok(launched.clone());
            }
            warn!("Browser connection lost, relaunching");
            if let Some(dead) = slot.take() {
                dead.handler.abort();
                if let Some(Err(e)) = dead.browser.write().await.kill().await {
                    debug!("Killing lost browser failed: {}", e);
                }
            }
        }

        let launched = Arc::new(self.launch().await?);
        *slot = Some(launched.clone());
        Ok(launched)
    }

    /// Open a blank page scoped to the caller
    ///
    /// # Errors
    ///
    /// [`Error::RendererUnavailable`] when Chrome cannot be started, or
    /// [`Error::Browser`] when the running browser refuses a new tab.
    pub async fn new_page(&self) -> Result<PageLease> {
        let launched = self.launched().await?;
        let browser = launched.browser.read().await;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| Error::browser(format!("failed to open page: {}", e)))?;
        Ok(PageLease { page: Some(page) })
    }

    /// Close the browser process; safe to call more than once
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(launched) = self.slot.lock().await.take() else {
            return;
        };

        info!("Closing headless browser");
        let mut browser = launched.browser.write().await;
        if let Err(e) = browser.close().await {
            warn!("Browser close failed: {}", e);
        }
        if let Err(e) = browser.wait().await {
            warn!("Waiting for browser exit failed: {}", e);
        }
        launched.handler.abort();
    }
}

/// A page owned by one render call
#[derive(Debug)]
pub struct PageLease {
    page: Option<Page>,
}

impl PageLease {
    /// Close the page now
    pub async fn release(mut self) {
        if let Some(page) = self.page.take()
            && let Err(e) = page.close().await
        {
            debug!("Page close failed: {}", e);
        }
    }
}

impl Deref for PageLease {
    type Target = Page;

    fn deref(&self) -> &Page {
        // Only `release` and `drop` take the page, and both consume the lease.
        self.page.as_ref().unwrap_or_else(|| unreachable!("page lease already released"))
    }
}

impl Drop for PageLease {
    fn drop(&mut self) {
        if let Some(page) = self.page.take()
            && let Ok(runtime) = tokio::runtime::Handle::try_current()
        {
            runtime.spawn(async move {
                let _ = page.close().await;
            });
        }
    }
}
