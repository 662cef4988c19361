//! Escalating page fetcher
//!
//! [`PageFetcher`] tries a direct request first and, when the answer is a
//! challenge page, walks the escalation list in order. The first permitted
//! escalation is trusted without re-classification.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fetch_relay::{BrowserHandle, PageFetcher, Settings};
//! use fetch_relay::types::FetchOptions;
//!
//! # tokio_test::block_on(async {
//! let settings = Arc::new(Settings::default());
//! let browser = Arc::new(BrowserHandle::new(settings.browser.clone()));
//! let fetcher = PageFetcher::new(settings, browser)?;
//!
//! let html = fetcher
//!     .fetch("https://example.com/", &FetchOptions::new().with_remote_render(true))
//!     .await?;
//! println!("{} bytes", html.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use super::backends::{DirectFetch, RemoteRenderProxy, RenderBackend, build_http_client};
use super::cache::PageCache;
use super::classifier::BlockRules;
use crate::{
    Error, Result,
    browser::{BrowserHandle, HeadlessRenderer},
    config::Settings,
    types::FetchOptions,
};

/// Which option gates an escalation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationKind {
    RemoteRender,
    HeadlessRender,
}

impl EscalationKind {
    pub fn permitted(self, options: &FetchOptions) -> bool {
        match self {
            Self::RemoteRender => options.allow_remote_render,
            Self::HeadlessRender => options.allow_headless_render,
        }
    }
}

/// One step of the escalation list
#[derive(Debug, Clone)]
pub struct Escalation {
    pub kind: EscalationKind,
    pub backend: Arc<dyn RenderBackend>,
}

/// Page fetcher with challenge detection, escalation and caching
#[derive(Debug)]
pub struct PageFetcher {
    settings: Arc<Settings>,
    direct: Arc<dyn RenderBackend>,
    escalations: Vec<Escalation>,
    rules: BlockRules,
    cache: PageCache,
}

impl PageFetcher {
    /// Fetcher with the direct, remote-render and headless backends
    pub fn new(settings: Arc<Settings>, browser: Arc<BrowserHandle>) -> Result<Self> {
        let client = build_http_client(&settings)?;
        let direct = Arc::new(DirectFetch::new(client.clone(), settings.clone()));
        let remote = Arc::new(RemoteRenderProxy::new(
            client,
            settings.fetch.remote_render_url.clone(),
        ));
        let headless = Arc::new(HeadlessRenderer::new(browser, settings.fetch.user_agent.clone()));

        Ok(Self::with_backends(
            settings,
            direct,
            vec![
                Escalation {
                    kind: EscalationKind::RemoteRender,
                    backend: remote,
                },
                Escalation {
                    kind: EscalationKind::HeadlessRender,
                    backend: headless,
                },
            ],
        ))
    }

    /// Fetcher over explicit backends
    pub fn with_backends(
        settings: Arc<Settings>,
        direct: Arc<dyn RenderBackend>,
        escalations: Vec<Escalation>,
    ) -> Self {
        let rules = BlockRules::with_extra_markers(&settings.fetch.block_markers);
        let cache = PageCache::new(settings.fetch.cache_ttl());
        Self {
            settings,
            direct,
            escalations,
            rules,
            cache,
        }
    }

    /// Page text for `url`.
    ///
    /// # Errors
    ///
    /// - [`Error::Blocked`] when every permitted strategy returned a challenge
    /// - [`Error::RendererUnavailable`] when headless rendering was needed but
    ///   the browser could not be started
    /// - the direct transport error when no escalation is permitted
    pub async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<String> {
        if let Some(cached) = self.cache.get(url).await {
            debug!("Page cache hit: {}", url);
            return Ok(cached);
        }

        let target = Url::parse(url)?;
        let options = options.effective(&self.settings.fetch);

        match self.direct.attempt(&target, &options).await {
            Ok(page) if !self.rules.is_blocked(&page.body, page.status) => {
                self.cache.put(url, page.body.clone()).await;
                return Ok(page.body);
            }
            Ok(page) => {
                info!("Challenge detected for {} (status {})", url, page.status);
            }
            Err(e) if !options.can_escalate() => return Err(e),
            Err(e) => {
                warn!("Direct fetch of {} failed, escalating: {}", url, e);
            }
        }

        for step in &self.escalations {
            if !step.kind.permitted(&options) {
                continue;
            }
            debug!("Escalating {} via {}", url, step.backend.name());
            let page = step.backend.attempt(&target, &options).await?;
            self.cache.put(url, page.body.clone()).await;
            return Ok(page.body);
        }

        Err(Error::blocked(url))
    }

    /// Drop every cached page
    pub async fn invalidate_cache(&self) {
        self.cache.clear().await;
        info!("Page cache cleared");
    }

    pub fn rules(&self) -> &BlockRules {
        &self.rules
    }
}
