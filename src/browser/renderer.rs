//! Headless page rendering and media element extraction

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::FrameId;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, warn};
use url::Url;

use super::handle::{BrowserHandle, PageLease};
use crate::{
    Error, Result,
    fetch::backends::{FetchedPage, RenderBackend},
    types::FetchOptions,
};

const READY_STATE_JS: &str = "document.readyState";

/// Media URL read from a live `<video>` element
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MediaElement {
    pub video: String,
    pub poster: String,
}

/// Renders pages through the shared browser
#[derive(Debug, Clone)]
pub struct HeadlessRenderer {
    browser: Arc<BrowserHandle>,
    user_agent: String,
}

impl HeadlessRenderer {
    pub fn new(browser: Arc<BrowserHandle>, user_agent: impl Into<String>) -> Self {
        Self {
            browser,
            user_agent: user_agent.into(),
        }
    }

    /// Fully rendered document text of `url`
    pub async fn render(&self, url: &Url) -> Result<String> {
        let page = self.browser.new_page().await?;
        let result = self.render_on(&page, url).await;
        page.release().await;
        result
    }

    async fn render_on(&self, page: &PageLease, url: &Url) -> Result<String> {
        let settings = self.browser.settings();
        self.navigate(page, url.as_str()).await?;

        // Approximates network idle: wait for the load event, then settle.
        let deadline = Instant::now() + settings.navigation_timeout();
        while Instant::now() < deadline {
            let state = page
                .evaluate(READY_STATE_JS)
                .await
                .ok()
                .and_then(|r| r.into_value::<String>().ok());
            if state.as_deref() == Some("complete") {
                break;
            }
            sleep(settings.element_poll()).await;
        }

        sleep(settings.settle_delay()).await;
        page.content()
            .await
            .map_err(|e| Error::browser(format!("failed to read content: {}", e)))
    }

    async fn navigate(&self, page: &PageLease, url: &str) -> Result<()> {
        page.set_user_agent(self.user_agent.clone())
            .await
            .map_err(|e| Error::browser(e.to_string()))?;

        match timeout(self.browser.settings().navigation_timeout(), page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(Error::browser(format!("navigation to {} failed: {}", url, e))),
            Err(_) => Err(Error::timeout(format!("navigation to {}", url))),
        }
    }

    /// Read the playing media URL from a player page.
    ///
    /// Waits for a frame (at any depth) whose URL contains `embed_marker`,
    /// then for the `<video>` element inside that frame to report a source.
    /// The player stays loaded, so the frame keeps its embedding referer. A
    /// wait that runs out yields `Ok(None)`.
    pub async fn extract_media_element(
        &self,
        player_url: &str,
        embed_marker: &str,
    ) -> Result<Option<MediaElement>> {
        let page = self.browser.new_page().await?;
        let result = self.extract_on(&page, player_url, embed_marker).await;
        page.release().await;

        match result {
            Ok(found) => Ok(found),
            Err(e @ Error::RendererUnavailable(_)) => Err(e),
            Err(e) => {
                warn!("Media element extraction failed for {}: {}", player_url, e);
                Ok(None)
            }
        }
    }

    async fn extract_on(
        &self,
        page: &PageLease,
        player_url: &str,
        embed_marker: &str,
    ) -> Result<Option<MediaElement>> {
        let wait = self.browser.settings().element_wait();
        self.navigate(page, player_url).await?;

        let Some(frame) = self
            .poll(wait, move || async move { marked_frame(page, embed_marker).await })
            .await
        else {
            debug!("No {} frame appeared on {}", embed_marker, player_url);
            return Ok(None);
        };

        let frame = &frame;
        let media = self
            .poll(wait, move || async move {
                media_element_in(page, frame)
                    .await
                    .filter(|m| !m.video.is_empty())
            })
            .await;
        Ok(media)
    }

    /// Run `attempt` until it yields a value or `wait` runs out
    async fn poll<T, F, Fut>(&self, wait: Duration, mut attempt: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let deadline = Instant::now() + wait;
        loop {
            if let Some(value) = attempt().await {
                return Some(value);
            }
            if Instant::now() >= deadline {
                return None;
            }
            sleep(self.browser.settings().element_poll()).await;
        }
    }
}

/// First frame of `page` whose URL contains `marker`
async fn marked_frame(page: &PageLease, marker: &str) -> Option<FrameId> {
    let mut frames = Vec::new();
    for id in page.frames().await.ok()? {
        let url = page.frame_url(id.clone()).await.ok().flatten();
        frames.push((id, url));
    }
    find_marked_frame(frames, marker)
}

/// Media element read inside `frame`'s own execution context
async fn media_element_in(page: &PageLease, frame: &FrameId) -> Option<MediaElement> {
    let context = page.frame_execution_context(frame.clone()).await.ok()??;
    let params = EvaluateParams::builder()
        .expression(MEDIA_ELEMENT_JS)
        .context_id(context)
        .return_by_value(true)
        .build()
        .ok()?;
    page.evaluate_expression(params).await.ok()?.into_value().ok()
}

fn find_marked_frame<T>(
    frames: impl IntoIterator<Item = (T, Option<String>)>,
    marker: &str,
) -> Option<T> {
    frames
        .into_iter()
        .find(|(_, url)| url.as_deref().is_some_and(|u| u.contains(marker)))
        .map(|(id, _)| id)
}

const MEDIA_ELEMENT_JS: &str = r#"(() => {
    const v = document.querySelector('video');
    if (!v) return { video: '', poster: '' };
    return {
        video: v.currentSrc || v.src || v.getAttribute('src') || '',
        poster: v.getAttribute('poster') || ''
    };
})()"#;

#[async_trait]
impl RenderBackend for HeadlessRenderer {
    async fn attempt(&self, url: &Url, _options: &FetchOptions) -> Result<FetchedPage> {
        let html = self.render(url).await?;
        Ok(FetchedPage::new(200, html))
    }

    fn name(&self) -> &'static str {
        "headless"
    }
}
