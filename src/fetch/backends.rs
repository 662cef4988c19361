//! Page text strategies
//!
//! Each backend makes exactly one attempt per call. The fetcher decides
//! which ones run and in what order.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT_LANGUAGE, COOKIE, HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use url::Url;

use crate::{
    Error, Result,
    config::Settings,
    types::FetchOptions,
};

/// Status and body produced by one backend attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// A strategy for obtaining page text
#[async_trait]
pub trait RenderBackend: Send + Sync + std::fmt::Debug {
    /// Make one attempt at `url`
    async fn attempt(&self, url: &Url, options: &FetchOptions) -> Result<FetchedPage>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Build the shared outbound client
pub fn build_http_client(settings: &Settings) -> Result<Client> {
    Client::builder()
        .user_agent(settings.fetch.user_agent.clone())
        .timeout(settings.fetch.request_timeout())
        .build()
        .map_err(Error::from)
}

/// Build a client that surfaces redirects instead of following them
pub fn build_redirectless_client(settings: &Settings) -> Result<Client> {
    Client::builder()
        .user_agent(settings.fetch.user_agent.clone())
        .timeout(settings.fetch.request_timeout())
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(Error::from)
}

/// Plain request with browser-like headers
#[derive(Debug, Clone)]
pub struct DirectFetch {
    client: Client,
    settings: Arc<Settings>,
}

impl DirectFetch {
    pub fn new(client: Client, settings: Arc<Settings>) -> Self {
        Self { client, settings }
    }

    fn headers_for(&self, url: &Url, options: &FetchOptions) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&self.settings.fetch.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, value);
        }

        for (name, value) in &options.extra_headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!("Dropping invalid extra header: {}", name),
            }
        }

        if !headers.contains_key(COOKIE)
            && let Some(cookie) = self.settings.credentials.cookie_for(url.host_str())
            && let Ok(value) = HeaderValue::from_str(cookie)
        {
            headers.insert(COOKIE, value);
        }

        headers
    }
}

#[async_trait]
impl RenderBackend for DirectFetch {
    async fn attempt(&self, url: &Url, options: &FetchOptions) -> Result<FetchedPage> {
        let response = self
            .client
            .get(url.clone())
            .headers(self.headers_for(url, options))
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(FetchedPage::new(status, body))
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}

/// External text-extraction service addressed as `{base}/{target}`
#[derive(Debug, Clone)]
pub struct RemoteRenderProxy {
    client: Client,
    base_url: String,
}

impl RemoteRenderProxy {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn target_for(&self, url: &Url) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), url)
    }
}

#[async_trait]
impl RenderBackend for RemoteRenderProxy {
    async fn attempt(&self, url: &Url, _options: &FetchOptions) -> Result<FetchedPage> {
        let response = self.client.get(self.target_for(url)).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(FetchedPage::new(status, body))
    }

    fn name(&self) -> &'static str {
        "remote-render"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, headers, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings_with_cookie(cookie: Option<&str>) -> Arc<Settings> {
        let mut settings = Settings::default();
        settings.credentials.cookie = cookie.map(str::to_string);
        Arc::new(settings)
    }

    #[tokio::test]
    async fn test_direct_fetch_sends_browser_headers_and_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/list"))
            .and(headers(
                "accept-language",
                vec!["en-US", "en;q=0.9", "id;q=0.8"],
            ))
            .and(header("cookie", "cf_clearance=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let settings = settings_with_cookie(Some("cf_clearance=abc"));
        let backend = DirectFetch::new(build_http_client(&settings).unwrap(), settings);
        let url = Url::parse(&format!("{}/list", server.uri())).unwrap();

        let page = backend.attempt(&url, &FetchOptions::new()).await.unwrap();
        assert_eq!(page, FetchedPage::new(200, "<html>ok</html>"));
    }

    #[tokio::test]
    async fn test_caller_cookie_wins_over_configured_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("cookie", "session=caller"))
            .respond_with(ResponseTemplate::new(200).set_body_string("mine"))
            .expect(1)
            .mount(&server)
            .await;

        let settings = settings_with_cookie(Some("cf_clearance=abc"));
        let backend = DirectFetch::new(build_http_client(&settings).unwrap(), settings);
        let url = Url::parse(&server.uri()).unwrap();
        let options = FetchOptions::new().with_header("Cookie", "session=caller");

        let page = backend.attempt(&url, &options).await.unwrap();
        assert_eq!(page.body, "mine");
    }

    #[tokio::test]
    async fn test_direct_fetch_reports_challenge_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Just a moment..."))
            .mount(&server)
            .await;

        let settings = settings_with_cookie(None);
        let backend = DirectFetch::new(build_http_client(&settings).unwrap(), settings);
        let page = backend
            .attempt(&Url::parse(&server.uri()).unwrap(), &FetchOptions::new())
            .await
            .unwrap();
        assert_eq!(page.status, 403);
    }

    #[test]
    fn test_remote_render_target() {
        let proxy = RemoteRenderProxy::new(Client::new(), "https://r.jina.ai/");
        let url = Url::parse("https://site.example/page?x=1").unwrap();
        assert_eq!(
            proxy.target_for(&url),
            "https://r.jina.ai/https://site.example/page?x=1"
        );
    }

    #[tokio::test]
    async fn test_remote_render_returns_body_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/https://site.example/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Title: Home\n\nrendered"))
            .expect(1)
            .mount(&server)
            .await;

        let proxy = RemoteRenderProxy::new(Client::new(), server.uri());
        let page = proxy
            .attempt(&Url::parse("https://site.example/").unwrap(), &FetchOptions::new())
            .await
            .unwrap();
        assert_eq!(page.body, "Title: Home\n\nrendered");
    }
}
