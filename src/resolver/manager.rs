//! # Source resolution
//!
//! [`SourceResolver`] turns an episode page or player URL into a playable
//! stream. It gathers candidate player URLs, then tries an ordered list of
//! [`Strategy`] values on each candidate until one yields a video URL.
//! Failures at this level never propagate; they move the resolver on to the
//! next strategy or candidate.
//!
//! ## Strategy order
//!
//! Redirect-provider players (matched by URL shape) go through
//! [`Strategy::RedirectThenRender`]:
//!
//! 1. follow one short-link redirect to find the real embed target
//! 2. read the live `<video>` element through the headless browser
//! 3. scan the rendered redirect target for literal or encoded URLs
//!
//! Each step runs only when the previous one produced nothing. Every other
//! candidate gets [`Strategy::PatternScan`] followed by
//! [`Strategy::UpstreamApi`].
//!
//! ## Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fetch_relay::{BrowserHandle, PageFetcher, Settings, SourceResolver};
//!
//! # tokio_test::block_on(async {
//! let settings = Arc::new(Settings::default());
//! let browser = Arc::new(BrowserHandle::new(settings.browser.clone()));
//! let fetcher = Arc::new(PageFetcher::new(settings.clone(), browser.clone())?);
//! let resolver = SourceResolver::new(settings, fetcher, browser)?;
//!
//! if let Some(source) = resolver.resolve("https://site.example/episode-1/", None).await {
//!     println!("{} ({} variants)", source.video_url, source.variants.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{LOCATION, REFERER};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use super::extract::{
    ApiCall, find_api_call, find_player_candidates, find_poster_url, find_stream_url, player_id,
    redirect_id,
};
use super::variants::parse_variants;
use crate::{
    Error, Result,
    browser::{BrowserHandle, HeadlessRenderer, MediaElement},
    config::Settings,
    fetch::{
        PageFetcher,
        backends::{build_http_client, build_redirectless_client},
    },
    relay::is_manifest,
    types::{FetchOptions, ResolvedSource, StreamVariant},
};

/// Reads the media element of a rendered player page
#[async_trait]
pub trait MediaElementProbe: Send + Sync + std::fmt::Debug {
    async fn probe(&self, player_url: &str, embed_marker: &str) -> Result<Option<MediaElement>>;
}

#[async_trait]
impl MediaElementProbe for HeadlessRenderer {
    async fn probe(&self, player_url: &str, embed_marker: &str) -> Result<Option<MediaElement>> {
        self.extract_media_element(player_url, embed_marker).await
    }
}

/// One way of turning a candidate URL into a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Short-link redirect, then live media element, then scans of the target
    RedirectThenRender,
    /// Literal, config-field and encoded URL scans of the candidate page
    PatternScan,
    /// Form POST to the generic resolution API named on the page
    UpstreamApi,
}

const REDIRECT_STRATEGIES: &[Strategy] = &[Strategy::RedirectThenRender];
const PAGE_STRATEGIES: &[Strategy] = &[Strategy::PatternScan, Strategy::UpstreamApi];

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiReply {
    File(String),
    Details {
        file: Option<String>,
        poster: Option<String>,
        title: Option<String>,
    },
}

/// Resolves pages and players to playable sources
#[derive(Debug)]
pub struct SourceResolver {
    settings: Arc<Settings>,
    fetcher: Arc<PageFetcher>,
    client: Client,
    redirectless: Client,
    probe: Arc<dyn MediaElementProbe>,
}

impl SourceResolver {
    /// Resolver using the shared browser for media element reads
    pub fn new(
        settings: Arc<Settings>,
        fetcher: Arc<PageFetcher>,
        browser: Arc<BrowserHandle>,
    ) -> Result<Self> {
        let probe = Arc::new(HeadlessRenderer::new(
            browser,
            settings.fetch.user_agent.clone(),
        ));
        Self::with_probe(settings, fetcher, probe)
    }

    /// Resolver with an explicit media element probe
    pub fn with_probe(
        settings: Arc<Settings>,
        fetcher: Arc<PageFetcher>,
        probe: Arc<dyn MediaElementProbe>,
    ) -> Result<Self> {
        Ok(Self {
            client: build_http_client(&settings)?,
            redirectless: build_redirectless_client(&settings)?,
            settings,
            fetcher,
            probe,
        })
    }

    /// Whether `url` belongs to a provider that needs short-link indirection
    pub fn is_redirect_provider(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        let resolver = &self.settings.resolver;
        let short_host = Url::parse(&resolver.short_link_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase));

        lower.contains(&resolver.redirect_path_marker.to_lowercase())
            || lower.contains(&resolver.embed_host_marker.to_lowercase())
            || short_host.is_some_and(|host| lower.contains(&host))
    }

    fn strategies_for(&self, candidate: &str) -> &'static [Strategy] {
        if self.is_redirect_provider(candidate) {
            REDIRECT_STRATEGIES
        } else {
            PAGE_STRATEGIES
        }
    }

    /// Resolve `url` to a playable source, or `None` when every strategy
    /// and candidate is exhausted
    pub async fn resolve(&self, url: &str, referer: Option<&str>) -> Option<ResolvedSource> {
        let candidates = self.candidates(url).await;
        debug!("Resolving {} across {} candidate(s)", url, candidates.len());

        for candidate in &candidates {
            for strategy in self.strategies_for(candidate) {
                match self.run(*strategy, candidate, referer).await {
                    Ok(Some(source)) => {
                        info!("Resolved {} via {:?} on {}", url, strategy, candidate);
                        return Some(self.with_variants(source).await);
                    }
                    Ok(None) => debug!("{:?} found nothing on {}", strategy, candidate),
                    Err(e) if e.is_recoverable() => {
                        debug!("{:?} failed on {}: {}", strategy, candidate, e)
                    }
                    Err(e) => warn!("{:?} failed on {}: {}", strategy, candidate, e),
                }
            }
        }

        warn!("No playable source found for {}", url);
        None
    }

    /// [`resolve`](Self::resolve) with exhaustion reported as
    /// [`Error::NoPlayableSource`]
    pub async fn resolve_required(&self, url: &str, referer: Option<&str>) -> Result<ResolvedSource> {
        self.resolve(url, referer)
            .await
            .ok_or_else(|| Error::no_playable_source(url))
    }

    /// The URL itself followed by embedded players, redirect providers first
    async fn candidates(&self, url: &str) -> Vec<String> {
        let mut candidates = vec![url.to_string()];

        if !self.is_redirect_provider(url)
            && let Ok(base) = Url::parse(url)
            && let Some(html) = self.page_text(url).await
        {
            candidates.extend(
                find_player_candidates(&html, &base)
                    .into_iter()
                    .filter(|c| c != url),
            );
        }

        // Stable sort keeps document order within each group.
        candidates.sort_by_key(|c| !self.is_redirect_provider(c));
        candidates.truncate(self.settings.resolver.max_candidates.max(1));
        candidates
    }

    async fn page_text(&self, url: &str) -> Option<String> {
        match self.fetcher.fetch(url, &FetchOptions::new()).await {
            Ok(html) => Some(html),
            Err(e) => {
                warn!("Could not fetch {}: {}", url, e);
                None
            }
        }
    }

    async fn run(
        &self,
        strategy: Strategy,
        candidate: &str,
        referer: Option<&str>,
    ) -> Result<Option<ResolvedSource>> {
        match strategy {
            Strategy::RedirectThenRender => self.redirect_then_render(candidate).await,
            Strategy::PatternScan => Ok(self.pattern_scan(candidate, referer).await),
            Strategy::UpstreamApi => self.upstream_api(candidate, referer).await,
        }
    }

    async fn pattern_scan(&self, candidate: &str, referer: Option<&str>) -> Option<ResolvedSource> {
        let html = self.page_text(candidate).await?;
        if self.fetcher.rules().is_blocked(&html, 200) {
            return None;
        }
        let video = find_stream_url(&html)?;
        let referer = referer.map(str::to_string).unwrap_or_else(|| candidate.to_string());
        Some(
            ResolvedSource::new(video)
                .with_poster(find_poster_url(&html))
                .with_referer(Some(referer)),
        )
    }

    async fn upstream_api(
        &self,
        candidate: &str,
        referer: Option<&str>,
    ) -> Result<Option<ResolvedSource>> {
        let embedded = match self.page_text(candidate).await {
            Some(html) => find_api_call(&html),
            None => None,
        };
        let call = match embedded {
            Some(call) => call,
            None => match (&self.settings.resolver.default_api_origin, player_id(candidate)) {
                (Some(origin), Some(id)) => ApiCall::new(origin.as_str(), id),
                _ => return Ok(None),
            },
        };

        // `r` names the embedding player; the caller's referer only stands in
        // when there is none.
        let embedding = Some(candidate)
            .filter(|c| !c.is_empty())
            .or(referer)
            .unwrap_or_default();
        let host = call.host().unwrap_or_default();
        let form = [("r", embedding), ("d", host.as_str())];
        let endpoint = call.endpoint();
        let response = self
            .client
            .post(&endpoint)
            .header(REFERER, call.referer())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::upstream(status.as_u16(), endpoint));
        }

        let reply: ApiReply = match serde_json::from_str(&response.text().await?) {
            Ok(reply) => reply,
            Err(e) => {
                debug!("Unreadable reply from {}: {}", endpoint, e);
                return Ok(None);
            }
        };

        let (file, poster, title) = match reply {
            ApiReply::File(file) => (Some(file), None, None),
            ApiReply::Details {
                file,
                poster,
                title,
            } => (file, poster, title),
        };
        let Some(file) = file.filter(|f| !f.is_empty()) else {
            return Ok(None);
        };

        let mut source = ResolvedSource::new(file)
            .with_poster(poster)
            .with_referer(Some(call.referer()));
        source.title = title.filter(|t| !t.is_empty());
        Ok(Some(source))
    }

    async fn redirect_then_render(&self, candidate: &str) -> Result<Option<ResolvedSource>> {
        let Some(id) = redirect_id(candidate) else {
            return Ok(None);
        };
        let target = self.follow_short_link(&id, candidate).await;

        match self
            .probe
            .probe(candidate, &self.settings.resolver.embed_host_marker)
            .await
        {
            Ok(Some(media)) => {
                let mut source = ResolvedSource::new(media.video).with_poster(Some(media.poster));
                source.direct = true;
                return Ok(Some(source));
            }
            Ok(None) => {}
            Err(e) => warn!("Media element probe unavailable: {}", e),
        }

        let Some(html) = self.render_redirect_target(&target).await else {
            return Ok(None);
        };
        if self.fetcher.rules().is_blocked(&html, 200) {
            return Ok(None);
        }
        let Some(video) = find_stream_url(&html) else {
            return Ok(None);
        };
        Ok(Some(
            ResolvedSource::new(video)
                .with_poster(find_poster_url(&html))
                .with_referer(Some(target)),
        ))
    }

    /// One manual-redirect request; any failure keeps the short link itself
    async fn follow_short_link(&self, id: &str, player_url: &str) -> String {
        let short = format!(
            "{}/{}",
            self.settings.resolver.short_link_url.trim_end_matches('/'),
            id
        );
        let response = match self
            .redirectless
            .get(&short)
            .header(REFERER, player_url)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!("Short link {} unreachable: {}", short, e);
                return short;
            }
        };

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|location| Url::parse(&short).ok()?.join(location).ok())
            .map(String::from)
            .unwrap_or(short)
    }

    /// Fetch the redirect target, retrying once with headless rendering when blocked
    async fn render_redirect_target(&self, target: &str) -> Option<String> {
        match self.fetcher.fetch(target, &FetchOptions::new()).await {
            Ok(html) => Some(html),
            Err(Error::Blocked { .. }) if !self.settings.fetch.allow_headless_render => {
                info!("Redirect target {} blocked, retrying headless", target);
                let options = FetchOptions::new().with_headless_render(true);
                self.fetcher.fetch(target, &options).await.ok()
            }
            Err(e) => {
                debug!("Redirect target {} unavailable: {}", target, e);
                None
            }
        }
    }

    /// Attach manifest variants; live media element URLs are played as-is
    async fn with_variants(&self, mut source: ResolvedSource) -> ResolvedSource {
        if source.direct {
            return source;
        }
        source.variants = self
            .fetch_variants(&source.video_url, source.referer.as_deref())
            .await;
        source
    }

    /// Variants of a master manifest; empty for anything else or on failure
    pub async fn fetch_variants(&self, url: &str, referer: Option<&str>) -> Vec<StreamVariant> {
        let Ok(base) = Url::parse(url) else {
            return Vec::new();
        };
        if !matches!(base.scheme(), "http" | "https") || !is_manifest(url, None) {
            return Vec::new();
        }

        let mut request = self.client.get(base.clone());
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }
        let text = match request.send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(text) => text,
                Err(_) => return Vec::new(),
            },
            Ok(response) => {
                debug!("Manifest {} returned {}", url, response.status());
                return Vec::new();
            }
            Err(e) => {
                debug!("Manifest {} unreachable: {}", url, e);
                return Vec::new();
            }
        };

        if !text.contains("#EXT-X-STREAM-INF") {
            return Vec::new();
        }
        parse_variants(&text, &base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{DirectFetch, Escalation, EscalationKind, FetchedPage, RenderBackend};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Default)]
    struct ScriptedProbe {
        media: Option<MediaElement>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MediaElementProbe for ScriptedProbe {
        async fn probe(&self, _player_url: &str, _marker: &str) -> Result<Option<MediaElement>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.media.clone())
        }
    }

    /// Stands in for the headless browser with a fixed rendered page
    #[derive(Debug)]
    struct RenderedPage {
        html: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RenderBackend for RenderedPage {
        async fn attempt(&self, _url: &Url, _options: &FetchOptions) -> Result<FetchedPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FetchedPage::new(200, self.html.clone()))
        }

        fn name(&self) -> &'static str {
            "rendered"
        }
    }

    fn resolver_with(settings: Settings, probe: Arc<ScriptedProbe>) -> SourceResolver {
        resolver_with_escalations(settings, probe, Vec::new())
    }

    fn resolver_with_escalations(
        settings: Settings,
        probe: Arc<ScriptedProbe>,
        escalations: Vec<Escalation>,
    ) -> SourceResolver {
        let settings = Arc::new(settings);
        let client = build_http_client(&settings).unwrap();
        let direct: Arc<dyn RenderBackend> = Arc::new(DirectFetch::new(client, settings.clone()));
        let fetcher = Arc::new(PageFetcher::with_backends(
            settings.clone(),
            direct,
            escalations,
        ));
        SourceResolver::with_probe(settings, fetcher, probe).unwrap()
    }

    fn encode(value: &str) -> String {
        url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
    }

    async fn mount_page(server: &MockServer, at: &str, html: String) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .mount(server)
            .await;
    }

    fn short_link_settings(server: &MockServer) -> Settings {
        let mut settings = Settings::default();
        settings.resolver.short_link_url = server.uri();
        settings
    }

    #[test]
    fn test_redirect_provider_shapes() {
        let resolver = resolver_with(Settings::default(), Arc::default());

        assert!(resolver.is_redirect_provider("https://site.example/hydrax/?v=1"));
        assert!(resolver.is_redirect_provider("https://SHORT.ICU/abc"));
        assert!(resolver.is_redirect_provider("https://abysscdn.com/?v=abc"));
        assert!(!resolver.is_redirect_provider("https://cloud.example/video.php?id=1"));

        assert_eq!(
            resolver.strategies_for("https://short.icu/abc"),
            &[Strategy::RedirectThenRender]
        );
        assert_eq!(
            resolver.strategies_for("https://player.example/e/1"),
            &[Strategy::PatternScan, Strategy::UpstreamApi]
        );
    }

    #[tokio::test]
    async fn test_media_element_wins_after_redirect() {
        let probe = Arc::new(ScriptedProbe {
            media: Some(MediaElement {
                video: "https://edge.example/v/master.m3u8".to_string(),
                poster: String::new(),
            }),
            ..Default::default()
        });
        let mut settings = Settings::default();
        // Unroutable short-link service: the redirect step must fall back quietly.
        settings.resolver.short_link_url = "http://127.0.0.1:9".to_string();
        let resolver = resolver_with(settings, probe.clone());

        let source = resolver
            .resolve("https://site.example/hydrax/?v=abc", None)
            .await
            .unwrap();

        assert!(source.direct);
        assert_eq!(source.video_url, "https://edge.example/v/master.m3u8");
        assert_eq!(source.poster_url, None);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unresolvable_url_is_none() {
        let mut settings = Settings::default();
        settings.resolver.short_link_url = "http://127.0.0.1:9".to_string();
        let resolver = resolver_with(settings, Arc::default());

        let err = resolver
            .resolve_required("not a url", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoPlayableSource { .. }));
    }

    #[tokio::test]
    async fn test_upstream_api_posts_player_url_and_host() {
        let server = MockServer::start().await;
        let player = format!("{}/embed/9", server.uri());
        let call_page = format!("{}/video.php?id=abc9", server.uri());
        mount_page(
            &server,
            "/embed/9",
            format!(r#"<script>load("{}");</script>"#, call_page),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/api2.php"))
            .and(query_param("id", "abc9"))
            .and(header("referer", call_page.as_str()))
            .and(body_string_contains(format!("r={}", encode(&player))))
            .and(body_string_contains("d=127.0.0.1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "file": format!("{}/v/film.mp4", server.uri()),
                "poster": "https://img.example/p.jpg",
                "title": "Film 9"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resolver = resolver_with(Settings::default(), Arc::default());
        let source = resolver
            .resolve(&player, Some("https://site.example/film/page"))
            .await
            .unwrap();

        assert_eq!(source.video_url, format!("{}/v/film.mp4", server.uri()));
        assert_eq!(source.poster_url.as_deref(), Some("https://img.example/p.jpg"));
        assert_eq!(source.title.as_deref(), Some("Film 9"));
        assert_eq!(source.referer.as_deref(), Some(call_page.as_str()));
        assert!(!source.direct);
    }

    #[tokio::test]
    async fn test_failed_api_moves_to_next_candidate() {
        let server = MockServer::start().await;
        let uri = server.uri();
        mount_page(
            &server,
            "/film",
            r#"<iframe src="/embed/1"></iframe><iframe src="/embed/2"></iframe>"#.to_string(),
        )
        .await;
        mount_page(&server, "/embed/1", format!("{}/video.php?id=bad1", uri)).await;
        mount_page(&server, "/embed/2", format!("{}/video.php?id=good2", uri)).await;
        Mock::given(method("POST"))
            .and(path("/api2.php"))
            .and(query_param("id", "bad1"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api2.php"))
            .and(query_param("id", "good2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!(format!("{}/v/good.mp4", uri))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let resolver = resolver_with(Settings::default(), Arc::default());
        let source = resolver.resolve(&format!("{}/film", uri), None).await.unwrap();

        assert_eq!(source.video_url, format!("{}/v/good.mp4", uri));
        assert_eq!(source.title, None);
    }

    #[tokio::test]
    async fn test_default_api_origin_uses_player_id() {
        let server = MockServer::start().await;
        let player = format!("{}/player/xyz7", server.uri());
        mount_page(&server, "/player/xyz7", "<p>loading</p>".to_string()).await;
        Mock::given(method("POST"))
            .and(path("/api2.php"))
            .and(query_param("id", "xyz7"))
            .and(body_string_contains(format!("r={}", encode(&player))))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "file": format!("{}/v/x.mp4", server.uri())
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut settings = Settings::default();
        settings.resolver.default_api_origin = Some(server.uri());
        let resolver = resolver_with(settings, Arc::default());
        let source = resolver.resolve(&player, None).await.unwrap();

        assert_eq!(source.video_url, format!("{}/v/x.mp4", server.uri()));
        assert_eq!(
            source.referer,
            Some(format!("{}/video.php?id=xyz7", server.uri()))
        );
    }

    #[tokio::test]
    async fn test_short_link_target_is_scanned() {
        let server = MockServer::start().await;
        let uri = server.uri();
        let player = format!("{}/hydrax/?v=Qw3", uri);
        let master = format!("{}/a/master.m3u8", uri);
        Mock::given(method("GET"))
            .and(path("/Qw3"))
            .and(header("referer", player.as_str()))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/target/Qw3"))
            .expect(1)
            .mount(&server)
            .await;
        mount_page(
            &server,
            "/target/Qw3",
            format!(r#"<script>var src = "{}";</script>"#, master),
        )
        .await;
        mount_page(
            &server,
            "/a/master.m3u8",
            "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360\nlow/index.m3u8\n"
                .to_string(),
        )
        .await;

        let probe = Arc::new(ScriptedProbe::default());
        let resolver = resolver_with(short_link_settings(&server), probe.clone());
        let source = resolver.resolve(&player, None).await.unwrap();

        assert_eq!(source.video_url, master);
        assert_eq!(source.referer, Some(format!("{}/target/Qw3", uri)));
        assert!(!source.direct);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.variants.len(), 1);
        assert_eq!(source.variants[0].label, "360p");
        assert_eq!(source.variants[0].url, format!("{}/a/low/index.m3u8", uri));
    }

    #[tokio::test]
    async fn test_blocked_redirect_target_retried_headless() {
        let server = MockServer::start().await;
        let uri = server.uri();
        Mock::given(method("GET"))
            .and(path("/Zx1"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/target/Zx1"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/target/Zx1"))
            .respond_with(
                ResponseTemplate::new(403).set_body_string("<title>Just a moment...</title>"),
            )
            .mount(&server)
            .await;

        let rendered = Arc::new(RenderedPage {
            html: r#"<video src="https://edge.example/b/film.mp4"></video>"#.to_string(),
            calls: AtomicUsize::new(0),
        });
        let escalations = vec![Escalation {
            kind: EscalationKind::HeadlessRender,
            backend: rendered.clone(),
        }];
        let resolver =
            resolver_with_escalations(short_link_settings(&server), Arc::default(), escalations);

        let source = resolver
            .resolve(&format!("{}/hydrax/?v=Zx1", uri), None)
            .await
            .unwrap();

        assert_eq!(source.video_url, "https://edge.example/b/film.mp4");
        assert_eq!(source.referer, Some(format!("{}/target/Zx1", uri)));
        assert_eq!(rendered.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_still_blocked_redirect_target_yields_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Zx2"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/target/Zx2"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/target/Zx2"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Checking your browser"))
            .mount(&server)
            .await;

        let resolver = resolver_with(short_link_settings(&server), Arc::default());
        let result = resolver
            .resolve(&format!("{}/hydrax/?v=Zx2", server.uri()), None)
            .await;
        assert_eq!(result, None);
    }
}
