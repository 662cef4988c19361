//! Axum application setup
//!
//! Creates the shared components once and wires routes and middleware.

use crate::{
    Result,
    browser::BrowserHandle,
    config::Settings,
    fetch::PageFetcher,
    relay::{PlaylistRewriter, RelayUrlBuilder, StreamRelay, stream::build_relay_client},
    resolver::SourceResolver,
};
use axum::{
    Router,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Application state shared across handlers
#[derive(Debug, Clone)]
pub struct AppState {
    /// Escalating page fetcher
    pub fetcher: Arc<PageFetcher>,
    /// Stream source resolver
    pub resolver: Arc<SourceResolver>,
    /// Media and image relay
    pub relay: Arc<StreamRelay>,
    /// Shared headless browser, shut down with the server
    pub browser: Arc<BrowserHandle>,
    /// Relay URL construction for API responses
    pub urls: RelayUrlBuilder,
    /// Application settings
    pub settings: Arc<Settings>,
    /// Server start time for uptime calculation
    pub start_time: std::time::Instant,
    /// Wall-clock start time reported by `/ping`
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Build every component from settings; the browser is not launched yet
    pub fn new(settings: Settings) -> Result<Self> {
        let settings = Arc::new(settings);
        let browser = Arc::new(BrowserHandle::new(settings.browser.clone()));
        let fetcher = Arc::new(PageFetcher::new(settings.clone(), browser.clone())?);
        let resolver = Arc::new(SourceResolver::new(
            settings.clone(),
            fetcher.clone(),
            browser.clone(),
        )?);

        let urls = RelayUrlBuilder::default();
        let relay = Arc::new(StreamRelay::new(
            build_relay_client(&settings)?,
            PlaylistRewriter::new(urls.clone()),
        ));

        Ok(Self {
            fetcher,
            resolver,
            relay,
            browser,
            urls,
            settings,
            start_time: std::time::Instant::now(),
            started_at: Utc::now(),
        })
    }
}

/// Create the main Axum application with routes and middleware
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/relay/media", get(super::handlers::relay_media))
        .route("/relay/image", get(super::handlers::relay_image))
        .route("/api/page", get(super::handlers::page))
        .route("/api/resolve", get(super::handlers::resolve))
        .route("/ping", get(super::handlers::ping))
        .route(
            "/invalidate_caches",
            post(super::handlers::invalidate_caches),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_create_app_routes_ping() {
        let state = AppState::new(Settings::default()).unwrap();
        let app = create_app(state);

        let response = app
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = create_app(AppState::new(Settings::default()).unwrap());
        let response = app
            .oneshot(Request::get("/api/stream").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_state_does_not_launch_browser() {
        let state = AppState::new(Settings::default()).unwrap();
        assert!(!state.browser.is_launched());
    }
}
