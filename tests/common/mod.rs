//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

/// Test helper functions
#[allow(dead_code)]
pub mod helpers {
    use axum::{Router, body::Body, http::Request, response::Response};
    use fetch_relay::{
        config::Settings,
        server::{AppState, create_app},
    };
    use tower::ServiceExt;

    /// Settings with escalation off and short timeouts
    pub fn create_test_settings() -> Settings {
        let mut settings = Settings::default();
        settings.fetch.allow_remote_render = false;
        settings.fetch.allow_headless_render = false;
        settings.fetch.request_timeout_secs = 5;
        settings
    }

    /// Router over freshly built state
    pub fn create_test_app(settings: Settings) -> Router {
        create_app(AppState::new(settings).expect("state builds"))
    }

    /// Encode a value for a query string
    pub fn encode(value: &str) -> String {
        url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
    }

    /// Send one request through the router
    pub async fn send(app: Router, request: Request<Body>) -> Response {
        app.oneshot(request).await.expect("router is infallible")
    }

    /// Collect a response body as text
    pub async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        String::from_utf8(bytes.to_vec()).expect("utf-8 body")
    }
}
