//! Range-aware media relay
//!
//! Binary bodies are streamed straight from upstream to the client. Manifests
//! are buffered and rewritten so their references come back through here.

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::playlist::PlaylistRewriter;
use crate::{Error, Result, config::Settings};

pub const MANIFEST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
const MEDIA_CACHE_CONTROL: &str = "public, max-age=3600";
const IMAGE_CACHE_CONTROL: &str = "public, max-age=86400";

const MANIFEST_CONTENT_TYPES: &[&str] = &[
    "application/vnd.apple.mpegurl",
    "application/x-mpegurl",
    "audio/mpegurl",
];

static M3U8_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.m3u8($|\?)").expect("valid m3u8 regex"));

/// Whether a resource is an HLS manifest, by content type or URL shape
pub fn is_manifest(url: &str, content_type: Option<&str>) -> bool {
    if let Some(content_type) = content_type {
        let lower = content_type.to_ascii_lowercase();
        if MANIFEST_CONTENT_TYPES.iter().any(|t| lower.contains(t)) {
            return true;
        }
    }
    M3U8_PATH.is_match(url)
}

/// Client for relayed bodies: bounded connect, unbounded transfer
pub fn build_relay_client(settings: &Settings) -> Result<Client> {
    Client::builder()
        .user_agent(settings.fetch.user_agent.clone())
        .connect_timeout(settings.fetch.request_timeout())
        .build()
        .map_err(Error::from)
}

/// What the relay hands back to the HTTP layer
#[derive(Debug)]
pub enum RelayResponse {
    /// Rewritten manifest text
    Manifest(String),
    /// Upstream body streamed through with selected headers
    Passthrough {
        status: StatusCode,
        headers: HeaderMap,
        upstream: reqwest::Response,
    },
}

impl IntoResponse for RelayResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Manifest(body) => (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, MANIFEST_CONTENT_TYPE),
                    (header::CACHE_CONTROL, "no-cache"),
                ],
                body,
            )
                .into_response(),
            Self::Passthrough {
                status,
                headers,
                upstream,
            } => {
                // Dropping the body drops the upstream connection with it.
                let body = Body::from_stream(upstream.bytes_stream());
                (status, headers, body).into_response()
            }
        }
    }
}

/// Proxies media and images on behalf of the client
#[derive(Debug, Clone)]
pub struct StreamRelay {
    client: Client,
    rewriter: PlaylistRewriter,
}

impl StreamRelay {
    pub fn new(client: Client, rewriter: PlaylistRewriter) -> Self {
        Self { client, rewriter }
    }

    /// Relay one media request.
    ///
    /// # Errors
    ///
    /// [`Error::UpstreamUnavailable`] carrying the upstream status when the
    /// answer is neither 2xx nor 206; transport errors as [`Error::Network`].
    pub async fn relay(
        &self,
        target: &str,
        referer: Option<&str>,
        range: Option<&HeaderValue>,
    ) -> Result<RelayResponse> {
        let url = Url::parse(target)?;
        let mut request = self.client.get(url.clone());
        if let Some(referer) = referer {
            request = request.header(header::REFERER, referer);
        }
        if let Some(range) = range {
            request = request.header(header::RANGE, range.clone());
        }

        let upstream = request.send().await?;
        let status = upstream.status();
        if !status.is_success() && status != StatusCode::PARTIAL_CONTENT {
            return Err(Error::upstream(status.as_u16(), target));
        }

        let content_type = upstream
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if is_manifest(target, content_type.as_deref()) {
            let text = upstream.text().await?;
            debug!("Rewriting manifest {} ({} bytes)", target, text.len());
            return Ok(RelayResponse::Manifest(
                self.rewriter.rewrite(&text, &url, referer),
            ));
        }

        let mut headers = HeaderMap::new();
        for name in [
            header::CONTENT_TYPE,
            header::CONTENT_LENGTH,
            header::ACCEPT_RANGES,
            header::CONTENT_RANGE,
        ] {
            if let Some(value) = upstream.headers().get(&name) {
                headers.insert(name, value.clone());
            }
        }
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(MEDIA_CACHE_CONTROL),
        );

        Ok(RelayResponse::Passthrough {
            status,
            headers,
            upstream,
        })
    }

    /// Relay an image; the image URL doubles as referer when none is given
    pub async fn relay_image(&self, target: &str, referer: Option<&str>) -> Result<RelayResponse> {
        let url = Url::parse(target)?;
        let upstream = self
            .client
            .get(url)
            .header(header::REFERER, referer.unwrap_or(target))
            .send()
            .await?;

        let status = upstream.status();
        if !status.is_success() {
            return Err(Error::upstream(status.as_u16(), target));
        }

        let mut headers = HeaderMap::new();
        if let Some(value) = upstream.headers().get(header::CONTENT_TYPE) {
            headers.insert(header::CONTENT_TYPE, value.clone());
        }
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(IMAGE_CACHE_CONTROL),
        );

        Ok(RelayResponse::Passthrough {
            status,
            headers,
            upstream,
        })
    }
}
