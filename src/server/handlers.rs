//! HTTP request handlers
//!
//! Relay endpoints stream upstream bodies; API endpoints answer JSON. Every
//! failure becomes `{ "error": ... }` with a status chosen by [`status_for`].

use crate::{
    Error,
    relay::RelayResponse,
    server::app::AppState,
    types::{
        ErrorResponse, PageQuery, PageResponse, PingResponse, RelayQuery, ResolveQuery,
        ResolveResponse, ResolvedSource, VariantResponse,
    },
    utils::version,
};
use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, StatusCode, header},
    response::Json,
};

type ApiError = (StatusCode, Json<ErrorResponse>);

/// HTTP status for a library error
pub fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::Blocked { .. } => StatusCode::BAD_GATEWAY,
        Error::RendererUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::UpstreamUnavailable { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        Error::NoPlayableSource { .. } => StatusCode::NOT_FOUND,
        Error::InvalidUrl(_) => StatusCode::BAD_REQUEST,
        Error::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        Error::Network(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Client-facing message for a library error
fn format_error(error: &Error) -> String {
    match error {
        Error::Blocked { url } => format!(
            "Page blocked by an anti-bot challenge: {}. Enable remote rendering (USE_JINA=1) or headless rendering (USE_PLAYWRIGHT=1).",
            url
        ),
        Error::NoPlayableSource { .. } => "No playable source found".to_string(),
        other => other.to_string(),
    }
}

fn api_error(error: Error) -> ApiError {
    let status = status_for(&error);
    if status.is_server_error() {
        tracing::error!("Request failed: {}", error);
    } else {
        tracing::debug!("Request failed: {}", error);
    }
    (status, Json(ErrorResponse::new(format_error(&error))))
}

fn bad_query(rejection: QueryRejection) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(rejection.body_text())),
    )
}

/// Relay a media resource
///
/// GET /relay/media?url=&referer=
///
/// Forwards `Range`; manifests come back rewritten.
pub async fn relay_media(
    State(state): State<AppState>,
    query: Result<Query<RelayQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Result<RelayResponse, ApiError> {
    let Query(query) = query.map_err(bad_query)?;
    tracing::debug!("Relaying media {}", query.url);

    state
        .relay
        .relay(&query.url, query.referer(), headers.get(header::RANGE))
        .await
        .map_err(api_error)
}

/// Relay an image
///
/// GET /relay/image?url=&referer=
pub async fn relay_image(
    State(state): State<AppState>,
    query: Result<Query<RelayQuery>, QueryRejection>,
) -> Result<RelayResponse, ApiError> {
    let Query(query) = query.map_err(bad_query)?;
    state
        .relay
        .relay_image(&query.url, query.referer())
        .await
        .map_err(api_error)
}

/// Fetch page text
///
/// GET /api/page?url=&remote=&headless=
pub async fn page(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<PageResponse>, ApiError> {
    let Query(query) = query.map_err(bad_query)?;
    let html = state
        .fetcher
        .fetch(&query.url, &query.fetch_options())
        .await
        .map_err(api_error)?;

    Ok(Json(PageResponse {
        url: query.url,
        html,
    }))
}

/// Resolve a page or player to a playable source
///
/// GET /api/resolve?url=&referer=
pub async fn resolve(
    State(state): State<AppState>,
    query: Result<Query<ResolveQuery>, QueryRejection>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let Query(query) = query.map_err(bad_query)?;
    let source = state
        .resolver
        .resolve_required(&query.url, query.referer.as_deref())
        .await
        .map_err(api_error)?;

    Ok(Json(to_response(&state, source)))
}

/// Wrap resolved URLs behind the relay unless they must be played as-is
fn to_response(state: &AppState, source: ResolvedSource) -> ResolveResponse {
    let referer = source.referer.as_deref();
    let wrap = |url: &str| {
        if source.direct {
            url.to_string()
        } else {
            state.urls.media(url, referer)
        }
    };

    ResolveResponse {
        video: wrap(&source.video_url),
        videos: source
            .variants
            .iter()
            .map(|v| VariantResponse {
                label: v.label.clone(),
                url: wrap(&v.url),
                height: v.height_px,
                bandwidth: v.bandwidth_bps,
            })
            .collect(),
        poster: source
            .poster_url
            .as_deref()
            .map(|p| state.urls.image(p, referer)),
        referer: source.referer.clone(),
        direct: source.direct,
        title: source.title.clone(),
    }
}

/// Ping endpoint for health checks
///
/// GET /ping
pub async fn ping(State(state): State<AppState>) -> Json<PingResponse> {
    let uptime = state.start_time.elapsed().as_secs();
    Json(PingResponse::new(
        uptime,
        version::get_version(),
        state.started_at,
    ))
}

/// Invalidate caches endpoint
///
/// POST /invalidate_caches
pub async fn invalidate_caches(State(state): State<AppState>) -> StatusCode {
    state.fetcher.invalidate_cache().await;
    StatusCode::NO_CONTENT
}
