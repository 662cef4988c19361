//! Response type definitions
//!
//! JSON bodies returned by the API endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Page text returned by `/api/page`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse {
    /// URL that was fetched
    pub url: String,
    /// Page text as delivered by the winning strategy
    pub html: String,
}

/// Quality option with a client-facing URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantResponse {
    pub label: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<u64>,
}

/// Resolution result returned by `/api/resolve`
///
/// `video` and variant URLs point back at the relay unless `direct` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub video: String,
    pub videos: Vec<VariantResponse>,
    pub poster: Option<String>,
    pub referer: Option<String>,
    pub direct: bool,
    pub title: Option<String>,
}

/// Ping response for health checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    /// Server uptime in seconds
    pub server_uptime: u64,

    /// Server version
    pub version: String,

    /// When the server started
    pub started_at: DateTime<Utc>,
}

impl PingResponse {
    /// Create a new ping response
    pub fn new(server_uptime: u64, version: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            server_uptime,
            version: version.into(),
            started_at,
        }
    }
}

/// Error response for API errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
