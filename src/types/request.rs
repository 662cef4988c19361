//! Request type definitions
//!
//! Query-string shapes accepted by the relay and API endpoints.

use serde::{Deserialize, Serialize};

use super::serde_helpers::deserialize_query_flag;
use super::source::FetchOptions;

/// Query for `/relay/media` and `/relay/image`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayQuery {
    /// Absolute upstream URL
    pub url: String,

    /// Referer to present upstream
    #[serde(default)]
    pub referer: Option<String>,
}

impl RelayQuery {
    /// Referer with empty values treated as absent
    pub fn referer(&self) -> Option<&str> {
        self.referer.as_deref().filter(|r| !r.trim().is_empty())
    }
}

/// Query for `/api/page`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageQuery {
    /// Page to fetch
    pub url: String,

    /// Allow escalation to the remote text-rendering proxy
    #[serde(default, deserialize_with = "deserialize_query_flag")]
    pub remote: Option<bool>,

    /// Allow escalation to the headless browser
    #[serde(default, deserialize_with = "deserialize_query_flag")]
    pub headless: Option<bool>,
}

impl PageQuery {
    /// Translate the query flags into fetch options
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions::new()
            .with_remote_render(self.remote.unwrap_or(false))
            .with_headless_render(self.headless.unwrap_or(false))
    }
}

/// Query for `/api/resolve`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveQuery {
    /// Page or player URL to resolve
    pub url: String,

    /// Page the player was embedded in
    #[serde(default)]
    pub referer: Option<String>,
}
