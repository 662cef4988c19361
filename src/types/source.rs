//! Value types shared by the fetcher, resolver and relay
//!
//! Defines fetch options, stream variants and resolution results.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::settings::FetchSettings;

/// Per-call options for the page fetcher
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOptions {
    /// Escalate to the remote text-rendering proxy when blocked
    pub allow_remote_render: bool,
    /// Escalate to the headless browser when blocked
    pub allow_headless_render: bool,
    /// Extra headers for the direct fetch
    pub extra_headers: HashMap<String, String>,
}

impl FetchOptions {
    /// Create options with no escalation
    pub fn new() -> Self {
        Self::default()
    }

    /// Set remote-render escalation
    pub fn with_remote_render(mut self, allow: bool) -> Self {
        self.allow_remote_render = allow;
        self
    }

    /// Set headless-render escalation
    pub fn with_headless_render(mut self, allow: bool) -> Self {
        self.allow_headless_render = allow;
        self
    }

    /// Add a header for the direct fetch
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(name.into(), value.into());
        self
    }

    /// Combine with the process-wide toggles; either side can enable escalation
    pub fn effective(&self, settings: &FetchSettings) -> Self {
        Self {
            allow_remote_render: self.allow_remote_render || settings.allow_remote_render,
            allow_headless_render: self.allow_headless_render || settings.allow_headless_render,
            extra_headers: self.extra_headers.clone(),
        }
    }

    /// Whether any escalation beyond the direct fetch is permitted
    pub fn can_escalate(&self) -> bool {
        self.allow_remote_render || self.allow_headless_render
    }
}

/// One quality option within an adaptive manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamVariant {
    /// Display label (`NAME`, `720p`, `800kbps` or `Stream`)
    pub label: String,
    /// Absolute variant playlist URL
    pub url: String,
    /// Frame height in pixels, from `RESOLUTION`
    #[serde(rename = "height", skip_serializing_if = "Option::is_none")]
    pub height_px: Option<u32>,
    /// Peak bitrate, from `BANDWIDTH`
    #[serde(rename = "bandwidth", skip_serializing_if = "Option::is_none")]
    pub bandwidth_bps: Option<u64>,
}

/// Result of one resolution call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSource {
    /// Raw playable URL
    pub video_url: String,
    /// Adaptive variants in manifest order, deduplicated by URL
    pub variants: Vec<StreamVariant>,
    /// Poster image URL
    pub poster_url: Option<String>,
    /// Referer the media host expects
    pub referer: Option<String>,
    /// Title reported by the resolution API
    pub title: Option<String>,
    /// URL was read from a live media element and must be played as-is
    pub direct: bool,
}

impl ResolvedSource {
    /// Create a source with no variants
    pub fn new(video_url: impl Into<String>) -> Self {
        Self {
            video_url: video_url.into(),
            variants: Vec::new(),
            poster_url: None,
            referer: None,
            title: None,
            direct: false,
        }
    }

    pub fn with_referer(mut self, referer: Option<String>) -> Self {
        self.referer = referer;
        self
    }

    pub fn with_poster(mut self, poster: Option<String>) -> Self {
        self.poster_url = poster.filter(|p| !p.is_empty());
        self
    }
}
