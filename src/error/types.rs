//! Error type definitions
//!
//! Defines the main error types used throughout the fetcher, relay and resolver.

use thiserror::Error;

/// Main error type for the relay service
#[derive(Error, Debug)]
pub enum Error {
    /// Every permitted fetch strategy returned challenge content
    #[error("Blocked by anti-bot challenge: {url}")]
    Blocked { url: String },

    /// The headless browser engine could not be started
    #[error("Headless renderer unavailable: {0}")]
    RendererUnavailable(String),

    /// Upstream host answered with a non-success status
    #[error("Upstream returned {status} for {url}")]
    UpstreamUnavailable { status: u16, url: String },

    /// A navigation or dynamic wait exceeded its bound
    #[error("Timed out during {stage}")]
    Timeout { stage: String },

    /// One malformed manifest attribute block
    #[error("Skipped malformed manifest line: {line}")]
    ManifestParseSkip { line: String },

    /// Every resolution strategy and candidate was exhausted
    #[error("No playable source found for {url}")]
    NoPlayableSource { url: String },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Browser automation errors (navigation, evaluation, page lifecycle)
    #[error("Browser error: {0}")]
    Browser(String),

    /// URL parsing errors
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Network/HTTP client errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file parsing errors
    #[error("TOML error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a blocked error for the given URL
    pub fn blocked(url: impl Into<String>) -> Self {
        Self::Blocked { url: url.into() }
    }

    /// Create a renderer-unavailable error
    pub fn renderer_unavailable(msg: impl Into<String>) -> Self {
        Self::RendererUnavailable(msg.into())
    }

    /// Create an upstream error carrying the upstream status code
    pub fn upstream(status: u16, url: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            status,
            url: url.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(stage: impl Into<String>) -> Self {
        Self::Timeout {
            stage: stage.into(),
        }
    }

    /// Create a manifest skip marker
    pub fn manifest_skip(line: impl Into<String>) -> Self {
        Self::ManifestParseSkip { line: line.into() }
    }

    /// Create a no-playable-source error
    pub fn no_playable_source(url: impl Into<String>) -> Self {
        Self::NoPlayableSource { url: url.into() }
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a browser error
    pub fn browser(msg: impl Into<String>) -> Self {
        Self::Browser(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this failure only means "try the next strategy"
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable { .. }
                | Self::Timeout { .. }
                | Self::ManifestParseSkip { .. }
                | Self::Browser(_)
                | Self::Network(_)
        )
    }
}
