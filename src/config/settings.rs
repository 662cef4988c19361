//! Configuration settings structure
//!
//! Defines the main settings structure and loading logic for the relay service.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Browser-like user agent sent on every outbound request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Main configuration settings for the relay service
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Server configuration
    pub server: ServerSettings,
    /// Page fetching and escalation configuration
    pub fetch: FetchSettings,
    /// Headless browser configuration
    pub browser: BrowserSettings,
    /// Stream source resolution configuration
    pub resolver: ResolverSettings,
    /// Session credentials injected into direct fetches
    pub credentials: CredentialSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// How many consecutive ports to try when the first is taken
    pub port_attempts: u16,
}

/// Page fetching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Escalate blocked pages to the remote text-rendering proxy
    pub allow_remote_render: bool,
    /// Escalate blocked pages to the headless browser
    pub allow_headless_render: bool,
    /// Base URL of the remote text-rendering proxy; the target URL is appended
    pub remote_render_url: String,
    /// Page cache lifetime in seconds
    pub cache_ttl_secs: u64,
    /// Outbound request timeout in seconds
    pub request_timeout_secs: u64,
    /// User agent for outbound requests
    pub user_agent: String,
    /// Accept-Language for direct fetches
    pub accept_language: String,
    /// Extra challenge markers appended to the built-in list
    pub block_markers: Vec<String>,
}

/// Headless browser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Path to a Chrome/Chromium binary; autodetected when unset
    pub executable: Option<String>,
    /// Run without a visible window
    pub headless: bool,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// Delay after navigation to let client-side rendering settle
    pub settle_delay_ms: u64,
    /// Upper bound for dynamic element waits in seconds
    pub element_wait_secs: u64,
    /// Poll interval for dynamic element waits
    pub element_poll_ms: u64,
    /// Skip images, fonts and stylesheets
    pub block_assets: bool,
    /// Browser locale
    pub locale: String,
}

/// Source resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Short-link service that redirects to the real embed; ids are appended as a path segment
    pub short_link_url: String,
    /// Substring identifying the embed frame that hosts the media element
    pub embed_host_marker: String,
    /// Path marker identifying redirect-provider player URLs
    pub redirect_path_marker: String,
    /// Resolution API origin used when the player page does not name one
    pub default_api_origin: Option<String>,
    /// Maximum number of player candidates tried per resolution
    pub max_candidates: usize,
}

/// Credentials for sites that need an authenticated session
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CredentialSettings {
    /// Cookie header sent on direct fetches
    pub cookie: Option<String>,
    /// Per-host cookie headers, keyed by host name
    pub host_cookies: HashMap<String, String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level
    pub level: String,
    /// Enable verbose logging
    pub verbose: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "::".to_string(),
            port: 3000,
            port_attempts: 10,
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            allow_remote_render: false,
            allow_headless_render: false,
            remote_render_url: "https://r.jina.ai".to_string(),
            cache_ttl_secs: 120,
            request_timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.9,id;q=0.8".to_string(),
            block_markers: Vec::new(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            navigation_timeout_secs: 60,
            settle_delay_ms: 500,
            element_wait_secs: 30,
            element_poll_ms: 500,
            block_assets: true,
            locale: "id-ID".to_string(),
        }
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            short_link_url: "https://short.icu".to_string(),
            embed_host_marker: "abysscdn.com".to_string(),
            redirect_path_marker: "/hydrax/".to_string(),
            default_api_origin: None,
            max_candidates: 8,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            verbose: false,
        }
    }
}

impl FetchSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl BrowserSettings {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn element_wait(&self) -> Duration {
        Duration::from_secs(self.element_wait_secs)
    }

    pub fn element_poll(&self) -> Duration {
        Duration::from_millis(self.element_poll_ms)
    }
}

impl CredentialSettings {
    /// Cookie header for a host; per-host entries win over the global cookie
    pub fn cookie_for(&self, host: Option<&str>) -> Option<&str> {
        host.and_then(|h| self.host_cookies.get(h))
            .or(self.cookie.as_ref())
            .map(String::as_str)
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.trim(), "1" | "true" | "yes" | "on"))
}

impl Settings {
    /// Create new settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a TOML file; missing sections keep their defaults
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&raw)?;
        Ok(settings)
    }

    /// Apply environment variable overrides on top of these settings
    pub fn merge_with_env(mut self) -> crate::Result<Self> {
        if let Ok(host) = std::env::var("RELAY_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("RELAY_PORT").or_else(|_| std::env::var("PORT")) {
            self.server.port = port
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid port: {}", e)))?;
        }

        if let Some(flag) = env_flag("USE_JINA") {
            self.fetch.allow_remote_render = flag;
        }

        if let Some(flag) = env_flag("USE_PLAYWRIGHT") {
            self.fetch.allow_headless_render = flag;
        }

        if let Ok(url) = std::env::var("REMOTE_RENDER_URL") {
            self.fetch.remote_render_url = url;
        }

        if let Ok(ttl) = std::env::var("PAGE_CACHE_TTL") {
            self.fetch.cache_ttl_secs = ttl
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid TTL: {}", e)))?;
        }

        if let Ok(path) = std::env::var("CHROME_EXECUTABLE") {
            self.browser.executable = Some(path);
        }

        if let Ok(cookie) = std::env::var("RELAY_COOKIE").or_else(|_| std::env::var("CF_COOKIE"))
            && !cookie.trim().is_empty()
        {
            self.credentials.cookie = Some(cookie);
        }

        Ok(self)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.fetch.cache_ttl_secs == 0 {
            return Err(crate::Error::config("fetch.cache_ttl_secs must be positive"));
        }
        if self.fetch.request_timeout_secs == 0 || self.browser.navigation_timeout_secs == 0 {
            return Err(crate::Error::config("timeouts must be positive"));
        }
        if self.server.port_attempts == 0 {
            return Err(crate::Error::config("server.port_attempts must be positive"));
        }
        let remote = url::Url::parse(&self.fetch.remote_render_url).map_err(|e| {
            crate::Error::config(format!(
                "fetch.remote_render_url is not an absolute URL: {}",
                e
            ))
        })?;
        if !matches!(remote.scheme(), "http" | "https") {
            return Err(crate::Error::config(
                "fetch.remote_render_url must be http(s)",
            ));
        }
        url::Url::parse(&self.resolver.short_link_url).map_err(|e| {
            crate::Error::config(format!("resolver.short_link_url: {}", e))
        })?;
        if let Some(origin) = &self.resolver.default_api_origin {
            url::Url::parse(origin).map_err(|e| {
                crate::Error::config(format!("resolver.default_api_origin: {}", e))
            })?;
        }
        Ok(())
    }
}
