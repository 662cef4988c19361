//! Fetch Relay
//!
//! A challenge-aware page fetcher and range-preserving media relay for
//! content aggregators that scrape third-party streaming sites.
//!
//! # Architecture
//!
//! - [`PageFetcher`] fetches page text directly and escalates through a
//!   remote render proxy or a shared headless browser when a bot challenge
//!   is detected.
//! - [`SourceResolver`] turns a page or player URL into a playable stream
//!   URL with quality variants.
//! - [`StreamRelay`] streams media with range support and rewrites HLS
//!   manifests so every nested URL comes back through the relay.
//!
//! The project runs in two modes:
//! - **HTTP Server Mode**: `fetch-relay-server --port 3000`
//! - **Script Mode**: `fetch-relay resolve <URL>`
//!
//! # Examples
//!
//! ```rust,no_run
//! use fetch_relay::{BrowserHandle, PageFetcher, Settings, SourceResolver};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = Arc::new(Settings::default());
//! let browser = Arc::new(BrowserHandle::new(settings.browser.clone()));
//! let fetcher = Arc::new(PageFetcher::new(settings.clone(), browser.clone())?);
//! let resolver = SourceResolver::new(settings, fetcher, browser.clone())?;
//!
//! if let Some(source) = resolver.resolve("https://site.example/film", None).await {
//!     println!("{}", source.video_url);
//! }
//! browser.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod relay;
pub mod resolver;
pub mod server;
pub mod types;
pub mod utils;

pub use browser::BrowserHandle;
pub use config::Settings;
pub use error::{Error, Result};
pub use fetch::PageFetcher;
pub use relay::StreamRelay;
pub use resolver::SourceResolver;
pub use types::{ErrorResponse, PingResponse, ResolvedSource};
