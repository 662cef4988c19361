//! Page retrieval with anti-bot escalation
//!
//! - [`classifier`]: decides whether a response is a challenge page
//! - [`backends`]: direct and remote-render strategies
//! - [`cache`]: short-TTL page cache
//! - [`fetcher`]: orchestration

pub mod backends;
pub mod cache;
pub mod classifier;
pub mod fetcher;

pub use backends::{DirectFetch, FetchedPage, RemoteRenderProxy, RenderBackend};
pub use cache::PageCache;
pub use classifier::BlockRules;
pub use fetcher::{Escalation, EscalationKind, PageFetcher};
