//! Headless browser support
//!
//! [`BrowserHandle`] owns the single Chrome process; [`HeadlessRenderer`]
//! leases pages from it to render documents and read media elements.

pub mod handle;
pub mod renderer;

pub use handle::{BrowserHandle, PageLease};
pub use renderer::{HeadlessRenderer, MediaElement};
