//! Type definitions shared across the relay
//!
//! Query and response bodies for the HTTP surface plus the value types
//! passed between the fetcher, resolver and relay.

pub mod request;
pub mod response;
pub mod serde_helpers;
pub mod source;

pub use request::{PageQuery, RelayQuery, ResolveQuery};
pub use response::{ErrorResponse, PageResponse, PingResponse, ResolveResponse, VariantResponse};
pub use source::{FetchOptions, ResolvedSource, StreamVariant};
