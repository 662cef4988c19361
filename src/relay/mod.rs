//! Media relay
//!
//! - [`urls`]: relay URL construction
//! - [`playlist`]: HLS manifest rewriting
//! - [`stream`]: the range-aware reverse proxy

pub mod playlist;
pub mod stream;
pub mod urls;

pub use playlist::PlaylistRewriter;
pub use stream::{RelayResponse, StreamRelay, is_manifest};
pub use urls::RelayUrlBuilder;
