//! Stream source resolution
//!
//! - [`extract`]: pure text extractors returning optional URLs
//! - [`variants`]: master manifest variant parsing
//! - [`manager`]: the candidate and strategy loop

pub mod extract;
pub mod manager;
pub mod variants;

pub use manager::{MediaElementProbe, SourceResolver, Strategy};
pub use variants::parse_variants;
