//! Version information

/// Crate version as built
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
