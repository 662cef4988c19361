//! Small helpers shared by the binaries and the `/ping` handler

pub mod version;

pub use version::get_version;
