//! Command-line entry points shared by the binaries

pub mod server;

pub use server::{ServerArgs, init_logging, run_server_mode};
