//! HTTP server
//!
//! Axum router, shared state and handlers.

pub mod app;
pub mod handlers;

pub use app::{AppState, create_app};
