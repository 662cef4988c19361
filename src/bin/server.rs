//! HTTP server binary for the fetch relay
//!
//! # Usage
//!
//! ```bash
//! fetch-relay-server --port 3000 --host ::
//! ```
//!
//! # API Endpoints
//!
//! - `GET /relay/media`: Stream or rewrite a media resource
//! - `GET /relay/image`: Stream an image
//! - `GET /api/page`: Fetch page text with escalation
//! - `GET /api/resolve`: Resolve a page to a playable source
//! - `GET /ping`: Health check endpoint
//! - `POST /invalidate_caches`: Clear the page cache

use clap::Parser;
use fetch_relay::cli::{ServerArgs, run_server_mode};
use std::path::PathBuf;

/// HTTP relay for bot-protected streaming pages
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    run_server_mode(ServerArgs {
        port: cli.port,
        host: cli.host,
        config: cli.config,
        verbose: cli.verbose,
    })
    .await
}
