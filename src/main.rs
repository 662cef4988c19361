//! Script mode binary for one-shot fetches
//!
//! Prints page text or a resolved source to stdout. Logs go to stderr so the
//! output stays machine-readable.
//!
//! # Usage
//!
//! ```bash
//! fetch-relay page https://site.example/film --headless
//! fetch-relay resolve https://site.example/film
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use fetch_relay::{
    BrowserHandle, PageFetcher, Settings, SourceResolver, cli::init_logging,
    config::ConfigLoader, types::FetchOptions,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "fetch-relay")]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a page and print its text
    Page {
        url: String,

        /// Escalate to the remote render proxy when blocked
        #[arg(long)]
        remote_render: bool,

        /// Escalate to the headless browser when blocked
        #[arg(long)]
        headless: bool,
    },
    /// Resolve a page or player to a playable source and print it as JSON
    Resolve {
        url: String,

        /// Referer for the first request
        #[arg(long)]
        referer: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(if cli.verbose { "debug" } else { "error" });

    let settings = match ConfigLoader::new().load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let browser = Arc::new(BrowserHandle::new(settings.browser.clone()));
    let outcome = run(cli.command, Arc::new(settings), browser.clone()).await;
    browser.shutdown().await;

    match outcome {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run(
    command: Command,
    settings: Arc<Settings>,
    browser: Arc<BrowserHandle>,
) -> anyhow::Result<String> {
    let fetcher = Arc::new(PageFetcher::new(settings.clone(), browser.clone())?);

    match command {
        Command::Page {
            url,
            remote_render,
            headless,
        } => {
            debug!("Fetching page {}", url);
            let options = FetchOptions::new()
                .with_remote_render(remote_render)
                .with_headless_render(headless);
            Ok(fetcher.fetch(&url, &options).await?)
        }
        Command::Resolve { url, referer } => {
            debug!("Resolving {}", url);
            let resolver = SourceResolver::new(settings, fetcher, browser)?;
            let source = resolver.resolve_required(&url, referer.as_deref()).await?;
            Ok(serde_json::to_string_pretty(&source)?)
        }
    }
}
