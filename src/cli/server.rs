//! Server mode CLI logic
//!
//! Contains the core logic for running the HTTP server mode.

use crate::{
    config::ConfigLoader,
    server::{AppState, app},
    utils::version,
};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Arguments for server mode
#[derive(Debug, Default)]
pub struct ServerArgs {
    /// Overrides `server.port`
    pub port: Option<u16>,
    /// Overrides `server.host`
    pub host: Option<String>,
    /// Explicit configuration file
    pub config: Option<PathBuf>,
    pub verbose: bool,
}

/// Install the global subscriber; `RUST_LOG` wins over `default_level`
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run server mode with the given arguments
pub async fn run_server_mode(args: ServerArgs) -> Result<()> {
    // Load configuration, then apply CLI overrides
    let mut settings = ConfigLoader::new()
        .load(args.config.as_deref())
        .context("failed to load configuration")?;

    if args.verbose || settings.logging.verbose {
        init_logging("debug");
    } else {
        init_logging(&settings.logging.level);
    }
    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if settings.server.port == 0 {
        anyhow::bail!("server.port must be non-zero");
    }

    tracing::info!("Starting fetch relay v{}", version::get_version());

    let state = AppState::new(settings.clone())?;
    let browser = state.browser.clone();
    let app = app::create_app(state);

    let addr = parse_and_bind_address(&settings.server.host, settings.server.port).await?;
    let listener = bind_with_fallback(addr, settings.server.port_attempts).await?;

    tracing::info!(
        "Fetch relay v{} listening on {}",
        version::get_version(),
        listener.local_addr()?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped, closing browser");
    browser.shutdown().await;

    Ok(())
}

/// Bind `addr`, moving to the next port while the current one is in use
pub async fn bind_with_fallback(addr: SocketAddr, attempts: u16) -> Result<TcpListener> {
    let mut candidate = addr;
    for attempt in 0..attempts.max(1) {
        match TcpListener::bind(candidate).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse && attempt + 1 < attempts => {
                let next = candidate.port().checked_add(1).context("port range exhausted")?;
                tracing::warn!("Port {} in use, trying {}", candidate.port(), next);
                candidate.set_port(next);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to bind {}", candidate));
            }
        }
    }
    anyhow::bail!("no free port after {} attempts starting at {}", attempts, addr)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

/// Parse host string and attempt to bind to the address
///
/// `::` falls back to `0.0.0.0` when the host has no IPv6 stack.
pub async fn parse_and_bind_address(host: &str, port: u16) -> Result<SocketAddr> {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    match host {
        "::" => {
            let addr = SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port);
            tracing::debug!("Using IPv6 any address: {}", addr);

            // Probe on an ephemeral port so the real one stays free
            match TcpListener::bind(SocketAddr::new(addr.ip(), 0)).await {
                Ok(_) => Ok(addr),
                Err(e) => {
                    tracing::warn!(
                        "Could not listen on [::]:{} (Caused by {}), falling back to 0.0.0.0",
                        port,
                        e
                    );
                    Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port))
                }
            }
        }
        _ => match host.parse::<IpAddr>() {
            Ok(ip) => {
                let addr = SocketAddr::new(ip, port);
                tracing::debug!("Parsed address: {}", addr);
                Ok(addr)
            }
            Err(_) => anyhow::bail!(
                "Invalid host address: {}. Use '::' for IPv6 or '0.0.0.0' for IPv4",
                host
            ),
        },
    }
}
