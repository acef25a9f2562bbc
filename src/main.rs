use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

use svclog::config::{self, ServiceConfig};
use svclog::{http, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let base_dir = config::execution_base_dir().context("Failed to resolve executable directory")?;

    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => ServiceConfig::load(&path),
        None => ServiceConfig::load_from_dir(&base_dir),
    }
    .context("Failed to load config")?;

    // Initialize logging BEFORE any tracing calls
    let logger = logging::init_with(&base_dir, &config.logging)
        .context("Failed to initialize logging")?;
    logging::install_tracing(logger.clone());

    let port = config.port()?;
    tracing::info!(prefix = "BOOT", service = %config.service.name, port, "Starting service");

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(
        listener,
        http::router(logger.clone()).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
    .context("HTTP server failed")?;

    tracing::info!(prefix = "BOOT", "Service stopped");
    Ok(())
}
