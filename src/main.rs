//! PDF Viewer Engine Server
//!
//! Hosts the viewing engine for a browser UI shell: document resolution,
//! authenticated fetch, page rendering and directory listings.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdfview_engine::config::Config;
use pdfview_engine::credentials::{CredentialProvider, TokenStore};
use pdfview_engine::directory::HttpDirectoryClient;
use pdfview_engine::routes;
use pdfview_engine::state::AppState;
use pdfview_engine::viewer::ViewerEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdfview_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting PDF Viewer Engine v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("API base: {}", config.api.base_url);
    if let Some(rewrite) = &config.api.alternate_base {
        tracing::info!("Alternate base: {} -> {}", rewrite.from, rewrite.to);
    }

    let tokens = match &config.auth.token {
        Some(token) => TokenStore::with_token(token.clone()),
        None => TokenStore::new(),
    };

    let directory_api = HttpDirectoryClient::new(
        &config.api.base_url,
        Duration::from_secs(config.api.request_timeout_secs),
        Arc::new(tokens.clone()) as Arc<dyn CredentialProvider>,
    )
    .context("Failed to initialize directory client")?;

    let engine = ViewerEngine::builder(&config);
    let app_state = AppState::new(config.clone(), engine, Arc::new(directory_api), tokens)
        .context("Failed to initialize application state")?;

    let app = routes::app(app_state.clone());

    // Start server with graceful shutdown
    let host: std::net::IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid SERVER_HOST {}", config.server.host))?;
    let addr = SocketAddr::from((host, config.server.port));
    tracing::info!("PDF Viewer Engine listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    app_state.shutdown();
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
