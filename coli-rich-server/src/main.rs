//! coli-rich-server - enrichment submission service
//!
//! Accepts PICA patches from authorized users, stores them write-once under
//! their SHA-1 content hash and serves them back to the enrichment pipeline.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use coli_rich_common::config::{AllowListSetting, Config, PartialConfig};
use coli_rich_common::EnrichmentStore;
use coli_rich_server::{build_router, login, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for coli-rich-server
///
/// Every flag is optional so that unset values fall through to the TOML file
/// and then to built-in defaults.
#[derive(Parser, Debug)]
#[command(name = "coli-rich-server")]
#[command(about = "Enrichment submission service for coli-rich")]
#[command(version)]
struct Args {
    /// Process mode (development or production)
    #[arg(long, env = "COLI_RICH_MODE")]
    mode: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "COLI_RICH_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "COLI_RICH_HOST")]
    host: Option<String>,

    /// Public base URL for record URIs (defaults to the request's Host)
    #[arg(long, env = "COLI_RICH_BASE_URL")]
    base_url: Option<String>,

    /// Login server base URL; without it every submission is refused
    #[arg(long, env = "COLI_RICH_LOGIN_SERVER")]
    login_server: Option<String>,

    /// Directory holding stored enrichments
    #[arg(long, env = "COLI_RICH_ENRICHMENTS_PATH")]
    enrichments_path: Option<PathBuf>,

    /// Comma-separated user URIs allowed to submit, or `*`
    #[arg(long, env = "COLI_RICH_ALLOWED_USERS")]
    allowed_users: Option<String>,

    /// Comma-separated identity providers, or `*`
    #[arg(long, env = "COLI_RICH_ALLOWED_PROVIDERS")]
    allowed_providers: Option<String>,

    /// Also admit users holding an identity at an allowed provider
    #[arg(long, env = "COLI_RICH_PROVIDER_ACCESS")]
    provider_access: Option<bool>,

    /// Directory of built frontend assets
    #[arg(long, env = "COLI_RICH_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "COLI_RICH_CONFIG")]
    config: Option<PathBuf>,
}

impl Args {
    fn into_partial(self) -> (PartialConfig, Option<PathBuf>) {
        let partial = PartialConfig {
            mode: self.mode,
            host: self.host,
            port: self.port,
            base_url: self.base_url,
            login_server: self.login_server,
            enrichments_path: self.enrichments_path,
            allowed_users: self.allowed_users.map(AllowListSetting::Csv),
            allowed_providers: self.allowed_providers.map(AllowListSetting::Csv),
            provider_access: self.provider_access,
            static_dir: self.static_dir,
        };
        (partial, self.config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let (cli, config_file) = Args::parse().into_partial();

    let partial = match &config_file {
        Some(path) => cli.merge(
            PartialConfig::load_toml(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
        ),
        None => cli,
    };
    let config = Config::resolve(partial).context("Invalid configuration")?;

    let default_filter = if config.is_production() {
        "info"
    } else {
        "coli_rich_server=debug,coli_rich_common=debug,tower_http=debug"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting coli-rich-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Mode: {}", config.mode);
    if let Some(path) = &config_file {
        info!("Config file: {}", path.display());
    }

    let store = EnrichmentStore::open(&config.enrichments_path).with_context(|| {
        format!(
            "Failed to open enrichment store at {}",
            config.enrichments_path.display()
        )
    })?;
    info!("Enrichments path: {}", store.root().display());

    let signing_key = match &config.login_server {
        Some(login_server) => login::discover_signing_key(login_server).await,
        None => {
            warn!("No login server configured, submissions will be refused");
            None
        }
    };

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config, store, signing_key);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr.as_str())
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("coli-rich-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
