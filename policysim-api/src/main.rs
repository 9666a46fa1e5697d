//! policysim-api - Policy impact analysis service
//!
//! Resolves configuration, connects the identity service, the row store
//! and the text-generation API, then serves the HTTP API.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use policysim_common::config::{
    load_config_file, ConfigOverrides, ConfigSource, ServiceConfig, StoreBackend, ENV_BIND_ADDRESS,
    ENV_CONFIG_PATH, ENV_DATABASE_PATH, ENV_LOG_LEVEL, ENV_OPENAI_API_KEY, ENV_OPENAI_BASE_URL,
    ENV_PORT, ENV_REQUEST_TIMEOUT, ENV_STORE, ENV_SUPABASE_KEY, ENV_SUPABASE_URL,
};
use policysim_api::services::{OpenAiClient, SupabaseAuth};
use policysim_api::store::{HistoryStore, RestStore, SqliteStore, UserStore};
use policysim_api::{build_router, AppState};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for policysim-api
#[derive(Parser, Debug)]
#[command(name = "policysim-api")]
#[command(about = "Tiered policy impact analysis service")]
#[command(version)]
struct Args {
    /// Config file (default: <config dir>/policysim/config.toml)
    #[arg(short, long, env = ENV_CONFIG_PATH)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = ENV_PORT)]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = ENV_BIND_ADDRESS)]
    bind_address: Option<String>,

    /// Identity/data service URL
    #[arg(long, env = ENV_SUPABASE_URL)]
    supabase_url: Option<String>,

    /// Identity/data service key
    #[arg(long, env = ENV_SUPABASE_KEY, hide_env_values = true)]
    supabase_key: Option<String>,

    /// Text-generation API key
    #[arg(long, env = ENV_OPENAI_API_KEY, hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Text-generation API base URL
    #[arg(long, env = ENV_OPENAI_BASE_URL)]
    openai_base_url: Option<String>,

    /// Timeout for outbound requests, in seconds
    #[arg(long, env = ENV_REQUEST_TIMEOUT)]
    request_timeout_secs: Option<u64>,

    /// Store backend: rest or sqlite
    #[arg(long, env = ENV_STORE)]
    store: Option<StoreBackend>,

    /// SQLite database path (sqlite store only)
    #[arg(long, env = ENV_DATABASE_PATH)]
    database: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, env = ENV_LOG_LEVEL)]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            port: self.port,
            bind_address: self.bind_address.clone(),
            supabase_url: self.supabase_url.clone(),
            supabase_key: self.supabase_key.clone(),
            openai_api_key: self.openai_api_key.clone(),
            openai_base_url: self.openai_base_url.clone(),
            request_timeout_secs: self.request_timeout_secs,
            store: self.store,
            database_path: self.database.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let loaded = load_config_file(args.config.as_deref()).context("Failed to load config file")?;
    let source = loaded.source.clone();

    // Missing text-generation key is fatal here, never per request.
    // Resolved before tracing exists, so failures surface through the return value.
    let config = ServiceConfig::resolve(args.overrides(), loaded.file)
        .context("Invalid configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_directives().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting policysim-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match &source {
        ConfigSource::Explicit(path) | ConfigSource::Default(path) => {
            info!("Config file: {}", path.display())
        }
        ConfigSource::Missing(Some(path)) => {
            warn!("No config file at {}; using environment and defaults", path.display())
        }
        ConfigSource::Missing(None) => {
            warn!("Could not determine config directory; using environment and defaults")
        }
    }

    let state = build_state(&config).await?;
    let app = build_router(state);

    let addr = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("policysim-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Construct every external client once and inject them into the state
async fn build_state(config: &ServiceConfig) -> Result<AppState> {
    let http_client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .context("Failed to create HTTP client")?;

    let identity = Arc::new(SupabaseAuth::new(
        http_client.clone(),
        &config.supabase_url,
        &config.supabase_key,
    ));

    let (users, history): (Arc<dyn UserStore>, Arc<dyn HistoryStore>) = match config.store {
        StoreBackend::Rest => {
            let store = Arc::new(RestStore::new(
                http_client.clone(),
                &config.supabase_url,
                &config.supabase_key,
            ));
            info!("Store: hosted ({}/rest/v1)", config.supabase_url);
            (store.clone(), store)
        }
        StoreBackend::Sqlite => {
            let store = Arc::new(
                SqliteStore::open(&config.database_path)
                    .await
                    .context("Failed to open SQLite store")?,
            );
            info!("Store: sqlite ({})", config.database_path.display());
            (store.clone(), store)
        }
    };

    let generator = Arc::new(OpenAiClient::new(
        http_client,
        &config.openai_base_url,
        &config.openai_api_key,
    ));
    info!(
        "Text generation: {} (timeout {}s)",
        config.openai_base_url,
        config.request_timeout.as_secs()
    );

    Ok(AppState::new(identity, users, history, generator))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
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
            info!("Received SIGTERM, shutting down");
        },
    }
}
