//! planlytics-gateway - PlanLytics analysis gateway
//!
//! Accepts plan document uploads, runs row extraction, publishes CSV/JSON
//! exports under `/files`, and fronts the LLM backend for the chat widgets.

use anyhow::{Context, Result};
use clap::Parser;
use planlytics_common::config::{load_toml_config, RootFolderInitializer, RootFolderResolver};
use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

use planlytics_gateway::llm::{HttpLlmBackend, LlmBackend};
use planlytics_gateway::{AppState, GatewayConfig};

/// Command-line arguments for planlytics-gateway
#[derive(Parser, Debug)]
#[command(name = "planlytics-gateway")]
#[command(about = "Upload, analysis and chat gateway for PlanLytics")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "PLANLYTICS_PORT")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Root folder holding uploads/ and outputs/
    #[arg(short, long, env = "PLANLYTICS_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Path to config.toml
    #[arg(short, long, env = "PLANLYTICS_CONFIG")]
    config: Option<PathBuf>,
}

fn init_tracing(level: &str, file: Option<&PathBuf>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    match file {
        Some(path) => {
            let log_file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Arc::new(log_file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let loaded = load_toml_config(args.config.as_deref());
    let toml_config = loaded.config.clone();

    init_tracing(&toml_config.logging.level, toml_config.logging.file.as_ref())?;

    info!(
        "Starting planlytics-gateway v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    loaded.log_source();

    // Step 1: Resolve and initialize root folder
    let resolver = RootFolderResolver::new("gateway");
    let root_folder = resolver.resolve(args.root_folder.as_deref(), &toml_config);
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    // Step 2: LLM backend
    let backend = HttpLlmBackend::from_config(&toml_config)
        .context("Failed to configure LLM backend")?;
    info!("LLM backend: {} ({})", backend.provider(), backend.model());
    let llm: Arc<dyn LlmBackend> = Arc::new(backend);

    // Step 3: Router
    let config = GatewayConfig::from_root(&initializer, &toml_config);
    if config.allowed_extensions.is_empty() {
        warn!("No upload extensions allowed; every upload will be rejected");
    }
    info!(
        "Uploads limited to {} bytes, chat limited to {}/min",
        config.max_upload_bytes, config.chat_requests_per_minute
    );
    let app = planlytics_gateway::build_router(AppState::new(config, llm));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", args.host, args.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
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
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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
