//! roadit-server - road issue reporting service
//!
//! Serves the issue list, report flow, status updates, photo assessment and
//! municipality lookup as JSON over HTTP.

use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use roadit_common::config::{self, LoggingConfig, StorageKind};
use roadit_common::store::{open_backend, IssueStore};
use roadit_common::StatusWorkflow;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use roadit_server::config::GatewayConfig;
use roadit_server::services;
use roadit_server::AppState;

/// Command-line arguments for roadit-server
#[derive(Parser, Debug)]
#[command(name = "roadit-server")]
#[command(about = "Road issue reporting service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "ROADIT_PORT")]
    port: Option<u16>,

    /// Folder holding the issue slot (overrides ROADIT_ROOT_FOLDER and TOML)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Configuration file (defaults to ~/.config/roadit/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let loaded =
        config::load_config(args.config.as_deref()).context("Failed to load configuration")?;

    init_tracing(&loaded.config.logging)?;

    info!(
        "Starting roadit-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    loaded.log_source();
    let toml_config = loaded.config;

    // Storage
    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    if toml_config.storage.backend != StorageKind::Memory {
        std::fs::create_dir_all(&root_folder).with_context(|| {
            format!("Failed to create root folder {}", root_folder.display())
        })?;
    }
    info!("Root folder: {}", root_folder.display());

    let backend = open_backend(
        toml_config.storage.backend,
        &root_folder,
        &toml_config.storage.slot,
    )
    .await
    .context("Failed to open issue storage")?;

    let store = Arc::new(IssueStore::new(backend));
    let workflow = StatusWorkflow::with_policy(store, toml_config.workflow.policy);
    info!("Transition policy: {:?}", workflow.policy());

    // Gateways
    let gateway_config = GatewayConfig::resolve(&toml_config.gateways);
    let assessor = services::assessment_gateway(&gateway_config)
        .context("Failed to build assessment gateway")?;
    let resolver = services::municipality_resolver(&gateway_config)
        .context("Failed to build municipality resolver")?;

    let state = AppState::new(workflow, assessor, resolver);
    let app = roadit_server::build_router(state);

    let port = config::resolve_port(args.port, &toml_config);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Install the global subscriber
///
/// `RUST_LOG` overrides `logging.level`. With `logging.file` set, output
/// goes to that file (appended) instead of stderr.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("Invalid logging.level")?;

    let registry = tracing_subscriber::registry().with(filter);

    match &logging.file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log folder {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            registry
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .init();
        }
        None => registry.with(fmt::layer()).init(),
    }

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
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
