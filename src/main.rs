//! gatekv -- S3-compatible action dispatch core.
//!
//! Crash-only design, carried over from the backend this gateway sits
//! in front of: every startup is a recovery, there is no separate
//! recovery mode. SIGTERM/SIGINT only stop accepting new connections
//! and wait with a timeout before exiting -- no cleanup.

use std::sync::Arc;

use clap::Parser;
use tracing::info;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "gatekv", version, about = "S3-compatible action dispatch core")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "gatekv.example.yaml")]
    config: String,

    /// Override the bind address (host:port).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Config must be loaded before tracing init so the configured log
    // level/format can take effect; fall back to defaults on read failure
    // rather than going silent.
    let config = gatekv::config::load_config(&cli.config).unwrap_or_else(|err| {
        eprintln!("failed to load config from {}: {err}, using defaults", cli.config);
        gatekv::config::Config {
            server: Default::default(),
            action: Default::default(),
            logging: Default::default(),
        }
    });

    init_tracing(&config.logging);

    info!("Crash-only startup: performing recovery checks");

    gatekv::metrics::init_metrics();
    gatekv::metrics::describe_metrics();
    info!("Prometheus metrics initialized");

    // No real Motr/Clovis client exists in this crate (`spec.md` §1 names
    // the backend an external collaborator); the in-memory backend is the
    // only one the binary can run standalone.
    let memory = gatekv::backend::memory::MemoryBackend::new();
    let backends = gatekv::action::Backends::memory(&memory);

    let bind_addr = cli
        .bind
        .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));

    let state = Arc::new(gatekv::AppState {
        config: Arc::new(config.clone()),
        backends,
    });

    let app = gatekv::server::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("gatekv listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout))
        .await?;

    info!("gatekv shut down");

    Ok(())
}

fn init_tracing(logging: &gatekv::config::LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(logging.level.clone()));

    if logging.format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Wait for SIGTERM or SIGINT (Ctrl+C), then return to trigger graceful
/// shutdown. `shutdown_timeout` is advisory here -- axum's own graceful
/// shutdown governs in-flight requests; the value is surfaced for
/// operators wiring a supervisor's kill timeout to match.
async fn shutdown_signal(shutdown_timeout: u64) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down (grace period {}s)", shutdown_timeout);
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down (grace period {}s)", shutdown_timeout);
        },
    }
}
