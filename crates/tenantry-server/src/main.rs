//! Tenantry server
//!
//! Usage:
//! ```bash
//! # With config file
//! tenantry-server --config config.yaml
//!
//! # Environment variables override the file, CLI flags override both
//! TENANTRY_JWT_SECRET=change-me tenantry-server --config config.yaml --port 9000
//!
//! # List regions no organization points at, then drop them
//! tenantry-server gc-regions --dry-run
//! tenantry-server gc-regions
//! ```
//!
//! Test with:
//! ```bash
//! curl -X POST http://localhost:8080/org/create \
//!   -H "Content-Type: application/json" \
//!   -d '{"organization_name": "Acme Inc", "email": "a@acme.com", "password": "secret1"}'
//!
//! curl -X POST http://localhost:8080/admin/login \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "a@acme.com", "password": "secret1"}'
//! ```

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use tenantry_auth::Argon2Hasher;
use tenantry_observability::Metrics;
use tenantry_server::{AppState, ServerConfig, Storage, router, telemetry};

/// Tenantry - tenant region lifecycle manager
#[derive(Parser)]
#[command(name = "tenantry-server")]
#[command(about = "Organization and tenant region lifecycle service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file (YAML or TOML)
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "TENANTRY_CONFIG",
        global = true
    )]
    config: Option<String>,

    /// Listen address override
    #[arg(long, global = true)]
    host: Option<String>,

    /// Listen port override
    #[arg(short, long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default if no command specified)
    Serve,
    /// Drop tenant regions that no organization references
    ///
    /// Run only while no renames are in flight: a rename's destination is
    /// unreferenced until the organization is repointed.
    GcRegions {
        /// List orphaned regions without dropping them
        #[arg(long, default_value = "false")]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };

    // Merge environment variables (they override config file)
    config.merge_env();

    // CLI flags (highest precedence)
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    config.validate()?;
    telemetry::init_tracing(&config.logging)?;

    match &cli.config {
        Some(path) => info!(path = %path, "Loaded configuration"),
        None => info!("Using default configuration"),
    }
    if config.auth.uses_development_secret() {
        warn!("Using the built-in development JWT secret; set TENANTRY_JWT_SECRET in production");
    }

    let storage = Storage::open(&config.storage).await?;

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&config, &storage).await,
        Commands::GcRegions { dry_run } => gc_regions(&config, &storage, dry_run).await,
    };

    storage.close().await;
    result
}

async fn serve(config: &ServerConfig, storage: &Storage) -> anyhow::Result<()> {
    let metrics = Arc::new(Metrics::new()?);
    let state = AppState::from_config(storage, config, metrics);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    info!(
        %addr,
        backend = storage.backend_name(),
        batch_size = config.migration.batch_size,
        failure_policy = config.migration.failure_policy.as_str(),
        "Tenantry listening"
    );
    info!("Health check: http://{}/healthz", addr);
    info!("Readiness check: http://{}/readyz", addr);
    info!("Prometheus metrics: http://{}/metrics", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn gc_regions(config: &ServerConfig, storage: &Storage, dry_run: bool) -> anyhow::Result<()> {
    let lifecycle = storage.lifecycle(Arc::new(Argon2Hasher::new()), config.migration.clone());

    if dry_run {
        let orphaned = lifecycle.orphaned_regions().await?;
        if orphaned.is_empty() {
            println!("No orphaned regions");
        }
        for region in orphaned {
            println!("{}", region);
        }
        return Ok(());
    }

    let dropped = lifecycle.drop_orphaned_regions().await?;
    for region in &dropped {
        println!("dropped {}", region);
    }
    println!("{} orphaned region(s) dropped", dropped.len());
    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
