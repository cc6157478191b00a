// Copyright (c) 2026 Indie Wallet Contributors. MIT License.
// See LICENSE for details.

//! # Indie Node
//!
//! Entry point for the `indie-node` binary. Parses CLI arguments, opens the
//! wallet store, and serves the HTTP/RPC/WS API plus Prometheus metrics.
//!
//! - `run`: start the ledger service
//! - `lookup`: print one wallet straight from the data directory
//! - `version`: print build version information

mod api;
mod cli;
mod logging;
mod metrics;
mod ops;
mod rpc;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;

use indie_ledger::{Identity, Ledger, Provenance, SledBalanceStore, Wallet};

use cli::{Commands, IndieNodeCli};
use logging::LogFormat;
use metrics::LedgerMetrics;

/// Broadcast channel capacity for WebSocket event streaming.
const EVENT_CHANNEL_CAPACITY: usize = 256;

const DEFAULT_LOG_FILTER: &str = "indie_node=info,indie_ledger=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = IndieNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Lookup(args) => lookup_wallet(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

fn store_path(data_dir: &Path) -> PathBuf {
    data_dir.join("ledger")
}

fn open_store(data_dir: &Path) -> Result<SledBalanceStore> {
    let path = store_path(data_dir);
    std::fs::create_dir_all(&path)
        .with_context(|| format!("failed to create store directory: {}", path.display()))?;
    SledBalanceStore::open(&path)
        .with_context(|| format!("failed to open wallet store at {}", path.display()))
}

/// Starts the ledger service: API server and metrics endpoint.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(DEFAULT_LOG_FILTER, LogFormat::from_str_lossy(&args.log_format));

    tracing::info!(
        http_port = args.http_port,
        metrics_port = args.metrics_port,
        request_timeout_secs = args.request_timeout().as_secs(),
        data_dir = %args.data_dir.display(),
        "starting indie-node"
    );

    // --- Persistent storage ---
    let store = open_store(&args.data_dir)?;
    tracing::info!(wallets = store.wallet_count(), "wallet store opened");
    let ledger = Arc::new(Ledger::new(store));

    // --- Metrics ---
    let ledger_metrics = Arc::new(LedgerMetrics::new().context("failed to register metrics")?);

    // --- Event broadcast ---
    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

    // --- Application state ---
    let app_state = ops::AppState {
        version: format!(
            "{} (ledger {})",
            env!("CARGO_PKG_VERSION"),
            indie_ledger::config::LEDGER_VERSION,
        ),
        ledger: Arc::clone(&ledger),
        metrics: Arc::clone(&ledger_metrics),
        event_tx,
    };

    // --- API server ---
    let api_router = api::create_router(app_state, args.request_timeout());
    let api_addr = format!("0.0.0.0:{}", args.http_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&ledger_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    ledger
        .store()
        .flush()
        .context("failed to flush wallet store on shutdown")?;
    tracing::info!("indie-node stopped");
    Ok(())
}

/// Prints one wallet from the data directory as JSON.
fn lookup_wallet(args: cli::LookupArgs) -> Result<()> {
    logging::init_logging("indie_node=warn", LogFormat::Pretty);

    let wallet = read_wallet(&args.data_dir, &args.provenance, &args.external_id)?;
    println!("{}", serde_json::to_string_pretty(&wallet)?);
    Ok(())
}

fn read_wallet(data_dir: &Path, provenance: &str, external_id: &str) -> Result<Wallet> {
    let provenance: Provenance = provenance
        .parse()
        .with_context(|| format!("invalid provenance {provenance:?}"))?;
    let identity = Identity::new(provenance, external_id).context("invalid identity")?;

    let store = open_store(data_dir)
        .context("is indie-node still running against this data directory?")?;
    let ledger = Ledger::new(store);

    ledger
        .lookup(&identity)?
        .with_context(|| format!("no wallet for {identity}"))
}

/// Prints version information to stdout.
fn print_version() {
    println!("indie-node   {}", env!("CARGO_PKG_VERSION"));
    println!("indie-ledger {}", indie_ledger::config::LEDGER_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
