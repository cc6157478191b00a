//! # CLI Interface
//!
//! `clap` derive definitions for `indie-node`. Every `run` flag has an
//! `INDIE_*` environment fallback.

use clap::{Parser, Subcommand};
use indie_ledger::config::{DEFAULT_HTTP_PORT, DEFAULT_METRICS_PORT, DEFAULT_REQUEST_TIMEOUT_SECS};
use std::path::PathBuf;
use std::time::Duration;

/// Indie Tokens wallet ledger service.
///
/// Serves credit, debit and payment operations over HTTP and JSON-RPC,
/// backed by an embedded sled store, and exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "indie-node",
    about = "Indie Tokens wallet ledger service",
    version,
    propagate_version = true
)]
pub struct IndieNodeCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the ledger service.
    Run(RunArgs),
    /// Print one wallet from the data directory as JSON. The service must
    /// not be running against the same directory.
    Lookup(LookupArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Directory holding the wallet store. Created on first run.
    #[arg(long, short = 'd', env = "INDIE_DATA_DIR", default_value = "./indie-data")]
    pub data_dir: PathBuf,

    /// Port for the REST, JSON-RPC and WebSocket API.
    #[arg(long, env = "INDIE_HTTP_PORT", default_value_t = DEFAULT_HTTP_PORT)]
    pub http_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "INDIE_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Seconds a request may run before it is abandoned with 408.
    #[arg(long, env = "INDIE_REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,

    /// Log output: "pretty" or "json".
    #[arg(long, env = "INDIE_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

impl RunArgs {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Arguments for the `lookup` subcommand.
#[derive(Parser, Debug)]
pub struct LookupArgs {
    /// Directory holding the wallet store.
    #[arg(long, short = 'd', env = "INDIE_DATA_DIR", default_value = "./indie-data")]
    pub data_dir: PathBuf,

    /// Issuing platform: "chat" or "forge".
    pub provenance: String,

    /// Account id on that platform.
    pub external_id: String,
}
