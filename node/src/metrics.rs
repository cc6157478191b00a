//! # Prometheus Metrics
//!
//! Ledger traffic counters for the node, scraped at `/metrics` on the
//! metrics port. Everything lives in a dedicated registry prefixed `indie`.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::sync::Arc;

/// Metric handles shared by all request handlers.
#[derive(Clone)]
pub struct LedgerMetrics {
    registry: Registry,
    /// Credits applied, including the ones that opened a wallet.
    pub credits_total: IntCounter,
    /// Debits applied.
    pub debits_total: IntCounter,
    /// Debits refused for insufficient funds or a missing wallet.
    pub debit_rejections_total: IntCounter,
    /// Wallets opened by a first credit.
    pub wallets_created_total: IntCounter,
    /// Payments that moved coins.
    pub payments_total: IntCounter,
    /// Payments that did not.
    pub payments_failed_total: IntCounter,
    /// Calls that ended in `StoreUnavailable`.
    pub store_errors_total: IntCounter,
    /// Wall time of a credit or debit, store call included.
    pub mutation_latency_seconds: Histogram,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, prometheus::Error> {
    let counter = IntCounter::new(name, help)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

impl LedgerMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("indie".into()), None)?;

        let mutation_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "mutation_latency_seconds",
                "Latency of credit and debit operations in seconds",
            )
            .buckets(vec![
                0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
        )?;
        registry.register(Box::new(mutation_latency_seconds.clone()))?;

        Ok(Self {
            credits_total: counter(&registry, "credits_total", "Total credits applied")?,
            debits_total: counter(&registry, "debits_total", "Total debits applied")?,
            debit_rejections_total: counter(
                &registry,
                "debit_rejections_total",
                "Debits rejected for insufficient funds or unknown identity",
            )?,
            wallets_created_total: counter(
                &registry,
                "wallets_created_total",
                "Wallets opened by a first credit",
            )?,
            payments_total: counter(&registry, "payments_total", "Payments completed")?,
            payments_failed_total: counter(
                &registry,
                "payments_failed_total",
                "Payments that failed before or during the transfer",
            )?,
            store_errors_total: counter(
                &registry,
                "store_errors_total",
                "Ledger calls that failed in the balance store",
            )?,
            mutation_latency_seconds,
            registry,
        })
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub type SharedMetrics = Arc<LedgerMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
