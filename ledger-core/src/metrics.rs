//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `ledger_users_created_total` - Users created
//! - `ledger_transfers_total` - Committed transfers
//! - `ledger_transferred_tokens_total` - Tokens moved by committed transfers
//! - `ledger_operation_failures_total{operation,kind}` - Failed operations by error kind
//! - `ledger_operation_duration_seconds{operation}` - Operation latency
//! - `ledger_retries_total` - Operations re-executed after store contention
//!
//! Each [`Metrics`] owns its registry, so several ledgers can coexist in one process.

use crate::error::ErrorKind;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Users created
    pub users_created: IntCounter,

    /// Committed transfers
    pub transfers_total: IntCounter,

    /// Tokens moved
    pub transferred_tokens: IntCounter,

    /// Failures by operation and kind
    pub failures: IntCounterVec,

    /// Operation duration histogram
    pub operation_duration: HistogramVec,

    /// Contention retries
    pub retries: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let users_created = IntCounter::new("ledger_users_created_total", "Users created")?;
        registry.register(Box::new(users_created.clone()))?;

        let transfers_total = IntCounter::new("ledger_transfers_total", "Committed transfers")?;
        registry.register(Box::new(transfers_total.clone()))?;

        let transferred_tokens = IntCounter::new(
            "ledger_transferred_tokens_total",
            "Tokens moved by committed transfers",
        )?;
        registry.register(Box::new(transferred_tokens.clone()))?;

        let failures = IntCounterVec::new(
            Opts::new("ledger_operation_failures_total", "Failed operations"),
            &["operation", "kind"],
        )?;
        registry.register(Box::new(failures.clone()))?;

        let operation_duration = HistogramVec::new(
            HistogramOpts::new("ledger_operation_duration_seconds", "Operation latency").buckets(
                vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 5.0],
            ),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        let retries = IntCounter::new(
            "ledger_retries_total",
            "Operations re-executed after store contention",
        )?;
        registry.register(Box::new(retries.clone()))?;

        Ok(Self {
            users_created,
            transfers_total,
            transferred_tokens,
            failures,
            operation_duration,
            retries,
            registry,
        })
    }

    /// Record a failed operation
    pub fn record_failure(&self, operation: &str, kind: ErrorKind) {
        self.failures
            .with_label_values(&[operation, kind.as_str()])
            .inc();
    }

    /// Record operation latency
    pub fn observe_duration(&self, operation: &str, seconds: f64) {
        self.operation_duration
            .with_label_values(&[operation])
            .observe(seconds);
    }

    /// Record a committed transfer
    pub fn record_transfer(&self, amount: i64) {
        self.transfers_total.inc();
        self.transferred_tokens.inc_by(amount.unsigned_abs());
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.transfers_total.get(), 0);
        // Independent registries do not collide
        assert!(Metrics::new().is_ok());
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = Metrics::new().unwrap();

        metrics.record_transfer(100);
        metrics.record_transfer(50);
        metrics.record_failure("create_transfer", ErrorKind::InsufficientFunds);
        metrics.observe_duration("create_transfer", 0.002);

        assert_eq!(metrics.transfers_total.get(), 2);
        assert_eq!(metrics.transferred_tokens.get(), 150);
        assert_eq!(
            metrics
                .failures
                .with_label_values(&["create_transfer", "insufficient_funds"])
                .get(),
            1
        );
    }

    #[test]
    fn test_metrics_export() {
        let metrics = Metrics::new().unwrap();
        metrics.users_created.inc();

        let output = metrics.export().unwrap();
        assert!(output.contains("ledger_users_created_total"));
    }
}
