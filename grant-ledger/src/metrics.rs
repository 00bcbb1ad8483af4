//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `grant_ledger_operations_total{operation}` - Operations attempted
//! - `grant_ledger_operation_failures_total{operation}` - Operations that returned an error
//! - `grant_ledger_settled_amount_total{kind}` - Money moved by settlement kind
//! - `grant_ledger_operation_duration_seconds` - Histogram of operation latencies

use prometheus::{CounterVec, Histogram, HistogramOpts, IntCounterVec, Opts, Registry};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::types::TransactionKind;

/// Metrics collector
///
/// Owns its registry, so several ledgers can live in one process.
#[derive(Clone)]
pub struct Metrics {
    /// Operations attempted, by operation name
    pub operations_total: IntCounterVec,

    /// Failed operations, by operation name
    pub operation_failures_total: IntCounterVec,

    /// Settled amount, by settlement kind
    pub settled_amount_total: CounterVec,

    /// Operation duration histogram
    pub operation_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let operations_total = IntCounterVec::new(
            Opts::new("grant_ledger_operations_total", "Operations attempted"),
            &["operation"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let operation_failures_total = IntCounterVec::new(
            Opts::new(
                "grant_ledger_operation_failures_total",
                "Operations that returned an error",
            ),
            &["operation"],
        )?;
        registry.register(Box::new(operation_failures_total.clone()))?;

        let settled_amount_total = CounterVec::new(
            Opts::new(
                "grant_ledger_settled_amount_total",
                "Money moved by settlement kind",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(settled_amount_total.clone()))?;

        let operation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "grant_ledger_operation_duration_seconds",
                "Histogram of operation latencies",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 1.0]),
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        Ok(Self {
            operations_total,
            operation_failures_total,
            settled_amount_total,
            operation_duration,
            registry,
        })
    }

    /// Record one finished operation
    pub fn record_operation(&self, operation: &str, ok: bool, duration_seconds: f64) {
        self.operations_total.with_label_values(&[operation]).inc();
        if !ok {
            self.operation_failures_total
                .with_label_values(&[operation])
                .inc();
        }
        self.operation_duration.observe(duration_seconds);
    }

    /// Record committed money movement
    pub fn record_settlement(&self, kind: TransactionKind, amount: Decimal) {
        let amount = amount.to_f64().unwrap_or(0.0);
        self.settled_amount_total
            .with_label_values(&[kind.as_str()])
            .inc_by(amount);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
