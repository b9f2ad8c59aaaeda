// Copyright (c) 2024 Botho Foundation

//! Prometheus metrics for the Meridian node.
//!
//! ## Metrics Exported
//!
//! - `meridian_block_height` - Height of the last begun block (gauge)
//! - `meridian_inflation` - Inflation rate after the last block (gauge)
//! - `meridian_annual_provisions` - Annual provisions after the last block (gauge)
//! - `meridian_block_provision` - Amount minted in the last block (gauge)
//! - `meridian_minted_total` - Total amount minted by the policy engine (counter)
//! - `meridian_tx_admitted_total` - Admitted transactions by mode (counter)
//! - `meridian_tx_rejected_total` - Rejected transactions by gatekeeper (counter)
//!
//! Metrics are per instance and only exported through [`NodeMetrics::encode`].

use mrd_mint_policy::{Dec, DEC_SCALE};
use prometheus::{
    Counter, Encoder, Gauge, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

pub struct NodeMetrics {
    registry: Registry,
    pub block_height: IntGauge,
    pub inflation: Gauge,
    pub annual_provisions: Gauge,
    pub block_provision: Gauge,
    pub minted_total: Counter,
    pub tx_admitted_total: IntCounterVec,
    pub tx_rejected_total: IntCounterVec,
}

impl NodeMetrics {
    /// Create a new metrics registry with all metrics registered
    pub fn new() -> Self {
        let registry = Registry::new();

        let block_height = IntGauge::with_opts(Opts::new(
            "meridian_block_height",
            "Height of the last begun block",
        ))
        .expect("metric can be created");

        let inflation = Gauge::with_opts(Opts::new(
            "meridian_inflation",
            "Inflation rate after the last block",
        ))
        .expect("metric can be created");

        let annual_provisions = Gauge::with_opts(Opts::new(
            "meridian_annual_provisions",
            "Annual provisions after the last block",
        ))
        .expect("metric can be created");

        let block_provision = Gauge::with_opts(Opts::new(
            "meridian_block_provision",
            "Amount minted in the last block",
        ))
        .expect("metric can be created");

        let minted_total = Counter::with_opts(Opts::new(
            "meridian_minted_total",
            "Total amount minted by the monetary policy engine",
        ))
        .expect("metric can be created");

        let tx_admitted_total = IntCounterVec::new(
            Opts::new("meridian_tx_admitted_total", "Admitted transactions"),
            &["mode"],
        )
        .expect("metric can be created");

        let tx_rejected_total = IntCounterVec::new(
            Opts::new("meridian_tx_rejected_total", "Rejected transactions"),
            &["gatekeeper"],
        )
        .expect("metric can be created");

        registry
            .register(Box::new(block_height.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(inflation.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(annual_provisions.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(block_provision.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(minted_total.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(tx_admitted_total.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(tx_rejected_total.clone()))
            .expect("collector can be registered");

        Self {
            registry,
            block_height,
            inflation,
            annual_provisions,
            block_provision,
            minted_total,
            tx_admitted_total,
            tx_rejected_total,
        }
    }

    /// Record the outcome of one block's minting.
    pub fn record_mint(&self, inflation: Dec, annual_provisions: Dec, minted: u128) {
        self.inflation.set(dec_to_f64(inflation));
        self.annual_provisions.set(dec_to_f64(annual_provisions));
        self.block_provision.set(minted as f64);
        self.minted_total.inc_by(minted as f64);
    }

    pub fn record_admitted(&self, mode: &str) {
        self.tx_admitted_total.with_label_values(&[mode]).inc();
    }

    pub fn record_rejected(&self, gatekeeper: &str) {
        self.tx_rejected_total.with_label_values(&[gatekeeper]).inc();
    }

    /// Encode metrics in Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap_or_default())
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Lossy conversion for export only.
fn dec_to_f64(value: Dec) -> f64 {
    let raw = value.raw();
    (raw / DEC_SCALE) as f64 + (raw % DEC_SCALE) as f64 / DEC_SCALE as f64
}
