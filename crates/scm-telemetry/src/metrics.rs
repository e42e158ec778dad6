//! Prometheus metrics for the market maker.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which must crash at startup. These panics only
//! happen during static initialization.

use once_cell::sync::Lazy;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Strategy ticks. Labels: kind (liquidity/adjustment), outcome (placed/skipped/failed)
pub static TICKS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "scm_ticks_total",
        "Total strategy ticks by kind and outcome",
        &["kind", "outcome"]
    )
    .unwrap()
});

/// Tick wall time in milliseconds, from cancel to last submission.
pub static TICK_DURATION_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "scm_tick_duration_ms",
        "Strategy tick duration in milliseconds",
        &["kind"],
        vec![1.0, 5.0, 10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0]
    )
    .unwrap()
});

pub static INTENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "scm_intents_total",
        "Total order intents produced",
        &["partition", "side"]
    )
    .unwrap()
});

/// Layers left empty by the allocator. Labels: side, reason
pub static LAYER_SKIPS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "scm_layer_skips_total",
        "Total ladder layers skipped by the allocator",
        &["side", "reason"]
    )
    .unwrap()
});

pub static SUBMIT_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "scm_submit_failures_total",
        "Total order submissions rejected by the venue",
        &["partition"]
    )
    .unwrap()
});

pub static CANCEL_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "scm_cancel_failures_total",
        "Total failed cancel rounds",
        &["partition"]
    )
    .unwrap()
});

pub static FILLS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!("scm_fills_total", "Total fills received", &["side"]).unwrap()
});

/// Signed base position (positive = long).
pub static POSITION_BASE: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!("scm_position_base", "Signed base-currency position").unwrap()
});

pub static REALIZED_PNL: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!("scm_realized_pnl", "Accumulated net profit in quote currency").unwrap()
});

pub static MID_PRICE: Lazy<Gauge> =
    Lazy::new(|| register_gauge!("scm_mid_price", "Smoothed mid price").unwrap());

pub static BAND_WIDTH: Lazy<Gauge> =
    Lazy::new(|| register_gauge!("scm_band_width", "Bollinger band width").unwrap());

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    pub fn tick(kind: &str, outcome: &str) {
        TICKS_TOTAL.with_label_values(&[kind, outcome]).inc();
    }

    pub fn tick_duration(kind: &str, duration_ms: f64) {
        TICK_DURATION_MS
            .with_label_values(&[kind])
            .observe(duration_ms);
    }

    pub fn intents(partition: &str, side: &str, count: usize) {
        INTENTS_TOTAL
            .with_label_values(&[partition, side])
            .inc_by(count as f64);
    }

    pub fn layer_skipped(side: &str, reason: &str) {
        LAYER_SKIPS_TOTAL.with_label_values(&[side, reason]).inc();
    }

    pub fn submit_failures(partition: &str, count: usize) {
        if count > 0 {
            SUBMIT_FAILURES_TOTAL
                .with_label_values(&[partition])
                .inc_by(count as f64);
        }
    }

    pub fn cancel_failed(partition: &str) {
        CANCEL_FAILURES_TOTAL.with_label_values(&[partition]).inc();
    }

    pub fn fill(side: &str) {
        FILLS_TOTAL.with_label_values(&[side]).inc();
    }

    pub fn position(base: Decimal, realized_pnl: Decimal) {
        POSITION_BASE.set(base.to_f64().unwrap_or(0.0));
        REALIZED_PNL.set(realized_pnl.to_f64().unwrap_or(0.0));
    }

    /// Record the indicator values that drove the last ladder.
    pub fn pricing(mid_price: f64, band_width: f64) {
        MID_PRICE.set(mid_price);
        BAND_WIDTH.set(band_width);
    }

    /// Render the default registry in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
