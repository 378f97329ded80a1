//! In-process metrics for the image pipeline.
//!
//! Counters, gauges and histograms are atomics keyed by label sets and are
//! rendered in Prometheus text format by the `/metrics` handler.

pub mod metrics;

pub use metrics::GatewayMetrics;
