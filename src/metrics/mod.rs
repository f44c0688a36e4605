//! Metrics
//!
//! Thin wrappers over the `metrics` facade. The library only records; installing an
//! exporter (Prometheus, StatsD, ...) is up to the application.

pub mod counters;
pub mod histograms;
pub mod labels;
