//! # Observability
//!
//! Prometheus metrics for the operator. Logging goes through `tracing` directly.

pub mod metrics;
