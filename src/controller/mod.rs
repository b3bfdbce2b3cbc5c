//! # Controller Module
//!
//! Reconciliation engine plus the HTTP server for metrics and probes.

pub mod reconciler;
pub mod server;
