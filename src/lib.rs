//! # Cars Operator
//!
//! A Kubernetes operator that runs a CARS application and its MySQL companion from a single
//! `Cars` custom resource.
//!
//! ## Overview
//!
//! For every `Cars` object the operator converges six children, in order:
//!
//! 1. **cars Deployment** - the application container, configured from the `cars-environment` secret
//! 2. **cars Service** - headless service on port 7777
//! 3. **cars Ingress** - public route on `<name>.<domain>`, only when a domain is set
//! 4. **mysql Deployment** - MySQL 8.0 backed by the data claim
//! 5. **mysql Service** - headless service on port 3306
//! 6. **mysql PersistentVolumeClaim** - data claim honoring storage class, size and volume
//!
//! The batch stops at the first failing step. The outcome is recorded as a `Reconciled`
//! condition on the `Cars` status.
//!
//! ## Usage
//!
//! See the [README.md](../README.md) for deployment and configuration.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod runtime;
pub mod store;

pub use crd::*;
