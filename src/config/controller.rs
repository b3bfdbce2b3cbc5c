//! # Controller Configuration
//!
//! Settings that shape reconciliation: retry delay, watch scope and field manager.

use super::env_var_or_default;
use crate::constants::{DEFAULT_ERROR_REQUEUE_SECS, DEFAULT_FIELD_MANAGER, MAX_ERROR_REQUEUE_SECS};
use std::time::Duration;

/// Reconciliation configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Fixed delay before a failed pass is retried
    ///
    /// Clamped to `1..=MAX_ERROR_REQUEUE_SECS` seconds so a failed pass is always retried
    /// and never parked indefinitely.
    pub error_requeue_after: Duration,
    /// Restrict the watch to one namespace; `None` watches all namespaces
    pub watch_namespace: Option<String>,
    /// Field manager recorded on every write
    pub field_manager: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            error_requeue_after: Duration::from_secs(DEFAULT_ERROR_REQUEUE_SECS),
            watch_namespace: None,
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let requeue_secs = env_var_or_default("ERROR_REQUEUE_SECS", DEFAULT_ERROR_REQUEUE_SECS);
        let watch_namespace = std::env::var("WATCH_NAMESPACE")
            .ok()
            .map(|ns| ns.trim().to_string())
            .filter(|ns| !ns.is_empty());
        let field_manager =
            env_var_or_default("FIELD_MANAGER", DEFAULT_FIELD_MANAGER.to_string());

        Self {
            error_requeue_after: Self::bounded_requeue(requeue_secs),
            watch_namespace,
            field_manager,
        }
    }

    fn bounded_requeue(secs: u64) -> Duration {
        Duration::from_secs(secs.clamp(1, MAX_ERROR_REQUEUE_SECS))
    }
}
