//! # Reconciler Types
//!
//! Shared context and error types for reconciliation.

use crate::config::ControllerConfig;
use crate::controller::reconciler::batch::Converger;
use crate::controller::reconciler::converge::default_convergers;
use crate::store::{ObjectKey, ObjectStore, StoreError};
use thiserror::Error;

/// Reconciliation error
///
/// The `Display` text is what ends up in the `Reconciled=False` condition message.
#[derive(Debug, Error)]
pub enum ReconcilerError {
    /// A converger's object-store call failed
    #[error("{step}: {source}")]
    Store {
        step: &'static str,
        #[source]
        source: StoreError,
    },

    /// The triggering object has no name or namespace
    #[error("Cars object has no name or namespace")]
    MissingObjectKey,

    /// Writing the status sub-resource after a successful batch failed
    #[error("failed to update status of Cars {key}: {source}")]
    StatusUpdate {
        key: ObjectKey,
        #[source]
        source: StoreError,
    },
}

impl ReconcilerError {
    pub fn store(step: &'static str, source: StoreError) -> Self {
        ReconcilerError::Store { step, source }
    }

    /// Short label for metrics and structured logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcilerError::Store { source, .. } => source.as_str(),
            ReconcilerError::MissingObjectKey => "missing_object_key",
            ReconcilerError::StatusUpdate { .. } => "status_update",
        }
    }
}

/// Everything a reconciliation pass needs, shared across passes
pub struct Context<S: ObjectStore> {
    /// Object store the convergers read and write through
    pub store: S,
    pub config: ControllerConfig,
    /// Convergers in the order they run
    pub convergers: Vec<Box<dyn Converger<S>>>,
}

impl<S: ObjectStore + 'static> Context<S> {
    /// Context with the standard converger list
    pub fn new(store: S, config: ControllerConfig) -> Self {
        Self::with_convergers(store, config, default_convergers())
    }
}

impl<S: ObjectStore> Context<S> {
    pub fn with_convergers(
        store: S,
        config: ControllerConfig,
        convergers: Vec<Box<dyn Converger<S>>>,
    ) -> Self {
        Self {
            store,
            config,
            convergers,
        }
    }

    /// Names of the convergers in run order
    pub fn step_names(&self) -> Vec<&'static str> {
        self.convergers.iter().map(|c| c.name()).collect()
    }
}

impl<S: ObjectStore + std::fmt::Debug> std::fmt::Debug for Context<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("store", &self.store)
            .field("config", &self.config)
            .field("convergers", &self.step_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_store_error_display_names_step() {
        let err = ReconcilerError::store(
            "mysql-deployment",
            StoreError::Unavailable {
                kind: "Deployment".to_string(),
                key: ObjectKey::new("cars", "mysql"),
                message: "etcdserver: request timed out".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "mysql-deployment: store unavailable for Deployment cars/mysql: etcdserver: request timed out"
        );
        assert_eq!(err.as_str(), "unavailable");
    }

    #[test]
    fn test_default_context_step_order() {
        let ctx = Context::new(MemoryStore::new(), ControllerConfig::default());
        assert_eq!(
            ctx.step_names(),
            vec![
                "cars-deployment",
                "cars-service",
                "cars-ingress",
                "mysql-deployment",
                "mysql-service",
                "mysql-pvc",
            ]
        );
    }
}
