//! # Error Policy
//!
//! What the controller does after a failed reconciliation pass.
//!
//! Every failure requeues the object after the same configured delay. There is no per-object
//! backoff; the `Reconciled=False` condition already carries the error for the user.

use crate::controller::reconciler::{Context, ReconcilerError};
use crate::crd::Cars;
use crate::observability;
use crate::store::ObjectStore;
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{error, info};

/// Requeue a failed Cars object after the fixed error delay
pub fn error_policy<S: ObjectStore>(
    cars: Arc<Cars>,
    error: &ReconcilerError,
    ctx: Arc<Context<S>>,
) -> Action {
    let name = cars.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = cars.metadata.namespace.as_deref().unwrap_or("unknown");
    let delay = ctx.config.error_requeue_after;

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.reconciliation_error",
        resource.name = name,
        resource.namespace = namespace,
        error.kind = error.as_str(),
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}/{}: {}", namespace, name, error);
    observability::metrics::increment_reconciliation_errors();

    info!(
        "Retrying in {}s (trigger source: error-requeue)",
        delay.as_secs()
    );
    observability::metrics::increment_requeues_total("error");
    Action::requeue(delay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::crd::CarsSpec;
    use crate::store::MemoryStore;
    use std::time::Duration;

    #[test]
    fn test_error_requeues_after_configured_delay() {
        let config = ControllerConfig {
            error_requeue_after: Duration::from_secs(5),
            ..ControllerConfig::default()
        };
        let ctx = Arc::new(Context::new(MemoryStore::new(), config));
        let cars = Arc::new(Cars::new("cars", CarsSpec::default()));

        let action = error_policy(cars, &ReconcilerError::MissingObjectKey, ctx);
        assert_eq!(action, Action::requeue(Duration::from_secs(5)));
    }

    #[test]
    fn test_default_delay_is_one_second() {
        let ctx = Arc::new(Context::new(MemoryStore::new(), ControllerConfig::default()));
        let cars = Arc::new(Cars::new("cars", CarsSpec::default()));

        let action = error_policy(cars, &ReconcilerError::MissingObjectKey, ctx);
        assert_eq!(action, Action::requeue(Duration::from_secs(1)));
    }
}
