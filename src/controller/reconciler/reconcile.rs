//! # Reconciliation
//!
//! One pass over a Cars object: fetch it, run the converger batch, record the outcome.
//!
//! If the Cars object cannot be fetched (usually because it was deleted) the pass ends
//! quietly: there is nothing to write a status onto, and the children are cleaned up by the
//! garbage collector through their owner references.

use crate::controller::reconciler::batch::run_batch;
use crate::controller::reconciler::status::report_outcome;
use crate::controller::reconciler::types::{Context, ReconcilerError};
use crate::crd::Cars;
use crate::observability;
use crate::store::{ObjectKey, ObjectStore};
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, Instrument};

/// Reconcile the Cars object identified by `key`
pub async fn reconcile_pass<S: ObjectStore>(
    ctx: &Context<S>,
    key: &ObjectKey,
) -> Result<Action, ReconcilerError> {
    let cars = match ctx.store.get::<Cars>(key).await {
        Ok(cars) => cars,
        Err(e) if e.is_not_found() => {
            info!(resource = %key, "Cars object not found, nothing to reconcile");
            return Ok(Action::await_change());
        }
        Err(e) => {
            error!(resource = %key, error = %e, "unable to fetch Cars object");
            return Ok(Action::await_change());
        }
    };

    let outcome = run_batch(&ctx.store, key, &ctx.convergers).await;
    report_outcome(&ctx.store, key, &cars, outcome).await
}

/// Controller entry point: reconcile the object that triggered this pass
pub async fn reconcile<S: ObjectStore>(
    cars: Arc<Cars>,
    ctx: Arc<Context<S>>,
) -> Result<Action, ReconcilerError> {
    let key = ObjectKey::for_object(cars.as_ref()).ok_or(ReconcilerError::MissingObjectKey)?;

    let span = tracing::info_span!(
        "reconcile",
        resource.namespace = %key.namespace,
        resource.name = %key.name,
        resource.generation = cars.metadata.generation,
    );

    observability::metrics::increment_reconciliations();
    let start = Instant::now();
    let result = reconcile_pass(ctx.as_ref(), &key).instrument(span).await;
    observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

    match &result {
        Ok(_) => info!(resource = %key, "reconcile complete"),
        Err(e) => error!(resource = %key, error = %e, "reconcile failed"),
    }
    result
}
