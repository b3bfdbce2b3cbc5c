//! # Batch Engine
//!
//! Runs the convergers of one reconciliation pass in a fixed order.
//!
//! Every step reports one of three outcomes:
//!
//! - [`StepOutcome::Continue`] - the step converged, run the next one
//! - [`StepOutcome::StopOk`] - stop here and report success (e.g. no domain for the ingress)
//! - [`StepOutcome::StopError`] - stop here and report the error
//!
//! A stop from any step ends the whole pass; later steps do not run even when they manage
//! unrelated resources. The engine never retries; the error goes back to the caller, which
//! schedules the next attempt.

use crate::controller::reconciler::types::ReconcilerError;
use crate::observability;
use crate::store::{ObjectKey, ObjectStore};
use async_trait::async_trait;
use tracing::{debug, info, warn, Instrument};

/// Result of one converger step
#[derive(Debug)]
pub enum StepOutcome {
    Continue,
    StopOk,
    StopError(ReconcilerError),
}

impl StepOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepOutcome::Continue => "continue",
            StepOutcome::StopOk => "stop_ok",
            StepOutcome::StopError(_) => "stop_error",
        }
    }
}

/// One step of the batch: converges a single child resource
#[async_trait]
pub trait Converger<S: ObjectStore>: Send + Sync {
    /// Stable step name used in logs, metrics and error messages
    fn name(&self) -> &'static str;

    /// Converge the child resource of the Cars object identified by `key`
    async fn converge(&self, store: &S, key: &ObjectKey) -> StepOutcome;
}

/// Aggregate outcome of a batch
#[derive(Debug)]
pub enum BatchOutcome {
    /// Every step returned `Continue`
    Completed,
    /// A step asked to stop without error; the steps after it did not run
    Stopped { step: &'static str },
    /// A step failed; the steps after it did not run
    Failed {
        step: &'static str,
        error: ReconcilerError,
    },
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, BatchOutcome::Failed { .. })
    }

    pub fn error(&self) -> Option<&ReconcilerError> {
        match self {
            BatchOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<(), ReconcilerError> {
        match self {
            BatchOutcome::Failed { error, .. } => Err(error),
            _ => Ok(()),
        }
    }
}

/// Run `steps` in order until one stops or all complete
pub async fn run_batch<S: ObjectStore>(
    store: &S,
    key: &ObjectKey,
    steps: &[Box<dyn Converger<S>>],
) -> BatchOutcome {
    for step in steps {
        let name = step.name();
        let span = tracing::info_span!(
            "reconcile.step",
            step = name,
            resource.namespace = %key.namespace,
            resource.name = %key.name,
        );
        let outcome = step.converge(store, key).instrument(span).await;
        observability::metrics::increment_step_outcomes(name, outcome.as_str());

        match outcome {
            StepOutcome::Continue => {
                debug!(step = name, resource = %key, "step converged");
            }
            StepOutcome::StopOk => {
                info!(
                    step = name,
                    resource = %key,
                    "step requested stop, skipping remaining steps"
                );
                return BatchOutcome::Stopped { step: name };
            }
            StepOutcome::StopError(error) => {
                warn!(step = name, resource = %key, error = %error, "step failed");
                return BatchOutcome::Failed { step: name, error };
            }
        }
    }
    BatchOutcome::Completed
}
