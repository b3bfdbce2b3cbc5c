//! # Status Management
//!
//! Turns the outcome of a batch into the `Reconciled` condition on the Cars object.
//!
//! - success: `Reconciled=True`, reason `Complete`, no requeue; a failed status write is
//!   returned as the pass error
//! - failure: `Reconciled=False`, reason `Error`, message = error text; a failed status write
//!   is logged and dropped so the step error is what gets reported
//!
//! When the merged conditions equal the stored ones the status write is skipped, so a steady
//! state produces no writes and no watch events.

use crate::controller::reconciler::batch::BatchOutcome;
use crate::controller::reconciler::types::ReconcilerError;
use crate::crd::{
    Cars, Condition, ConditionStatus, CONDITION_RECONCILED, REASON_COMPLETE, REASON_ERROR,
    RECONCILE_COMPLETE_MESSAGE,
};
use crate::store::{ObjectKey, ObjectStore, StoreError};
use chrono::{DateTime, SecondsFormat, Utc};
use kube_runtime::controller::Action;
use tracing::{debug, warn};

/// Insert or update `condition` in `conditions`, keeping at most one condition per type
///
/// `lastTransitionTime` is stamped with `now` for a new condition and moves only when the
/// status value changes. Reason, message and observed generation are always refreshed.
/// Returns whether anything changed.
pub fn set_status_condition(
    conditions: &mut Vec<Condition>,
    mut condition: Condition,
    now: DateTime<Utc>,
) -> bool {
    let stamp = || now.to_rfc3339_opts(SecondsFormat::Secs, true);

    let Some(index) = conditions
        .iter()
        .position(|c| c.r#type == condition.r#type)
    else {
        if condition.last_transition_time.is_none() {
            condition.last_transition_time = Some(stamp());
        }
        conditions.push(condition);
        return true;
    };

    let existing = &mut conditions[index];
    let before = existing.clone();
    if existing.status != condition.status {
        existing.status = condition.status;
        existing.last_transition_time = condition.last_transition_time.or_else(|| Some(stamp()));
    }
    existing.reason = condition.reason;
    existing.message = condition.message;
    existing.observed_generation = condition.observed_generation;
    *existing != before
}

/// The `Reconciled` condition describing a batch outcome
pub fn reconciled_condition(
    outcome: &BatchOutcome,
    observed_generation: Option<i64>,
) -> Condition {
    let mut condition = match outcome.error() {
        None => Condition::new(
            CONDITION_RECONCILED,
            ConditionStatus::True,
            REASON_COMPLETE,
            RECONCILE_COMPLETE_MESSAGE,
        ),
        Some(error) => Condition::new(
            CONDITION_RECONCILED,
            ConditionStatus::False,
            REASON_ERROR,
            error.to_string(),
        ),
    };
    condition.observed_generation = observed_generation;
    condition
}

/// Record `outcome` on `cars` and decide what the scheduler should do next
pub async fn report_outcome<S: ObjectStore>(
    store: &S,
    key: &ObjectKey,
    cars: &Cars,
    outcome: BatchOutcome,
) -> Result<Action, ReconcilerError> {
    let condition = reconciled_condition(&outcome, cars.metadata.generation);
    let write = write_condition(store, cars, condition).await;

    match outcome.into_result() {
        Ok(()) => {
            write.map_err(|source| ReconcilerError::StatusUpdate {
                key: key.clone(),
                source,
            })?;
            Ok(Action::await_change())
        }
        Err(error) => {
            if let Err(status_error) = write {
                warn!(
                    resource = %key,
                    error = %status_error,
                    "failed to record reconcile failure on status"
                );
            }
            Err(error)
        }
    }
}

async fn write_condition<S: ObjectStore>(
    store: &S,
    cars: &Cars,
    condition: Condition,
) -> Result<(), StoreError> {
    let mut updated = cars.clone();
    let status = updated.status.get_or_insert_with(Default::default);
    if !set_status_condition(&mut status.conditions, condition, Utc::now()) {
        debug!("Skipping status update - conditions unchanged");
        return Ok(());
    }
    store.update_status(&updated).await?;
    Ok(())
}
