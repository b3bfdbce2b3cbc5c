//! PersistentVolumeClaim `mysql-data`.
//!
//! Most of a claim's spec is immutable once it is bound, so the desired spec starts from
//! the claim already in the cluster (falling back to built-in defaults for a new claim) and
//! only the fields set on the Cars object are overlaid. Fields the platform filled in, such as
//! the bound volume or a defaulted storage class, are carried over untouched.
//!
//! The API server answers an illegal change (e.g. shrinking the request) with 403 Forbidden.
//! That rejection does not fail the pass: it is logged, counted, and the step continues.

use super::{fetch_cars, upsert_outcome};
use crate::constants::{DEFAULT_STORAGE_REQUEST, MYSQL_DATA_NAME};
use crate::controller::reconciler::batch::{Converger, StepOutcome};
use crate::controller::reconciler::ownership::{
    child_meta, ensure_app_labels, set_controller_reference,
};
use crate::controller::reconciler::types::ReconcilerError;
use crate::crd::CarsSpec;
use crate::observability;
use crate::store::{create_or_update, ObjectKey, ObjectStore, StoreError};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;
use tracing::warn;

const STEP: &str = "mysql-pvc";

/// Converges PersistentVolumeClaim `mysql-data`
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlPvc;

#[async_trait]
impl<S: ObjectStore> Converger<S> for MysqlPvc {
    fn name(&self) -> &'static str {
        STEP
    }

    async fn converge(&self, store: &S, key: &ObjectKey) -> StepOutcome {
        let cars = match fetch_cars(store, key).await {
            Ok(cars) => cars,
            Err(e) => return StepOutcome::StopError(ReconcilerError::store(STEP, e)),
        };

        let child = key.sibling(MYSQL_DATA_NAME);

        // Only a rejected write is tolerated; a failed read still fails the step
        let existing = match store.get_opt::<PersistentVolumeClaim>(&child).await {
            Ok(existing) => existing,
            Err(e) => return StepOutcome::StopError(ReconcilerError::store(STEP, e)),
        };
        let desired = merge_claim_spec(
            existing.as_ref().and_then(|pvc| pvc.spec.as_ref()),
            &cars.spec,
        );

        let pvc = PersistentVolumeClaim {
            metadata: child_meta(MYSQL_DATA_NAME, key),
            ..Default::default()
        };
        let result = create_or_update(store, pvc, |pvc: &mut PersistentVolumeClaim| {
            set_controller_reference(pvc, &cars)?;
            ensure_app_labels(&mut pvc.metadata);
            pvc.spec = Some(desired);
            Ok::<(), StoreError>(())
        })
        .await;

        match result {
            Err(error) if error.is_forbidden() => {
                warn!(
                    step = STEP,
                    child = %child,
                    error = %error,
                    "claim change rejected by the API server, keeping the existing claim"
                );
                observability::metrics::increment_storage_claim_rejections();
                StepOutcome::Continue
            }
            result => upsert_outcome(STEP, &child, result),
        }
    }
}

/// Spec for a claim that does not exist yet: RWO, empty storage class, 5Gi
pub fn default_claim_spec() -> PersistentVolumeClaimSpec {
    PersistentVolumeClaimSpec {
        access_modes: Some(vec!["ReadWriteOnce".to_string()]),
        storage_class_name: Some(String::new()),
        resources: Some(VolumeResourceRequirements {
            requests: Some(BTreeMap::from([(
                "storage".to_string(),
                Quantity(DEFAULT_STORAGE_REQUEST.to_string()),
            )])),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Desired claim spec: the existing spec (or the defaults) with the Cars overrides on top
pub fn merge_claim_spec(
    existing: Option<&PersistentVolumeClaimSpec>,
    spec: &CarsSpec,
) -> PersistentVolumeClaimSpec {
    let mut merged = existing.cloned().unwrap_or_else(default_claim_spec);

    if let Some(class) = spec.storage_class() {
        merged.storage_class_name = Some(class.to_string());
    }
    if let Some(resources) = &spec.storage_resources {
        merged.resources = Some(resources.clone());
    }
    if let Some(volume) = spec.storage_volume() {
        merged.volume_name = Some(volume.to_string());
    }
    merged
}
