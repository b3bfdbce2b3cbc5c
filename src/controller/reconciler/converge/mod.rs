//! # Convergers
//!
//! One converger per child resource. Each re-reads the Cars object, builds the desired child
//! with a pure builder function and upserts it with [`create_or_update`].
//!
//! | Step | Object |
//! |------|--------|
//! | `cars-deployment` | Deployment `cars` |
//! | `cars-service` | Service `cars` |
//! | `cars-ingress` | Ingress `cars` (skipped, with the rest of the pass, while no domain is set) |
//! | `mysql-deployment` | Deployment `mysql` |
//! | `mysql-service` | Service `mysql` |
//! | `mysql-pvc` | PersistentVolumeClaim `mysql-data` |
//!
//! [`create_or_update`]: crate::store::create_or_update

mod cars_deployment;
mod ingress;
mod mysql_deployment;
mod mysql_pvc;
mod service;

pub use cars_deployment::{cars_deployment_spec, CarsDeployment};
pub use ingress::{cars_host, cars_ingress_spec, CarsIngress};
pub use mysql_deployment::{mysql_deployment_spec, MysqlDeployment};
pub use mysql_pvc::{default_claim_spec, merge_claim_spec, MysqlPvc};
pub use service::{cars_service_spec, mysql_service_spec, CarsService, MysqlService};

use crate::controller::reconciler::batch::{Converger, StepOutcome};
use crate::controller::reconciler::types::ReconcilerError;
use crate::crd::Cars;
use crate::store::{ObjectKey, ObjectStore, OperationResult, StoreError};
use k8s_openapi::api::core::v1::ResourceRequirements;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// The standard converger list, in run order
pub fn default_convergers<S: ObjectStore + 'static>() -> Vec<Box<dyn Converger<S>>> {
    vec![
        Box::new(CarsDeployment),
        Box::new(CarsService),
        Box::new(CarsIngress),
        Box::new(MysqlDeployment),
        Box::new(MysqlService),
        Box::new(MysqlPvc),
    ]
}

/// Re-read the Cars object so every step works from its latest spec
async fn fetch_cars<S: ObjectStore>(store: &S, key: &ObjectKey) -> Result<Cars, StoreError> {
    store.get::<Cars>(key).await
}

/// Map an upsert result onto a step outcome
fn upsert_outcome(
    step: &'static str,
    child: &ObjectKey,
    result: Result<OperationResult, StoreError>,
) -> StepOutcome {
    match result {
        Ok(OperationResult::Unchanged) => {
            debug!(step, child = %child, "child already converged");
            StepOutcome::Continue
        }
        Ok(operation) => {
            info!(step, child = %child, operation = operation.as_str(), "child converged");
            StepOutcome::Continue
        }
        Err(error) => StepOutcome::StopError(ReconcilerError::store(step, error)),
    }
}

/// `app` and `deployment` labels selecting one workload's pods
fn workload_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), name.to_string()),
        ("deployment".to_string(), name.to_string()),
    ])
}

/// Requests for cpu and memory, a limit for memory only
fn container_resources(
    cpu_request: &str,
    memory_request: &str,
    memory_limit: &str,
) -> ResourceRequirements {
    ResourceRequirements {
        limits: Some(BTreeMap::from([(
            "memory".to_string(),
            Quantity(memory_limit.to_string()),
        )])),
        requests: Some(BTreeMap::from([
            ("cpu".to_string(), Quantity(cpu_request.to_string())),
            ("memory".to_string(), Quantity(memory_request.to_string())),
        ])),
        ..Default::default()
    }
}
