//! Headless Services `cars` and `mysql`.

use super::{fetch_cars, upsert_outcome};
use crate::constants::{CARS_NAME, CARS_PORT, MYSQL_NAME, MYSQL_PORT};
use crate::controller::reconciler::batch::{Converger, StepOutcome};
use crate::controller::reconciler::ownership::{
    child_meta, ensure_app_labels, set_controller_reference,
};
use crate::controller::reconciler::types::ReconcilerError;
use crate::store::{apply_owned, create_or_update, ObjectKey, ObjectStore};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

/// Converges Service `cars`
#[derive(Debug, Clone, Copy, Default)]
pub struct CarsService;

/// Converges Service `mysql`
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlService;

#[async_trait]
impl<S: ObjectStore> Converger<S> for CarsService {
    fn name(&self) -> &'static str {
        "cars-service"
    }

    async fn converge(&self, store: &S, key: &ObjectKey) -> StepOutcome {
        converge_service(store, key, "cars-service", CARS_NAME, cars_service_spec()).await
    }
}

#[async_trait]
impl<S: ObjectStore> Converger<S> for MysqlService {
    fn name(&self) -> &'static str {
        "mysql-service"
    }

    async fn converge(&self, store: &S, key: &ObjectKey) -> StepOutcome {
        converge_service(store, key, "mysql-service", MYSQL_NAME, mysql_service_spec()).await
    }
}

async fn converge_service<S: ObjectStore>(
    store: &S,
    key: &ObjectKey,
    step: &'static str,
    name: &str,
    spec: ServiceSpec,
) -> StepOutcome {
    let cars = match fetch_cars(store, key).await {
        Ok(cars) => cars,
        Err(e) => return StepOutcome::StopError(ReconcilerError::store(step, e)),
    };

    let child = key.sibling(name);
    let svc = Service {
        metadata: child_meta(name, key),
        ..Default::default()
    };
    let result = create_or_update(store, svc, |svc: &mut Service| {
        set_controller_reference(svc, &cars)?;
        ensure_app_labels(&mut svc.metadata);
        apply_owned(&mut svc.spec, spec)
    })
    .await;
    upsert_outcome(step, &child, result)
}

/// Spec for Service `cars`
pub fn cars_service_spec() -> ServiceSpec {
    headless_service_spec(CARS_NAME, "cars-tcp", CARS_PORT)
}

/// Spec for Service `mysql`
pub fn mysql_service_spec() -> ServiceSpec {
    headless_service_spec(MYSQL_NAME, "mysql-tcp", MYSQL_PORT)
}

/// Single-stack IPv4 headless service exposing one TCP port of the `app=<app>` pods
fn headless_service_spec(app: &str, port_name: &str, port: i32) -> ServiceSpec {
    ServiceSpec {
        selector: Some(BTreeMap::from([("app".to_string(), app.to_string())])),
        cluster_ip: Some("None".to_string()),
        ip_family_policy: Some("SingleStack".to_string()),
        ip_families: Some(vec!["IPv4".to_string()]),
        ports: Some(vec![ServicePort {
            name: Some(port_name.to_string()),
            port,
            target_port: Some(IntOrString::Int(port)),
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cars_service_is_headless() {
        let spec = cars_service_spec();
        assert_eq!(spec.cluster_ip.as_deref(), Some("None"));
        assert_eq!(spec.ip_family_policy.as_deref(), Some("SingleStack"));
        assert_eq!(spec.ip_families, Some(vec!["IPv4".to_string()]));
        assert_eq!(spec.selector.as_ref().unwrap()["app"], "cars");

        let ports = spec.ports.unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].name.as_deref(), Some("cars-tcp"));
        assert_eq!(ports[0].port, 7777);
        assert_eq!(ports[0].target_port, Some(IntOrString::Int(7777)));
        assert_eq!(ports[0].protocol.as_deref(), Some("TCP"));
    }

    #[test]
    fn test_mysql_service_targets_database_port() {
        let spec = mysql_service_spec();
        assert_eq!(spec.selector.as_ref().unwrap()["app"], "mysql");
        let port = &spec.ports.unwrap()[0];
        assert_eq!(port.name.as_deref(), Some("mysql-tcp"));
        assert_eq!(port.port, 3306);
        assert_eq!(port.target_port, Some(IntOrString::Int(3306)));
    }
}
