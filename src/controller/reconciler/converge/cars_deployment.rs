//! Deployment `cars`: the CARS application itself.

use super::{container_resources, fetch_cars, upsert_outcome, workload_labels};
use crate::constants::{CARS_ENV_SECRET, CARS_NAME, CARS_PORT, DEFAULT_IMAGE};
use crate::controller::reconciler::batch::{Converger, StepOutcome};
use crate::controller::reconciler::ownership::{
    child_meta, ensure_app_labels, set_controller_reference,
};
use crate::controller::reconciler::types::ReconcilerError;
use crate::store::{apply_owned, create_or_update, ObjectKey, ObjectStore};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvFromSource, PodSpec, PodTemplateSpec, SecretEnvSource,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::api::ObjectMeta;

const STEP: &str = "cars-deployment";

/// Converges Deployment `cars`
#[derive(Debug, Clone, Copy, Default)]
pub struct CarsDeployment;

#[async_trait]
impl<S: ObjectStore> Converger<S> for CarsDeployment {
    fn name(&self) -> &'static str {
        STEP
    }

    async fn converge(&self, store: &S, key: &ObjectKey) -> StepOutcome {
        let cars = match fetch_cars(store, key).await {
            Ok(cars) => cars,
            Err(e) => return StepOutcome::StopError(ReconcilerError::store(STEP, e)),
        };

        let child = key.sibling(CARS_NAME);
        let dep = Deployment {
            metadata: child_meta(CARS_NAME, key),
            ..Default::default()
        };
        let result = create_or_update(store, dep, |dep: &mut Deployment| {
            set_controller_reference(dep, &cars)?;
            ensure_app_labels(&mut dep.metadata);
            apply_owned(&mut dep.spec, cars_deployment_spec(cars.spec.image()))
        })
        .await;
        upsert_outcome(STEP, &child, result)
    }
}

/// Complete Deployment spec for the CARS application
///
/// `image` overrides the default image when set.
pub fn cars_deployment_spec(image: Option<&str>) -> DeploymentSpec {
    let labels = workload_labels(CARS_NAME);
    DeploymentSpec {
        replicas: Some(1),
        selector: LabelSelector {
            match_labels: Some(labels.clone()),
            ..Default::default()
        },
        template: PodTemplateSpec {
            metadata: Some(ObjectMeta {
                labels: Some(labels),
                ..Default::default()
            }),
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: CARS_NAME.to_string(),
                    image: Some(image.unwrap_or(DEFAULT_IMAGE).to_string()),
                    image_pull_policy: Some("Always".to_string()),
                    env_from: Some(vec![EnvFromSource {
                        secret_ref: Some(SecretEnvSource {
                            name: CARS_ENV_SECRET.to_string(),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }]),
                    resources: Some(container_resources("1", "100Mi", "500Mi")),
                    ports: Some(vec![ContainerPort {
                        name: Some("cars-tcp".to_string()),
                        container_port: CARS_PORT,
                        protocol: Some("TCP".to_string()),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }],
                ..Default::default()
            }),
        },
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(spec: &DeploymentSpec) -> &Container {
        &spec.template.spec.as_ref().unwrap().containers[0]
    }

    #[test]
    fn test_default_spec() {
        let spec = cars_deployment_spec(None);
        assert_eq!(spec.replicas, Some(1));
        assert_eq!(
            spec.selector.match_labels.as_ref().unwrap()["app"],
            "cars"
        );
        assert_eq!(
            spec.template.metadata.as_ref().unwrap().labels,
            spec.selector.match_labels
        );

        let c = container(&spec);
        assert_eq!(c.name, "cars");
        assert_eq!(c.image.as_deref(), Some("docker.io/galtbv/cars:latest"));
        assert_eq!(c.image_pull_policy.as_deref(), Some("Always"));

        let port = &c.ports.as_ref().unwrap()[0];
        assert_eq!(port.container_port, 7777);
        assert_eq!(port.name.as_deref(), Some("cars-tcp"));

        let env_from = c.env_from.as_ref().unwrap();
        assert_eq!(
            env_from[0].secret_ref.as_ref().unwrap().name,
            "cars-environment"
        );
    }

    #[test]
    fn test_image_override() {
        let spec = cars_deployment_spec(Some("example/cars:1.2.0"));
        assert_eq!(container(&spec).image.as_deref(), Some("example/cars:1.2.0"));
    }

    #[test]
    fn test_no_cpu_limit() {
        let spec = cars_deployment_spec(None);
        let resources = container(&spec).resources.as_ref().unwrap();
        let limits = resources.limits.as_ref().unwrap();
        assert!(!limits.contains_key("cpu"));
        assert_eq!(limits["memory"].0, "500Mi");
        let requests = resources.requests.as_ref().unwrap();
        assert_eq!(requests["cpu"].0, "1");
        assert_eq!(requests["memory"].0, "100Mi");
    }
}
