//! Deployment `mysql`: the database companion, backed by claim `mysql-data`.

use super::{container_resources, fetch_cars, upsert_outcome, workload_labels};
use crate::constants::{
    MYSQL_DATA_MOUNT_PATH, MYSQL_DATA_NAME, MYSQL_ENV_SECRET, MYSQL_IMAGE, MYSQL_NAME, MYSQL_PORT,
};
use crate::controller::reconciler::batch::{Converger, StepOutcome};
use crate::controller::reconciler::ownership::{
    child_meta, ensure_app_labels, set_controller_reference,
};
use crate::controller::reconciler::types::ReconcilerError;
use crate::store::{apply_owned, create_or_update, ObjectKey, ObjectStore};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvFromSource, ExecAction, PersistentVolumeClaimVolumeSource,
    PodSpec, PodTemplateSpec, Probe, SecretEnvSource, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::api::ObjectMeta;

const STEP: &str = "mysql-deployment";

/// Converges Deployment `mysql`
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDeployment;

#[async_trait]
impl<S: ObjectStore> Converger<S> for MysqlDeployment {
    fn name(&self) -> &'static str {
        STEP
    }

    async fn converge(&self, store: &S, key: &ObjectKey) -> StepOutcome {
        let cars = match fetch_cars(store, key).await {
            Ok(cars) => cars,
            Err(e) => return StepOutcome::StopError(ReconcilerError::store(STEP, e)),
        };

        let child = key.sibling(MYSQL_NAME);
        let dep = Deployment {
            metadata: child_meta(MYSQL_NAME, key),
            ..Default::default()
        };
        let result = create_or_update(store, dep, |dep: &mut Deployment| {
            set_controller_reference(dep, &cars)?;
            ensure_app_labels(&mut dep.metadata);
            apply_owned(&mut dep.spec, mysql_deployment_spec())
        })
        .await;
        upsert_outcome(STEP, &child, result)
    }
}

/// Complete Deployment spec for MySQL
pub fn mysql_deployment_spec() -> DeploymentSpec {
    let labels = workload_labels(MYSQL_NAME);
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
                    name: MYSQL_NAME.to_string(),
                    image: Some(MYSQL_IMAGE.to_string()),
                    image_pull_policy: Some("Always".to_string()),
                    env_from: Some(vec![EnvFromSource {
                        secret_ref: Some(SecretEnvSource {
                            name: MYSQL_ENV_SECRET.to_string(),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }]),
                    resources: Some(container_resources("100m", "100Mi", "500Mi")),
                    liveness_probe: Some(Probe {
                        exec: Some(ExecAction {
                            command: Some(
                                ["mysqladmin", "ping", "-h", "127.0.0.1"]
                                    .map(String::from)
                                    .to_vec(),
                            ),
                        }),
                        ..Default::default()
                    }),
                    ports: Some(vec![ContainerPort {
                        name: Some("mysql-tcp".to_string()),
                        container_port: MYSQL_PORT,
                        protocol: Some("TCP".to_string()),
                        ..Default::default()
                    }]),
                    volume_mounts: Some(vec![VolumeMount {
                        name: MYSQL_DATA_NAME.to_string(),
                        mount_path: MYSQL_DATA_MOUNT_PATH.to_string(),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }],
                volumes: Some(vec![Volume {
                    name: MYSQL_DATA_NAME.to_string(),
                    persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                        claim_name: MYSQL_DATA_NAME.to_string(),
                        ..Default::default()
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
        },
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_spec() {
        let spec = mysql_deployment_spec();
        assert_eq!(spec.replicas, Some(1));
        assert_eq!(
            spec.selector.match_labels.as_ref().unwrap()["deployment"],
            "mysql"
        );

        let pod = spec.template.spec.as_ref().unwrap();
        let c = &pod.containers[0];
        assert_eq!(c.image.as_deref(), Some("mysql:8.0"));
        assert_eq!(c.ports.as_ref().unwrap()[0].container_port, 3306);
        assert_eq!(
            c.env_from.as_ref().unwrap()[0].secret_ref.as_ref().unwrap().name,
            "mysql-environment"
        );

        let command = c
            .liveness_probe
            .as_ref()
            .and_then(|p| p.exec.as_ref())
            .and_then(|e| e.command.clone())
            .unwrap();
        assert_eq!(command, vec!["mysqladmin", "ping", "-h", "127.0.0.1"]);
    }

    #[test]
    fn test_data_volume_is_bound_to_claim() {
        let spec = mysql_deployment_spec();
        let pod = spec.template.spec.unwrap();

        let mount = &pod.containers[0].volume_mounts.as_ref().unwrap()[0];
        assert_eq!(mount.name, "mysql-data");
        assert_eq!(mount.mount_path, "/var/lib/mysql");

        let volume = &pod.volumes.unwrap()[0];
        assert_eq!(volume.name, mount.name);
        assert_eq!(
            volume.persistent_volume_claim.as_ref().unwrap().claim_name,
            "mysql-data"
        );
    }
}
