//! Ingress `cars`: public entry point, created only once a domain is configured.
//!
//! Without a domain the step returns [`StepOutcome::StopOk`], which also skips every step
//! after it in the batch. With a `clusterIssuer`, cert-manager is asked for a certificate
//! through the issuer annotation and the TLS block names the `cars-tls` secret.

use super::{fetch_cars, upsert_outcome};
use crate::constants::{
    CARS_NAME, CARS_PORT, CARS_TLS_SECRET, CLUSTER_ISSUER_ANNOTATION, INGRESS_CLASS,
};
use crate::controller::reconciler::batch::{Converger, StepOutcome};
use crate::controller::reconciler::ownership::{
    child_meta, ensure_app_labels, set_controller_reference,
};
use crate::controller::reconciler::types::ReconcilerError;
use crate::store::{create_or_update, ObjectKey, ObjectStore, StoreError};
use async_trait::async_trait;
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use kube::api::ObjectMeta;
use tracing::debug;

const STEP: &str = "cars-ingress";

/// Converges Ingress `cars`
#[derive(Debug, Clone, Copy, Default)]
pub struct CarsIngress;

#[async_trait]
impl<S: ObjectStore> Converger<S> for CarsIngress {
    fn name(&self) -> &'static str {
        STEP
    }

    async fn converge(&self, store: &S, key: &ObjectKey) -> StepOutcome {
        let cars = match fetch_cars(store, key).await {
            Ok(cars) => cars,
            Err(e) => return StepOutcome::StopError(ReconcilerError::store(STEP, e)),
        };

        let Some(domain) = cars.spec.domain() else {
            debug!(resource = %key, "no domain configured, not creating an ingress");
            return StepOutcome::StopOk;
        };
        let host = cars_host(&key.name, domain);
        let issuer = cars.spec.cluster_issuer();

        let child = key.sibling(CARS_NAME);
        let ingress = Ingress {
            metadata: child_meta(CARS_NAME, key),
            ..Default::default()
        };
        let result = create_or_update(store, ingress, |ingress: &mut Ingress| {
            set_controller_reference(ingress, &cars)?;
            ensure_app_labels(&mut ingress.metadata);
            set_issuer_annotation(&mut ingress.metadata, issuer);
            ingress.spec = Some(cars_ingress_spec(&host, issuer.is_some()));
            Ok::<(), StoreError>(())
        })
        .await;
        upsert_outcome(STEP, &child, result)
    }
}

/// Public host of a Cars object: `<name>.<domain>`
pub fn cars_host(name: &str, domain: &str) -> String {
    format!("{name}.{domain}")
}

/// Ingress spec routing `host` to Service `cars`, with TLS when `tls` is set
pub fn cars_ingress_spec(host: &str, tls: bool) -> IngressSpec {
    IngressSpec {
        ingress_class_name: Some(INGRESS_CLASS.to_string()),
        tls: tls.then(|| {
            vec![IngressTLS {
                hosts: Some(vec![host.to_string()]),
                secret_name: Some(CARS_TLS_SECRET.to_string()),
            }]
        }),
        rules: Some(vec![IngressRule {
            host: Some(host.to_string()),
            http: Some(HTTPIngressRuleValue {
                paths: vec![HTTPIngressPath {
                    path_type: "ImplementationSpecific".to_string(),
                    backend: IngressBackend {
                        service: Some(IngressServiceBackend {
                            name: CARS_NAME.to_string(),
                            port: Some(ServiceBackendPort {
                                number: Some(CARS_PORT),
                                ..Default::default()
                            }),
                        }),
                        ..Default::default()
                    },
                    ..Default::default()
                }],
            }),
        }]),
        ..Default::default()
    }
}

/// Set or clear the cert-manager issuer annotation, leaving other annotations alone
fn set_issuer_annotation(meta: &mut ObjectMeta, issuer: Option<&str>) {
    match issuer {
        Some(issuer) => {
            meta.annotations
                .get_or_insert_with(Default::default)
                .insert(CLUSTER_ISSUER_ANNOTATION.to_string(), issuer.to_string());
        }
        None => {
            if let Some(annotations) = meta.annotations.as_mut() {
                annotations.remove(CLUSTER_ISSUER_ANNOTATION);
            }
        }
    }
}
