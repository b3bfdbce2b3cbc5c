//! # Watch Loop
//!
//! Drives the kube-runtime controller for Cars objects.
//!
//! A pass is triggered by any change to a Cars object or to one of the children it owns.
//! Child watches are narrowed to objects carrying the operator's discriminator label.

use crate::controller::reconciler::ownership::app_label_selector;
use crate::controller::reconciler::{reconcile, Context};
use crate::controller::server::ServerState;
use crate::crd::Cars;
use crate::runtime::error_policy::error_policy;
use crate::store::KubeStore;
use anyhow::Result;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::{Api, Client};
use kube_runtime::{controller, watcher, Controller};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Run the controller until a shutdown signal arrives
pub async fn run_watch_loop(
    client: Client,
    context: Arc<Context<KubeStore>>,
    server_state: Arc<ServerState>,
) -> Result<()> {
    let (cars_api, deployments, services, ingresses, claims) =
        match context.config.watch_namespace.as_deref() {
            Some(ns) => {
                info!("Watching Cars resources in namespace {}", ns);
                (
                    Api::<Cars>::namespaced(client.clone(), ns),
                    Api::<Deployment>::namespaced(client.clone(), ns),
                    Api::<Service>::namespaced(client.clone(), ns),
                    Api::<Ingress>::namespaced(client.clone(), ns),
                    Api::<PersistentVolumeClaim>::namespaced(client, ns),
                )
            }
            None => {
                info!("Watching Cars resources in all namespaces");
                (
                    Api::<Cars>::all(client.clone()),
                    Api::<Deployment>::all(client.clone()),
                    Api::<Service>::all(client.clone()),
                    Api::<Ingress>::all(client.clone()),
                    Api::<PersistentVolumeClaim>::all(client),
                )
            }
        };

    let selector = app_label_selector();
    let owned = || watcher::Config::default().labels(&selector);

    info!("Starting Cars controller watch loop");
    Controller::new(cars_api, watcher::Config::default())
        .owns(deployments, owned())
        .owns(services, owned())
        .owns(ingresses, owned())
        .owns(claims, owned())
        .shutdown_on_signal()
        .run(reconcile::<KubeStore>, error_policy::<KubeStore>, context)
        .for_each(|result| async move {
            match result {
                Ok((obj, _action)) => debug!("Reconciled {}", obj),
                Err(controller::Error::ObjectNotFound(obj)) => {
                    debug!("Object is gone: {}", obj);
                }
                Err(controller::Error::ReconcilerFailed(e, obj)) => {
                    // Already logged and counted by the error policy
                    debug!("Reconcile of {} failed: {}", obj, e);
                }
                Err(e) => warn!("Controller stream error: {}", e),
            }
        })
        .await;

    server_state.set_ready(false);
    info!("Controller watch loop stopped");
    Ok(())
}
