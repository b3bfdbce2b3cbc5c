//! # Kubernetes Store
//!
//! [`ObjectStore`] backed by the Kubernetes API server.

use super::{kind_of, ObjectKey, ObjectStore, StoreError, StoreObject};
use async_trait::async_trait;
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client};
use tracing::debug;

/// Object store talking to the API server through `kube::Api`
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    field_manager: String,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore")
            .field("field_manager", &self.field_manager)
            .finish_non_exhaustive()
    }
}

impl KubeStore {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }

    fn api<K: StoreObject>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            field_manager: Some(self.field_manager.clone()),
            ..PostParams::default()
        }
    }

    fn identity<K: StoreObject>(obj: &K) -> Result<ObjectKey, StoreError> {
        ObjectKey::for_object(obj).ok_or_else(|| StoreError::MissingIdentity {
            kind: kind_of::<K>(),
        })
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get<K: StoreObject>(&self, key: &ObjectKey) -> Result<K, StoreError> {
        self.api::<K>(&key.namespace)
            .get(&key.name)
            .await
            .map_err(|e| StoreError::from_kube(&kind_of::<K>(), key, e))
    }

    async fn create<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError> {
        let key = Self::identity(obj)?;
        debug!(kind = %kind_of::<K>(), resource = %key, "store.create");
        self.api::<K>(&key.namespace)
            .create(&self.post_params(), obj)
            .await
            .map_err(|e| StoreError::from_kube(&kind_of::<K>(), &key, e))
    }

    async fn replace<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError> {
        let key = Self::identity(obj)?;
        debug!(kind = %kind_of::<K>(), resource = %key, "store.replace");
        self.api::<K>(&key.namespace)
            .replace(&key.name, &self.post_params(), obj)
            .await
            .map_err(|e| StoreError::from_kube(&kind_of::<K>(), &key, e))
    }

    async fn update_status<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError> {
        let key = Self::identity(obj)?;
        debug!(kind = %kind_of::<K>(), resource = %key, "store.update_status");

        // Carrying resourceVersion turns the merge patch into a conditional write
        let status = serde_json::to_value(obj)?
            .get("status")
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        let patch = serde_json::json!({
            "metadata": { "resourceVersion": obj.meta().resource_version },
            "status": status,
        });

        self.api::<K>(&key.namespace)
            .patch_status(
                &key.name,
                &PatchParams::apply(&self.field_manager),
                &Patch::Merge(patch),
            )
            .await
            .map_err(|e| StoreError::from_kube(&kind_of::<K>(), &key, e))
    }
}
