//! # Object Store
//!
//! The get/create/replace capability the reconciler needs from the cluster, plus the shared
//! create-or-update algorithm built on top of it.
//!
//! ## Implementations
//!
//! - [`KubeStore`] - talks to the Kubernetes API server through `kube::Api`
//! - `MemoryStore` - in-process store used by the test suite (`testing` feature)
//!
//! Every write carries the `resourceVersion` of the object it was computed from, so a write
//! that races another writer fails with [`StoreError::Conflict`] instead of silently
//! overwriting. The reconciler never takes locks of its own.

mod error;
mod kubernetes;
#[cfg(any(test, feature = "testing"))]
mod memory;

pub use error::StoreError;
pub use kubernetes::KubeStore;
#[cfg(any(test, feature = "testing"))]
pub use memory::{InjectedFailure, MemoryStore, Operation, Verb};

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Namespaced, serializable, comparable Kubernetes object the store can address
pub trait StoreObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + PartialEq
    + fmt::Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> StoreObject for K where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + PartialEq
        + fmt::Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Namespace and name addressing one object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Identity of an object, if it has both a name and a namespace
    pub fn for_object<K: Resource>(obj: &K) -> Option<Self> {
        let meta = obj.meta();
        match (meta.namespace.as_deref(), meta.name.as_deref()) {
            (Some(namespace), Some(name)) if !namespace.is_empty() && !name.is_empty() => {
                Some(Self::new(namespace, name))
            }
            _ => None,
        }
    }

    /// Same namespace, different name (children live next to their owner)
    pub fn sibling(&self, name: &str) -> Self {
        Self::new(self.namespace.clone(), name)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Kind name of a store object, e.g. `Deployment`
pub fn kind_of<K: StoreObject>() -> String {
    K::kind(&()).to_string()
}

/// Object-store capability over typed, namespaced resources
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object; [`StoreError::NotFound`] when it does not exist
    async fn get<K: StoreObject>(&self, key: &ObjectKey) -> Result<K, StoreError>;

    /// Create an object; [`StoreError::Conflict`] when it already exists
    async fn create<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError>;

    /// Replace an object, conditional on its `resourceVersion`
    async fn replace<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError>;

    /// Write the status sub-resource of an object, conditional on its `resourceVersion`
    async fn update_status<K: StoreObject>(&self, obj: &K) -> Result<K, StoreError>;

    /// Fetch an object, mapping "not found" to `None`
    async fn get_opt<K: StoreObject>(&self, key: &ObjectKey) -> Result<Option<K>, StoreError> {
        match self.get::<K>(key).await {
            Ok(obj) => Ok(Some(obj)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// What [`create_or_update`] did to the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    Created,
    Updated,
    Unchanged,
}

impl OperationResult {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationResult::Created => "created",
            OperationResult::Updated => "updated",
            OperationResult::Unchanged => "unchanged",
        }
    }
}

/// Create or update an object so that `mutate` holds for it
///
/// `obj` only needs its identity (name and namespace) filled in. When the object exists,
/// `mutate` runs against the copy fetched from the store, so fields the platform assigned
/// survive unless `mutate` overwrites them. A replace is issued only when the mutated object
/// differs from what was fetched, which keeps repeated passes free of writes.
///
/// `mutate` must not change the object's name or namespace.
pub async fn create_or_update<S, K, E, F>(
    store: &S,
    obj: K,
    mutate: F,
) -> Result<OperationResult, E>
where
    S: ObjectStore + ?Sized,
    K: StoreObject,
    E: From<StoreError> + Send,
    F: FnOnce(&mut K) -> Result<(), E> + Send,
{
    let key = ObjectKey::for_object(&obj).ok_or_else(|| StoreError::MissingIdentity {
        kind: kind_of::<K>(),
    })?;

    match store.get_opt::<K>(&key).await? {
        None => {
            let mut desired = obj;
            mutate(&mut desired)?;
            ensure_same_identity(&key, &desired)?;
            store.create(&desired).await?;
            Ok(OperationResult::Created)
        }
        Some(existing) => {
            let mut desired = existing.clone();
            mutate(&mut desired)?;
            ensure_same_identity(&key, &desired)?;
            if desired == existing {
                return Ok(OperationResult::Unchanged);
            }
            store.replace(&desired).await?;
            Ok(OperationResult::Updated)
        }
    }
}

/// Install `desired` in `slot` unless the current value already carries every field of it
///
/// The API server fills in defaults the builders never set (Deployment `strategy`, Service
/// `clusterIPs`, container `terminationMessagePath`); those are kept, and a value that
/// already matches the builder output field for field is left untouched. Only suited to
/// builders whose output never drops a field it set on an earlier pass.
pub fn apply_owned<T: Serialize>(slot: &mut Option<T>, desired: T) -> Result<(), StoreError> {
    if let Some(current) = slot.as_ref() {
        if json_covers(&serde_json::to_value(current)?, &serde_json::to_value(&desired)?) {
            return Ok(());
        }
    }
    *slot = Some(desired);
    Ok(())
}

/// Whether `current` holds every field of `desired` with an equal value
///
/// Objects may carry extra keys; arrays must match element for element.
fn json_covers(current: &Value, desired: &Value) -> bool {
    match (current, desired) {
        (Value::Object(current), Value::Object(desired)) => {
            desired.iter().all(|(field, want)| match current.get(field) {
                Some(have) => json_covers(have, want),
                None => want.is_null(),
            })
        }
        (Value::Array(current), Value::Array(desired)) => {
            current.len() == desired.len()
                && current.iter().zip(desired).all(|(have, want)| json_covers(have, want))
        }
        _ => current == desired,
    }
}

fn ensure_same_identity<K: StoreObject>(before: &ObjectKey, obj: &K) -> Result<(), StoreError> {
    match ObjectKey::for_object(obj) {
        Some(after) if &after == before => Ok(()),
        Some(after) => Err(StoreError::IdentityChanged {
            before: before.clone(),
            after,
        }),
        None => Err(StoreError::MissingIdentity {
            kind: kind_of::<K>(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ConfigMap;
    use kube::api::ObjectMeta;
    use std::collections::BTreeMap;

    fn config_map(name: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("cars".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn set_data(cm: &mut ConfigMap, value: &str) -> Result<(), StoreError> {
        cm.data = Some(BTreeMap::from([("key".to_string(), value.to_string())]));
        Ok(())
    }

    #[test]
    fn test_object_key_for_object() {
        let key = ObjectKey::for_object(&config_map("settings")).unwrap();
        assert_eq!(key, ObjectKey::new("cars", "settings"));
        assert_eq!(key.to_string(), "cars/settings");
        assert_eq!(key.sibling("other"), ObjectKey::new("cars", "other"));
    }

    #[test]
    fn test_object_key_requires_namespace() {
        let cm = ConfigMap {
            metadata: ObjectMeta {
                name: Some("settings".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(ObjectKey::for_object(&cm).is_none());
    }

    #[test]
    fn test_json_covers_ignores_extra_fields() {
        let current = serde_json::json!({
            "replicas": 1,
            "progressDeadlineSeconds": 600,
            "template": { "spec": { "containers": [{ "name": "cars", "terminationMessagePath": "/dev/termination-log" }] } }
        });
        let desired = serde_json::json!({
            "replicas": 1,
            "template": { "spec": { "containers": [{ "name": "cars" }] } }
        });
        assert!(json_covers(&current, &desired));
        assert!(!json_covers(&desired, &current));
    }

    #[test]
    fn test_json_covers_detects_changed_values_and_lengths() {
        let current = serde_json::json!({ "ports": [{ "port": 7777 }] });
        assert!(!json_covers(&current, &serde_json::json!({ "ports": [{ "port": 3306 }] })));
        assert!(!json_covers(
            &current,
            &serde_json::json!({ "ports": [{ "port": 7777 }, { "port": 3306 }] })
        ));
        assert!(!json_covers(&current, &serde_json::json!({ "selector": { "app": "cars" } })));
    }

    #[test]
    fn test_apply_owned_keeps_defaulted_value() {
        let mut data = BTreeMap::from([
            ("key".to_string(), "a".to_string()),
            ("defaulted".to_string(), "x".to_string()),
        ]);
        let mut slot = Some(data.clone());
        apply_owned(&mut slot, BTreeMap::from([("key".to_string(), "a".to_string())])).unwrap();
        assert_eq!(slot.as_ref(), Some(&data));

        apply_owned(&mut slot, BTreeMap::from([("key".to_string(), "b".to_string())])).unwrap();
        data = BTreeMap::from([("key".to_string(), "b".to_string())]);
        assert_eq!(slot, Some(data));
    }

    #[test]
    fn test_apply_owned_fills_empty_slot() {
        let mut slot: Option<BTreeMap<String, String>> = None;
        apply_owned(&mut slot, BTreeMap::from([("key".to_string(), "a".to_string())])).unwrap();
        assert_eq!(slot.unwrap()["key"], "a");
    }

    #[tokio::test]
    async fn test_create_or_update_creates_then_noops() {
        let store = MemoryStore::new();

        let first = create_or_update(&store, config_map("settings"), |cm| set_data(cm, "a"))
            .await
            .unwrap();
        assert_eq!(first, OperationResult::Created);

        let second = create_or_update(&store, config_map("settings"), |cm| set_data(cm, "a"))
            .await
            .unwrap();
        assert_eq!(second, OperationResult::Unchanged);
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_create_or_update_updates_on_change() {
        let store = MemoryStore::new();
        create_or_update(&store, config_map("settings"), |cm| set_data(cm, "a"))
            .await
            .unwrap();

        let result = create_or_update(&store, config_map("settings"), |cm| set_data(cm, "b"))
            .await
            .unwrap();
        assert_eq!(result, OperationResult::Updated);

        let stored: ConfigMap = store.get(&ObjectKey::new("cars", "settings")).await.unwrap();
        assert_eq!(stored.data.unwrap()["key"], "b");
    }

    #[tokio::test]
    async fn test_create_or_update_rejects_rename() {
        let store = MemoryStore::new();
        let err = create_or_update(&store, config_map("settings"), |cm: &mut ConfigMap| {
            cm.metadata.name = Some("renamed".to_string());
            Ok::<(), StoreError>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::IdentityChanged { .. }));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_create_or_update_requires_identity() {
        let store = MemoryStore::new();
        let err = create_or_update(&store, ConfigMap::default(), |cm| set_data(cm, "a"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingIdentity { .. }));
    }
}
