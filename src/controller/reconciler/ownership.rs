//! # Ownership
//!
//! Identity, discriminator label and controller owner reference shared by every child object.
//!
//! Children point at their Cars owner by uid; the garbage collector deletes them when the
//! owner goes away. The operator itself never deletes anything.

use crate::constants::{CARS_LABEL, CARS_LABEL_VALUE};
use crate::crd::Cars;
use crate::store::{ObjectKey, StoreError};
use kube::api::ObjectMeta;
use kube::Resource;
use std::collections::BTreeMap;

/// Discriminator labels placed on every object this operator owns
pub fn app_labels() -> BTreeMap<String, String> {
    BTreeMap::from([(CARS_LABEL.to_string(), CARS_LABEL_VALUE.to_string())])
}

/// Label selector string matching every object this operator owns
pub fn app_label_selector() -> String {
    format!("{CARS_LABEL}={CARS_LABEL_VALUE}")
}

/// Metadata for a new child object next to its owner
pub fn child_meta(name: &str, owner: &ObjectKey) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(owner.namespace.clone()),
        labels: Some(app_labels()),
        ..Default::default()
    }
}

/// Add the discriminator label, keeping labels set by anyone else
pub fn ensure_app_labels(meta: &mut ObjectMeta) {
    let labels = meta.labels.get_or_insert_with(BTreeMap::new);
    for (key, value) in app_labels() {
        labels.insert(key, value);
    }
}

/// Make `owner` the controller of `child`
///
/// Idempotent for the same owner. Refuses to steal a child that another object controls.
pub fn set_controller_reference<K>(child: &mut K, owner: &Cars) -> Result<(), StoreError>
where
    K: Resource<DynamicType = ()>,
{
    let kind = K::kind(&()).to_string();
    let meta = child.meta_mut();
    let child_key = ObjectKey::new(
        meta.namespace.clone().unwrap_or_default(),
        meta.name.clone().unwrap_or_default(),
    );
    let owner_key = ObjectKey::new(
        owner.metadata.namespace.clone().unwrap_or_default(),
        owner.metadata.name.clone().unwrap_or_default(),
    );

    let reference = owner
        .controller_owner_ref(&())
        .ok_or_else(|| StoreError::OwnerWithoutUid {
            kind: Cars::kind(&()).to_string(),
            key: owner_key,
        })?;

    let references = meta.owner_references.get_or_insert_with(Vec::new);
    if let Some(existing) = references
        .iter()
        .find(|r| r.controller == Some(true) && r.uid != reference.uid)
    {
        return Err(StoreError::AlreadyOwned {
            kind,
            key: child_key,
            owner_kind: existing.kind.clone(),
            owner_name: existing.name.clone(),
        });
    }

    match references.iter_mut().find(|r| r.uid == reference.uid) {
        Some(existing) => *existing = reference,
        None => references.push(reference),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::CarsSpec;
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

    fn cars(uid: Option<&str>) -> Cars {
        let mut cars = Cars::new("cars", CarsSpec::default());
        cars.metadata.namespace = Some("cars".to_string());
        cars.metadata.uid = uid.map(str::to_string);
        cars
    }

    fn deployment() -> Deployment {
        Deployment {
            metadata: child_meta("cars", &ObjectKey::new("cars", "cars")),
            ..Default::default()
        }
    }

    #[test]
    fn test_child_meta_carries_label_and_namespace() {
        let meta = child_meta("mysql", &ObjectKey::new("cars", "cars"));
        assert_eq!(meta.name.as_deref(), Some("mysql"));
        assert_eq!(meta.namespace.as_deref(), Some("cars"));
        assert_eq!(
            meta.labels.unwrap()["infra.bsvblockchain.com/cars"],
            "true"
        );
    }

    #[test]
    fn test_ensure_app_labels_keeps_foreign_labels() {
        let mut meta = ObjectMeta {
            labels: Some(BTreeMap::from([("team".to_string(), "infra".to_string())])),
            ..Default::default()
        };
        ensure_app_labels(&mut meta);
        let labels = meta.labels.unwrap();
        assert_eq!(labels["team"], "infra");
        assert_eq!(labels["infra.bsvblockchain.com/cars"], "true");
    }

    #[test]
    fn test_set_controller_reference_is_idempotent() {
        let owner = cars(Some("uid-1"));
        let mut dep = deployment();
        set_controller_reference(&mut dep, &owner).unwrap();
        let first = dep.clone();
        set_controller_reference(&mut dep, &owner).unwrap();
        assert_eq!(dep, first);

        let references = dep.metadata.owner_references.unwrap();
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].kind, "Cars");
        assert_eq!(references[0].api_version, "infra.bsvblockchain.com/v1alpha1");
        assert_eq!(references[0].uid, "uid-1");
        assert_eq!(references[0].controller, Some(true));
    }

    #[test]
    fn test_set_controller_reference_requires_uid() {
        let mut dep = deployment();
        let err = set_controller_reference(&mut dep, &cars(None)).unwrap_err();
        assert!(matches!(err, StoreError::OwnerWithoutUid { .. }));
    }

    #[test]
    fn test_set_controller_reference_refuses_foreign_controller() {
        let mut dep = deployment();
        dep.metadata.owner_references = Some(vec![OwnerReference {
            api_version: "apps/v1".to_string(),
            kind: "ReplicaSet".to_string(),
            name: "someone-else".to_string(),
            uid: "uid-other".to_string(),
            controller: Some(true),
            block_owner_deletion: None,
        }]);
        let err = set_controller_reference(&mut dep, &cars(Some("uid-1"))).unwrap_err();
        match err {
            StoreError::AlreadyOwned {
                kind, owner_name, ..
            } => {
                assert_eq!(kind, "Deployment");
                assert_eq!(owner_name, "someone-else");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
