//! # Custom Resource Definitions
//!
//! The `Cars` custom resource: the declarative input the operator converges the cluster
//! towards, plus its status sub-resource.

mod status;

pub use status::*;

use k8s_openapi::api::core::v1::VolumeResourceRequirements;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Cars Custom Resource Definition
///
/// Declares one CARS application together with its MySQL companion. Every field is optional;
/// an unset (or empty) field means "use the default" or "skip the dependent resource".
///
/// # Example
///
/// ```yaml
/// apiVersion: infra.bsvblockchain.com/v1alpha1
/// kind: Cars
/// metadata:
///   name: cars
///   namespace: cars
/// spec:
///   image: docker.io/galtbv/cars:v1.2.0
///   storageClass: fast
///   storageResources:
///     requests:
///       storage: 20Gi
///   domain: example.com
///   clusterIssuer: letsencrypt
/// ```
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    kind = "Cars",
    group = "infra.bsvblockchain.com",
    version = "v1alpha1",
    plural = "cars",
    namespaced,
    status = "CarsStatus",
    derive = "PartialEq",
    derive = "Default",
    printcolumn = r#"{"name":"Reconciled", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Reconciled\")].status"}"#,
    printcolumn = r#"{"name":"Domain", "type":"string", "jsonPath":".spec.domain"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CarsSpec {
    /// Container image for the CARS application
    /// Defaults to `docker.io/galtbv/cars:latest`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Storage class for the MySQL data claim
    /// When unset, a new claim leaves the class empty and an existing claim keeps its class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    /// Resource requests for the MySQL data claim (e.g. `requests.storage: 20Gi`)
    /// When unset, a new claim requests 5Gi and an existing claim keeps its request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_resources: Option<VolumeResourceRequirements>,
    /// Pre-provisioned PersistentVolume to bind the MySQL data claim to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_volume: Option<String>,
    /// DNS suffix for the public ingress; the host becomes `<name>.<domain>`
    /// No ingress is created while this is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// cert-manager ClusterIssuer used to obtain a TLS certificate for the ingress
    /// Only used when `domain` is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_issuer: Option<String>,
}

impl CarsSpec {
    pub fn image(&self) -> Option<&str> {
        non_empty(self.image.as_deref())
    }

    pub fn storage_class(&self) -> Option<&str> {
        non_empty(self.storage_class.as_deref())
    }

    pub fn storage_volume(&self) -> Option<&str> {
        non_empty(self.storage_volume.as_deref())
    }

    pub fn domain(&self) -> Option<&str> {
        non_empty(self.domain.as_deref())
    }

    pub fn cluster_issuer(&self) -> Option<&str> {
        non_empty(self.cluster_issuer.as_deref())
    }
}

/// An empty string is treated exactly like an absent value
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::CustomResourceExt;

    #[test]
    fn test_spec_deserializes_camel_case() {
        let spec: CarsSpec = serde_json::from_value(serde_json::json!({
            "image": "example/cars:1",
            "storageClass": "fast",
            "storageResources": { "requests": { "storage": "20Gi" } },
            "storageVolume": "pv-0001",
            "domain": "example.com",
            "clusterIssuer": "letsencrypt"
        }))
        .unwrap();

        assert_eq!(spec.image(), Some("example/cars:1"));
        assert_eq!(spec.storage_class(), Some("fast"));
        assert_eq!(spec.storage_volume(), Some("pv-0001"));
        assert_eq!(spec.domain(), Some("example.com"));
        assert_eq!(spec.cluster_issuer(), Some("letsencrypt"));
        let requests = spec.storage_resources.unwrap().requests.unwrap();
        assert_eq!(requests["storage"].0, "20Gi");
    }

    #[test]
    fn test_empty_spec_is_valid() {
        let spec: CarsSpec = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(spec, CarsSpec::default());
        assert!(spec.domain().is_none());
    }

    #[test]
    fn test_empty_strings_are_absent() {
        let spec = CarsSpec {
            image: Some(String::new()),
            domain: Some(String::new()),
            cluster_issuer: Some(String::new()),
            ..Default::default()
        };
        assert!(spec.image().is_none());
        assert!(spec.domain().is_none());
        assert!(spec.cluster_issuer().is_none());
    }

    #[test]
    fn test_unset_fields_are_not_serialized() {
        let value = serde_json::to_value(CarsSpec {
            domain: Some("example.com".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({ "domain": "example.com" }));
    }

    #[test]
    fn test_crd_identity() {
        let crd = Cars::crd();
        assert_eq!(crd.spec.group, "infra.bsvblockchain.com");
        assert_eq!(crd.spec.names.kind, "Cars");
        assert_eq!(crd.spec.names.plural, "cars");
        assert_eq!(crd.spec.scope, "Namespaced");
        let version = &crd.spec.versions[0];
        assert_eq!(version.name, "v1alpha1");
        assert!(version.subresources.as_ref().unwrap().status.is_some());
    }
}
