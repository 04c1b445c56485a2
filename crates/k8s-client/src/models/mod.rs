//! Kubernetes API models
//!
//! These models match the JSON representation served by the API server.
//! Each resource kind implements [`Resource`], the schema descriptor the
//! generic executors and the watch adapter are instantiated with.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Implements [`Resource`] for a struct with `type_meta` and `metadata` fields,
/// plus a `new` constructor that pre-fills the envelope.
macro_rules! resource {
    ($ty:ident, $kind:literal, $api_version:literal, $plural:literal, namespaced) => {
        resource!(@impl $ty, $kind, $api_version, $plural, true);

        impl $ty {
            #[doc = concat!("A new `", $kind, "` with kind, API version, namespace and name set")]
            pub fn new(namespace: &str, name: &str) -> Self {
                Self {
                    type_meta: $crate::models::TypeMeta::new($kind, $api_version),
                    metadata: $crate::models::ObjectMeta::new(namespace, name),
                    ..Default::default()
                }
            }
        }
    };
    ($ty:ident, $kind:literal, $api_version:literal, $plural:literal, cluster) => {
        resource!(@impl $ty, $kind, $api_version, $plural, false);

        impl $ty {
            #[doc = concat!("A new `", $kind, "` with kind, API version and name set")]
            pub fn new(name: &str) -> Self {
                Self {
                    type_meta: $crate::models::TypeMeta::new($kind, $api_version),
                    metadata: $crate::models::ObjectMeta::new("", name),
                    ..Default::default()
                }
            }
        }
    };
    (@impl $ty:ident, $kind:literal, $api_version:literal, $plural:literal, $namespaced:literal) => {
        impl $crate::models::Resource for $ty {
            const KIND: &'static str = $kind;
            const API_VERSION: &'static str = $api_version;
            const PLURAL: &'static str = $plural;
            const NAMESPACED: bool = $namespaced;

            fn type_meta(&self) -> &$crate::models::TypeMeta {
                &self.type_meta
            }

            fn type_meta_mut(&mut self) -> &mut $crate::models::TypeMeta {
                &mut self.type_meta
            }

            fn metadata(&self) -> &$crate::models::ObjectMeta {
                &self.metadata
            }

            fn metadata_mut(&mut self) -> &mut $crate::models::ObjectMeta {
                &mut self.metadata
            }
        }
    };
}

mod apps;
mod autoscaling;
mod batch;
mod core;
mod meta;
mod networking;

pub use apps::*;
pub use autoscaling::*;
pub use batch::*;
pub use self::core::*;
pub use meta::*;
pub use networking::*;

/// Schema descriptor for a resource kind.
///
/// `API_VERSION` is `v1` for the core group and `group/version` otherwise;
/// the path builder derives `/api/...` vs `/apis/...` from it.
pub trait Resource: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    /// Kind tag, e.g. `Pod`
    const KIND: &'static str;
    /// API version, e.g. `v1` or `apps/v1`
    const API_VERSION: &'static str;
    /// Lowercase plural used in REST paths, e.g. `pods`
    const PLURAL: &'static str;
    /// Whether objects live inside a namespace
    const NAMESPACED: bool;

    fn type_meta(&self) -> &TypeMeta;
    fn type_meta_mut(&mut self) -> &mut TypeMeta;
    fn metadata(&self) -> &ObjectMeta;
    fn metadata_mut(&mut self) -> &mut ObjectMeta;

    /// Stamp kind, API version and (for namespaced kinds) namespace before a
    /// mutating call. The envelope is never taken from the caller as-is.
    fn stamp(&mut self, namespace: &str) {
        let type_meta = self.type_meta_mut();
        type_meta.kind = Self::KIND.to_string();
        type_meta.api_version = Self::API_VERSION.to_string();
        if Self::NAMESPACED {
            self.metadata_mut().namespace = namespace.to_string();
        }
    }
}

/// A list response (`PodList`, `NodeList`, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectList<T> {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    #[serde(default)]
    pub metadata: ListMeta,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> ObjectList<T> {
    /// Number of items in this list
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the list has no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over the items
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> IntoIterator for ObjectList<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_fill_envelope() {
        let pod = Pod::new("default", "web-0");
        assert_eq!(pod.type_meta.kind, "Pod");
        assert_eq!(pod.type_meta.api_version, "v1");
        assert_eq!(pod.metadata.namespace, "default");

        let node = Node::new("worker-1");
        assert_eq!(node.type_meta.kind, "Node");
        assert!(node.metadata.namespace.is_empty());

        let deployment = Deployment::new("prod", "api");
        assert_eq!(deployment.type_meta.api_version, "apps/v1");
    }

    #[test]
    fn test_stamp_overrides_caller_envelope() {
        let mut pod = Pod::default();
        pod.type_meta.kind = "Deployment".to_string();
        pod.metadata.namespace = "elsewhere".to_string();
        pod.stamp("default");
        assert_eq!(pod.type_meta.kind, "Pod");
        assert_eq!(pod.type_meta.api_version, "v1");
        assert_eq!(pod.metadata.namespace, "default");
    }

    #[test]
    fn test_stamp_leaves_cluster_scoped_namespace_alone() {
        let mut ns = Namespace::new("team-a");
        ns.stamp("ignored");
        assert!(ns.metadata.namespace.is_empty());
        assert_eq!(ns.type_meta.kind, "Namespace");
    }

    #[test]
    fn test_object_list_decodes() {
        let list: ObjectList<ConfigMap> = serde_json::from_str(
            r#"{"kind":"ConfigMapList","apiVersion":"v1","metadata":{"resourceVersion":"7"},
                "items":[{"metadata":{"name":"a","namespace":"default"},"data":{"k":"v"}}]}"#,
        )
        .unwrap();
        assert_eq!(list.type_meta.kind, "ConfigMapList");
        assert_eq!(list.metadata.resource_version, "7");
        assert_eq!(list.len(), 1);
        assert_eq!(list.items[0].data.get("k").map(String::as_str), Some("v"));
    }
}
