//! REST path construction
//!
//! Core-group kinds (`v1`) live under `/api/v1`, every other group under
//! `/apis/{group}/{version}`. Namespaced kinds insert `/namespaces/{ns}`
//! when a namespace is given; an empty namespace addresses all namespaces.

use crate::models::Resource;

/// `/api/v1` or `/apis/{group}/{version}`
pub fn api_prefix(api_version: &str) -> String {
    if api_version.contains('/') {
        format!("/apis/{}", api_version)
    } else {
        format!("/api/{}", api_version)
    }
}

/// REST path for a collection (`name` is None) or a single object
pub fn build_path(api_version: &str, plural: &str, namespaced: bool, namespace: &str, name: Option<&str>) -> String {
    let mut path = api_prefix(api_version);
    if namespaced && !namespace.is_empty() {
        path.push_str("/namespaces/");
        path.push_str(&urlencoding::encode(namespace));
    }
    path.push('/');
    path.push_str(plural);
    if let Some(name) = name {
        path.push('/');
        path.push_str(&urlencoding::encode(name));
    }
    path
}

/// Collection (`name == None`) or item path for `K`
pub fn resource_path<K: Resource>(namespace: &str, name: Option<&str>) -> String {
    build_path(K::API_VERSION, K::PLURAL, K::NAMESPACED, namespace, name)
}

/// Append a query string, if any
pub fn with_query(path: String, query: &str) -> String {
    if query.is_empty() { path } else { format!("{}?{}", path, query) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Deployment, Ingress, Namespace, Node, Pod};

    #[test]
    fn test_core_group_paths() {
        assert_eq!(resource_path::<Pod>("default", None), "/api/v1/namespaces/default/pods");
        assert_eq!(
            resource_path::<Pod>("default", Some("web-0")),
            "/api/v1/namespaces/default/pods/web-0"
        );
        assert_eq!(resource_path::<Pod>("", None), "/api/v1/pods");
    }

    #[test]
    fn test_named_group_paths() {
        assert_eq!(
            resource_path::<Deployment>("prod", Some("api")),
            "/apis/apps/v1/namespaces/prod/deployments/api"
        );
        assert_eq!(
            resource_path::<Ingress>("", None),
            "/apis/networking.k8s.io/v1/ingresses"
        );
    }

    #[test]
    fn test_cluster_scoped_ignore_namespace() {
        assert_eq!(resource_path::<Node>("default", Some("worker-1")), "/api/v1/nodes/worker-1");
        assert_eq!(resource_path::<Namespace>("", Some("team-a")), "/api/v1/namespaces/team-a");
    }

    #[test]
    fn test_with_query() {
        assert_eq!(with_query("/api/v1/pods".to_string(), ""), "/api/v1/pods");
        assert_eq!(with_query("/api/v1/pods".to_string(), "watch=true"), "/api/v1/pods?watch=true");
    }
}
