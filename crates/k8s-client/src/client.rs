//! Kubernetes API client
//!
//! [`KubeClient`] owns the transport and hands out typed [`Api`] executors,
//! one accessor per supported resource kind.

use crate::api::Api;
use crate::common::HttpClient;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::executor_trait::HttpExecutor;
use crate::models::*;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Build information reported by `/version`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerVersion {
    pub major: String,
    pub minor: String,
    pub git_version: String,
    pub platform: String,
}

/// Kubernetes API client
#[derive(Clone)]
pub struct KubeClient {
    executor: Arc<dyn HttpExecutor>,
}

impl fmt::Debug for KubeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeClient")
            .field("base_url", &self.executor.base_url())
            .finish()
    }
}

impl KubeClient {
    /// Create a client talking to `config.server` over HTTP
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        Ok(Self::with_executor(Arc::new(HttpClient::new(&config)?)))
    }

    /// Create a client from `K8S_*` environment variables
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Create a client over any executor, e.g. a mock
    pub fn with_executor(executor: Arc<dyn HttpExecutor>) -> Self {
        Self { executor }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.executor.base_url()
    }

    /// Check connectivity and credentials by fetching the server version.
    pub async fn server_version(&self) -> Result<ServerVersion, ClientError> {
        debug!("Fetching server version");
        let response = self
            .executor
            .execute(Method::GET, "/version", None, &[StatusCode::OK])
            .await?;
        serde_json::from_slice(&response.body).map_err(|e| ClientError::decode("ServerVersion", e))
    }

    /// Executors for any resource kind
    pub fn api<K: Resource>(&self) -> Api<K> {
        Api::new(Arc::clone(&self.executor))
    }

    /// `Pod` executors
    pub fn pods(&self) -> Api<Pod> {
        self.api()
    }

    /// `Node` executors
    pub fn nodes(&self) -> Api<Node> {
        self.api()
    }

    /// `Namespace` executors
    pub fn namespaces(&self) -> Api<Namespace> {
        self.api()
    }

    /// `ConfigMap` executors
    pub fn config_maps(&self) -> Api<ConfigMap> {
        self.api()
    }

    /// `Secret` executors
    pub fn secrets(&self) -> Api<Secret> {
        self.api()
    }

    /// `Service` executors
    pub fn services(&self) -> Api<Service> {
        self.api()
    }

    /// `ServiceAccount` executors
    pub fn service_accounts(&self) -> Api<ServiceAccount> {
        self.api()
    }

    /// `Endpoints` executors
    pub fn endpoints(&self) -> Api<Endpoints> {
        self.api()
    }

    /// `Event` executors
    pub fn events(&self) -> Api<Event> {
        self.api()
    }

    /// `Deployment` executors
    pub fn deployments(&self) -> Api<Deployment> {
        self.api()
    }

    /// `ReplicaSet` executors
    pub fn replica_sets(&self) -> Api<ReplicaSet> {
        self.api()
    }

    /// `DaemonSet` executors
    pub fn daemon_sets(&self) -> Api<DaemonSet> {
        self.api()
    }

    /// `Job` executors
    pub fn jobs(&self) -> Api<Job> {
        self.api()
    }

    /// `Ingress` executors
    pub fn ingresses(&self) -> Api<Ingress> {
        self.api()
    }

    /// `HorizontalPodAutoscaler` executors
    pub fn horizontal_pod_autoscalers(&self) -> Api<HorizontalPodAutoscaler> {
        self.api()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;

    #[tokio::test]
    async fn test_accessors_share_executor() {
        let mock = MockExecutor::new();
        mock.respond(
            Method::GET,
            "/apis/batch/v1/namespaces/ops/jobs/backup",
            StatusCode::OK,
            r#"{"kind":"Job","apiVersion":"batch/v1","metadata":{"name":"backup","namespace":"ops"}}"#,
        );
        mock.respond(
            Method::GET,
            "/api/v1/namespaces/ops/secrets/creds",
            StatusCode::OK,
            r#"{"kind":"Secret","apiVersion":"v1","metadata":{"name":"creds","namespace":"ops"},"data":{"token":"c2VjcmV0"}}"#,
        );
        let client = KubeClient::with_executor(Arc::new(mock.clone()));

        let job = client.jobs().get("ops", "backup").await.unwrap();
        assert_eq!(job.metadata.name, "backup");
        let secret = client.secrets().get("ops", "creds").await.unwrap();
        assert_eq!(secret.data.get("token").map(Vec::as_slice), Some(&b"secret"[..]));
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_server_version() {
        let mock = MockExecutor::new();
        mock.respond(
            Method::GET,
            "/version",
            StatusCode::OK,
            r#"{"major":"1","minor":"30","gitVersion":"v1.30.2","platform":"linux/amd64"}"#,
        );
        let client = KubeClient::with_executor(Arc::new(mock));
        assert_eq!(client.server_version().await.unwrap().git_version, "v1.30.2");
    }
}
