//! List-then-watch loop.
//!
//! Each session lists the kind once (unless a resource version is already
//! known), then watches from that version. Every event advances the stored
//! version so a dropped stream resumes where it left off. An expired version
//! (HTTP 410, or an ERROR event carrying code 410) forces a fresh list.

use crate::backoff::FibonacciBackoff;
use crate::error::WatcherError;
use k8s_client::{
    Api, ClientError, ErrorKind, FieldSelector, KubeClient, LabelSelector, ListOptions, Resource, WatchEvent,
    WatchEventType, WatchOptions,
};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const LIST_PAGE_SIZE: u32 = 500;
const WATCH_TIMEOUT_SECS: u32 = 300;
const EVENT_BUFFER: usize = 64;
const BACKOFF_MIN_SECS: u64 = 1;
const BACKOFF_MAX_SECS: u64 = 30;

/// Kinds the watcher can follow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Pod,
    Node,
    Namespace,
    ConfigMap,
    Secret,
    Service,
    ServiceAccount,
    Endpoints,
    Event,
    Deployment,
    ReplicaSet,
    DaemonSet,
    Job,
    Ingress,
    HorizontalPodAutoscaler,
}

impl FromStr for ResourceKind {
    type Err = WatcherError;

    /// Accepts the kind name or its plural, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_ascii_lowercase().as_str() {
            "pod" | "pods" => ResourceKind::Pod,
            "node" | "nodes" => ResourceKind::Node,
            "namespace" | "namespaces" => ResourceKind::Namespace,
            "configmap" | "configmaps" => ResourceKind::ConfigMap,
            "secret" | "secrets" => ResourceKind::Secret,
            "service" | "services" => ResourceKind::Service,
            "serviceaccount" | "serviceaccounts" => ResourceKind::ServiceAccount,
            "endpoints" => ResourceKind::Endpoints,
            "event" | "events" => ResourceKind::Event,
            "deployment" | "deployments" => ResourceKind::Deployment,
            "replicaset" | "replicasets" => ResourceKind::ReplicaSet,
            "daemonset" | "daemonsets" => ResourceKind::DaemonSet,
            "job" | "jobs" => ResourceKind::Job,
            "ingress" | "ingresses" => ResourceKind::Ingress,
            "horizontalpodautoscaler" | "horizontalpodautoscalers" | "hpa" => ResourceKind::HorizontalPodAutoscaler,
            _ => return Err(WatcherError::UnsupportedKind(s.to_string())),
        };
        Ok(kind)
    }
}

/// Watcher settings, read from the environment
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub kind: ResourceKind,
    /// Empty means all namespaces
    pub namespace: String,
    pub label_selector: Option<LabelSelector>,
    pub field_selector: Option<FieldSelector>,
}

impl WatchConfig {
    /// Load from WATCH_KIND, WATCH_NAMESPACE, LABEL_SELECTOR and FIELD_SELECTOR
    pub fn from_env() -> Result<Self, WatcherError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, WatcherError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind = lookup("WATCH_KIND").unwrap_or_else(|| "pods".to_string()).parse()?;
        let namespace = lookup("WATCH_NAMESPACE").unwrap_or_default();
        let label_selector = lookup("LABEL_SELECTOR")
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse::<LabelSelector>())
            .transpose()
            .map_err(|e| WatcherError::InvalidConfig(format!("LABEL_SELECTOR: {}", e)))?;
        let field_selector = lookup("FIELD_SELECTOR")
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse::<FieldSelector>())
            .transpose()
            .map_err(|e| WatcherError::InvalidConfig(format!("FIELD_SELECTOR: {}", e)))?;

        Ok(Self {
            kind,
            namespace,
            label_selector,
            field_selector,
        })
    }
}

/// Run until `shutdown` fires.
pub async fn run(client: KubeClient, config: WatchConfig, shutdown: CancellationToken) -> Result<(), WatcherError> {
    match config.kind {
        ResourceKind::Pod => watch_resource(client.pods(), &config, shutdown).await,
        ResourceKind::Node => watch_resource(client.nodes(), &config, shutdown).await,
        ResourceKind::Namespace => watch_resource(client.namespaces(), &config, shutdown).await,
        ResourceKind::ConfigMap => watch_resource(client.config_maps(), &config, shutdown).await,
        ResourceKind::Secret => watch_resource(client.secrets(), &config, shutdown).await,
        ResourceKind::Service => watch_resource(client.services(), &config, shutdown).await,
        ResourceKind::ServiceAccount => watch_resource(client.service_accounts(), &config, shutdown).await,
        ResourceKind::Endpoints => watch_resource(client.endpoints(), &config, shutdown).await,
        ResourceKind::Event => watch_resource(client.events(), &config, shutdown).await,
        ResourceKind::Deployment => watch_resource(client.deployments(), &config, shutdown).await,
        ResourceKind::ReplicaSet => watch_resource(client.replica_sets(), &config, shutdown).await,
        ResourceKind::DaemonSet => watch_resource(client.daemon_sets(), &config, shutdown).await,
        ResourceKind::Job => watch_resource(client.jobs(), &config, shutdown).await,
        ResourceKind::Ingress => watch_resource(client.ingresses(), &config, shutdown).await,
        ResourceKind::HorizontalPodAutoscaler => {
            watch_resource(client.horizontal_pod_autoscalers(), &config, shutdown).await
        }
    }
}

/// Generic list-then-watch loop with reconnects.
async fn watch_resource<K: Resource>(
    api: Api<K>,
    config: &WatchConfig,
    shutdown: CancellationToken,
) -> Result<(), WatcherError> {
    info!("Starting {} watcher", K::KIND);
    let mut backoff = FibonacciBackoff::new(BACKOFF_MIN_SECS, BACKOFF_MAX_SECS);
    let mut resource_version: Option<String> = None;

    while !shutdown.is_cancelled() {
        match watch_session(&api, config, &mut resource_version, &shutdown).await {
            Ok(SessionEnd::Established) => {
                backoff.reset();
                debug!("{} watch session ended, reconnecting", K::KIND);
            }
            Ok(SessionEnd::Idle) => {
                let delay = backoff.next_backoff();
                debug!("{} watch closed without events, reconnecting in {:?}", K::KIND, delay);
                if !pause(&shutdown, delay).await {
                    break;
                }
            }
            Ok(SessionEnd::Cancelled) => break,
            Err(e) if is_expired(&e) => {
                warn!("{} resource version expired, relisting: {}", K::KIND, e);
                resource_version = None;
            }
            Err(e) => {
                let delay = backoff.next_backoff();
                error!("{} watch failed, retrying in {:?}: {}", K::KIND, delay, e);
                if !pause(&shutdown, delay).await {
                    break;
                }
            }
        }
    }

    info!("{} watcher stopped", K::KIND);
    Ok(())
}

/// Sleep for `delay`; false if shutdown fired first
async fn pause(shutdown: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    /// Events arrived and then the stream closed; reconnect from the stored version
    Established,
    /// The stream closed before delivering anything
    Idle,
    Cancelled,
}

/// One list (if needed) plus one watch stream, until the stream closes.
async fn watch_session<K: Resource>(
    api: &Api<K>,
    config: &WatchConfig,
    resource_version: &mut Option<String>,
    shutdown: &CancellationToken,
) -> Result<SessionEnd, ClientError> {
    if resource_version.is_none() {
        let opts = ListOptions {
            label_selector: config.label_selector.clone(),
            field_selector: config.field_selector.clone(),
            limit: Some(LIST_PAGE_SIZE),
            continue_token: None,
        };
        let list = api.list_all(&config.namespace, Some(&opts)).await?;
        info!("Listed {} {} at resource version {}", list.len(), K::PLURAL, list.metadata.resource_version);
        for object in list.iter() {
            log_object::<K>("SYNCED", object);
        }
        *resource_version = Some(list.metadata.resource_version);
    }

    let opts = WatchOptions {
        label_selector: config.label_selector.clone(),
        field_selector: config.field_selector.clone(),
        resource_version: resource_version.clone(),
        send_initial_events: false,
        allow_bookmarks: true,
        timeout_seconds: Some(WATCH_TIMEOUT_SECS),
    };
    let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
    let handle = api
        .watch_with_cancel(&config.namespace, Some(&opts), Some(tx), shutdown.child_token())
        .await?;

    let mut delivered: u64 = 0;
    let mut failure = None;
    while let Some(event) = rx.recv().await {
        match handle_event(&event, resource_version) {
            Ok(()) => delivered += 1,
            // The stream is unusable past these; end the session
            Err(e) if is_expired(&e) || e.kind() == ErrorKind::Connection => {
                failure = Some(e);
                handle.cancel();
                break;
            }
            Err(e) => warn!("{} watch error event: {}", K::KIND, e),
        }
    }
    handle.join().await;

    if let Some(e) = failure {
        return Err(e);
    }
    if shutdown.is_cancelled() {
        return Ok(SessionEnd::Cancelled);
    }
    if delivered == 0 {
        return Ok(SessionEnd::Idle);
    }
    debug!("{} watch session delivered {} events", K::KIND, delivered);
    Ok(SessionEnd::Established)
}

/// Log one event and advance the stored resource version.
/// Returns the event's error for ERROR events and undecodable payloads.
fn handle_event<K: Resource>(event: &WatchEvent<K>, resource_version: &mut Option<String>) -> Result<(), ClientError> {
    match event.object() {
        Ok(object) => {
            if event.event_type() == WatchEventType::Bookmark {
                debug!("{} bookmark at {}", K::KIND, object.metadata().resource_version);
            } else {
                log_object(event.event_type().as_str(), object);
            }
            if let Some(version) = event.resource_version() {
                *resource_version = Some(version.to_string());
            }
            Ok(())
        }
        Err(e) => Err(clone_for_caller(e)),
    }
}

/// Events keep their decode error; hand the caller an owned one of the same kind.
/// Payload decode failures come back as malformed frames.
fn clone_for_caller(err: &ClientError) -> ClientError {
    match err.status() {
        Some(status) if err.is_not_found() => ClientError::NotFound(status.clone()),
        Some(status) => ClientError::Remote(status.clone()),
        None if err.kind() == ErrorKind::Connection => ClientError::Connection(err.to_string()),
        None => ClientError::MalformedFrame(err.to_string()),
    }
}

fn log_object<K: Resource>(action: &str, object: &K) {
    let meta = object.metadata();
    if meta.namespace.is_empty() {
        info!("{} {} {} (resourceVersion {})", action, K::KIND, meta.name, meta.resource_version);
    } else {
        info!(
            "{} {} {}/{} (resourceVersion {})",
            action,
            K::KIND,
            meta.namespace,
            meta.name,
            meta.resource_version
        );
    }
}

fn is_expired(err: &ClientError) -> bool {
    err.status().is_some_and(|status| status.code == 410 || status.reason == "Expired" || status.reason == "Gone")
}
