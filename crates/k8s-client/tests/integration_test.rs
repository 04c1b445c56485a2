//! Integration tests against a live API server
//!
//! These tests require a reachable cluster, e.g. through `kubectl proxy`.
//! Set K8S_SERVER (default http://127.0.0.1:8001) and optionally K8S_TOKEN to run.

use k8s_client::{ConfigMap, KubeClient, ListOptions, WatchEventType, WatchOptions};
use std::time::Duration;
use tokio::sync::mpsc;

const TEST_NAMESPACE: &str = "default";

fn client() -> KubeClient {
    KubeClient::from_env().expect("Failed to create client from K8S_* environment")
}

#[tokio::test]
#[ignore] // Requires running API server
async fn test_client_creation() {
    let version = client().server_version().await;
    assert!(version.is_ok(), "Failed to reach API server: {:?}", version.err());
}

#[tokio::test]
#[ignore]
async fn test_list_nodes() {
    let nodes = client().nodes().list("", None).await.expect("Failed to list nodes");
    println!("Found {} nodes", nodes.len());
    for node in &nodes.items {
        assert!(!node.metadata.name.is_empty());
    }
}

#[tokio::test]
#[ignore]
async fn test_list_pods_all_namespaces_paginated() {
    let opts = ListOptions::default().with_limit(5);
    let pods = client()
        .pods()
        .list_all("", Some(&opts))
        .await
        .expect("Failed to list pods");
    println!("Found {} pods", pods.len());
}

#[tokio::test]
#[ignore]
async fn test_config_map_lifecycle_and_watch() {
    let client = client();
    let api = client.config_maps();
    let name = format!("k8s-client-it-{}", std::process::id());

    let (tx, mut rx) = mpsc::channel(16);
    let opts = WatchOptions::default()
        .with_field_selector(format!("metadata.name={}", name).parse().expect("valid selector"))
        .with_timeout_seconds(30);
    let handle = api
        .watch(TEST_NAMESPACE, Some(&opts), Some(tx))
        .await
        .expect("Failed to start watch");

    let mut config_map = ConfigMap::new(TEST_NAMESPACE, &name);
    config_map.data.insert("key".to_string(), "value".to_string());
    let created = api.create(TEST_NAMESPACE, &mut config_map).await.expect("Failed to create ConfigMap");
    assert_eq!(created.data.get("key").map(String::as_str), Some("value"));

    let fetched = api.get(TEST_NAMESPACE, &name).await.expect("Failed to get ConfigMap");
    assert_eq!(fetched.metadata.uid, created.metadata.uid);

    api.delete(TEST_NAMESPACE, &name).await.expect("Failed to delete ConfigMap");

    let mut seen = Vec::new();
    while let Ok(Some(event)) = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await {
        seen.push(event.event_type());
        if event.event_type() == WatchEventType::Deleted {
            break;
        }
    }
    handle.cancel();
    handle.join().await;

    assert_eq!(seen.first(), Some(&WatchEventType::Added));
    assert_eq!(seen.last(), Some(&WatchEventType::Deleted));

    let missing = api.get_opt(TEST_NAMESPACE, &name).await.expect("Failed to query ConfigMap");
    assert!(missing.is_none());
}
