//! HTTP executor tests against a local mock HTTP server

use k8s_client::{ClientConfig, ErrorKind, KubeClient, Pod, WatchEventType, WatchOptions};
use tokio::sync::mpsc;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> KubeClient {
    let config = ClientConfig::new(server.uri()).unwrap().with_token("test-token");
    KubeClient::new(config).unwrap()
}

fn pod_body(name: &str, version: &str) -> serde_json::Value {
    serde_json::json!({
        "kind": "Pod",
        "apiVersion": "v1",
        "metadata": {"name": name, "namespace": "default", "resourceVersion": version},
        "spec": {"containers": [{"name": "app", "image": "nginx"}]}
    })
}

#[tokio::test]
async fn test_get_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/default/pods/web-0"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pod_body("web-0", "7")))
        .expect(1)
        .mount(&server)
        .await;

    let pod = client_for(&server).await.pods().get("default", "web-0").await.unwrap();
    assert_eq!(pod.metadata.resource_version, "7");
}

#[tokio::test]
async fn test_not_found_status_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/default/pods/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "kind": "Status", "apiVersion": "v1", "status": "Failure",
            "message": "pods \"gone\" not found", "reason": "NotFound", "code": 404
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.pods().get("default", "gone").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.status().unwrap().message, "pods \"gone\" not found");
    assert!(client.pods().get_opt("default", "gone").await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_posts_stamped_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/namespaces/default/pods"))
        .and(body_partial_json(serde_json::json!({
            "kind": "Pod", "apiVersion": "v1", "metadata": {"name": "web-0", "namespace": "default"}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(pod_body("web-0", "1")))
        .expect(1)
        .mount(&server)
        .await;

    let mut pod = Pod::default();
    pod.metadata.name = "web-0".to_string();
    let created = client_for(&server).await.pods().create("default", &mut pod).await.unwrap();
    assert_eq!(created.metadata.resource_version, "1");
}

#[tokio::test]
async fn test_server_error_with_plain_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/nodes"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = client_for(&server).await.nodes().list("", None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Remote);
    let status = err.status().unwrap();
    assert_eq!(status.code, 503);
    assert!(status.message.contains("upstream unavailable"));
}

#[tokio::test]
async fn test_watch_streams_body_frames() {
    let server = MockServer::start().await;
    let body = [
        serde_json::json!({"type": "ADDED", "object": pod_body("a", "11")}).to_string(),
        serde_json::json!({"type": "MODIFIED", "object": pod_body("a", "12")}).to_string(),
        serde_json::json!({"type": "ERROR", "object": {
            "kind": "Status", "status": "Failure", "message": "etcdserver timeout", "code": 500
        }})
        .to_string(),
    ]
    .join("\n");
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces/default/pods"))
        .and(query_param("watch", "true"))
        .and(query_param("resourceVersion", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let (tx, mut rx) = mpsc::channel(8);
    let opts = WatchOptions::default().with_resource_version("10");
    let handle = client.pods().watch("default", Some(&opts), Some(tx)).await.unwrap();

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    handle.join().await;

    assert_eq!(events.len(), 3);
    assert_eq!(events[0].event_type(), WatchEventType::Added);
    assert_eq!(events[1].resource_version(), Some("12"));
    let err = events[2].object().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Remote);
    assert_eq!(err.status().unwrap().message, "etcdserver timeout");
}

#[tokio::test]
async fn test_watch_expired_resource_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/pods"))
        .respond_with(ResponseTemplate::new(410).set_body_json(serde_json::json!({
            "kind": "Status", "status": "Failure", "message": "too old resource version",
            "reason": "Expired", "code": 410
        })))
        .mount(&server)
        .await;

    let (tx, mut rx) = mpsc::channel(8);
    let err = client_for(&server)
        .await
        .pods()
        .watch("", Some(&WatchOptions::default().with_resource_version("1")), Some(tx))
        .await
        .unwrap_err();
    assert_eq!(err.status().unwrap().reason, "Expired");
    assert!(rx.recv().await.is_none());
}
