//! Common utilities for the Kubernetes API client
//!
//! Provides the reqwest-backed [`HttpClient`] plus the path and query
//! builders shared by every resource kind.

pub mod path;
pub mod query;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::executor_trait::{error_from_response, status_accepted, ApiResponse, FrameSender, HttpExecutor, ResponseMeta};
use crate::watch::relay::forward_frame;
use crate::watch::FrameDecoder;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// HTTP client wrapper with authentication
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    request_timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ClientError::InvalidConfig(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.server.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            request_timeout: config.request_timeout,
        })
    }

    /// Build a full URL from a path
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn request(&self, method: Method, path: &str, body: Option<&serde_json::Value>) -> RequestBuilder {
        let url = self.build_url(path);
        debug!("{} {}", method, url);

        let mut request = self.client.request(method, &url).header(ACCEPT, "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").json(body);
        }
        request
    }
}

#[async_trait::async_trait]
impl HttpExecutor for HttpClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        expected: &[StatusCode],
    ) -> Result<ApiResponse, ClientError> {
        let response = self
            .request(method, path, body)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status_accepted(status, expected) {
            debug!("{} returned {}", path, status);
            return Err(error_from_response(status, &body));
        }

        Ok(ApiResponse {
            status,
            body: body.to_vec(),
        })
    }

    async fn execute_streaming(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        frames: FrameSender,
        cancel: CancellationToken,
    ) -> Result<ResponseMeta, ClientError> {
        let send = self.request(method, path, body).send();
        let response = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(ClientError::Connection("watch cancelled before the stream was established".to_string()));
            }
            response = send => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = error_body(path, response.bytes().await);
            return Err(error_from_response(status, &body));
        }

        debug!("watch stream established: {} {}", path, status);
        tokio::spawn(read_frames(response, frames, cancel));
        Ok(ResponseMeta { status })
    }
}

/// Body of a failed response, or a description of why it could not be read
fn error_body<B: AsRef<[u8]>, E: fmt::Display>(path: &str, body: Result<B, E>) -> Vec<u8> {
    match body {
        Ok(body) => body.as_ref().to_vec(),
        Err(e) => {
            warn!("failed to read error body for {}: {}", path, e);
            format!("error body unreadable: {}", e).into_bytes()
        }
    }
}

/// Read the body chunk by chunk, forwarding each completed frame.
async fn read_frames(mut response: Response, frames: FrameSender, cancel: CancellationToken) {
    let mut decoder = FrameDecoder::new();
    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("watch stream reader cancelled");
                return;
            }
            chunk = response.chunk() => chunk,
        };

        match chunk {
            Ok(Some(bytes)) => {
                for frame in decoder.push(&bytes) {
                    if !forward_frame(&frames, &cancel, frame).await {
                        return;
                    }
                }
            }
            Ok(None) => {
                if let Some(frame) = decoder.finish() {
                    forward_frame(&frames, &cancel, frame).await;
                }
                debug!("watch stream closed by server");
                return;
            }
            Err(e) => {
                warn!("watch stream read failed: {}", e);
                forward_frame(&frames, &cancel, Err(ClientError::Http(e))).await;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_trims_trailing_slash() {
        let config = ClientConfig::new("http://127.0.0.1:8001/").unwrap();
        let http = HttpClient::new(&config).unwrap();
        assert_eq!(http.base_url(), "http://127.0.0.1:8001");
        assert_eq!(http.build_url("/api/v1/pods"), "http://127.0.0.1:8001/api/v1/pods");
        assert_eq!(http.build_url("https://other/api"), "https://other/api");
    }

    #[test]
    fn test_unreadable_error_body_is_reported() {
        let body = error_body::<Vec<u8>, _>("/api/v1/pods?watch=true", Err("connection closed"));
        let err = error_from_response(StatusCode::BAD_GATEWAY, &body);
        let status = err.status().unwrap();
        assert_eq!(status.code, 502);
        assert!(status.message.contains("error body unreadable: connection closed"));

        assert_eq!(error_body::<_, String>("/x", Ok(b"denied".to_vec())), b"denied".to_vec());
    }
}
