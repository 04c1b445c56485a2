//! Mock HTTP executor for unit testing
//!
//! This module provides an in-memory implementation of [`HttpExecutor`] that
//! can be used in unit tests without a running API server. Responses and
//! watch streams are scripted per path; every call is recorded.

use crate::error::ClientError;
use crate::executor_trait::{error_from_response, status_accepted, ApiResponse, FrameSender, HttpExecutor, ResponseMeta};
use crate::models::Status;
use crate::watch::relay::forward_frame;
use crate::watch::FrameDecoder;
use reqwest::{Method, StatusCode};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

/// A request seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
struct ScriptedStream {
    chunks: Vec<Vec<u8>>,
    hold_open: bool,
    /// Transport failure reported after the chunks
    failure: Option<String>,
}

#[derive(Debug, Default)]
struct MockState {
    responses: HashMap<(Method, String), (StatusCode, Vec<u8>)>,
    streams: HashMap<String, ScriptedStream>,
    requests: Vec<RecordedRequest>,
}

/// Mock executor for testing
///
/// Clones share state, so a test can keep one handle for assertions while the
/// client owns another.
#[derive(Debug, Clone)]
pub struct MockExecutor {
    base_url: String,
    state: Arc<Mutex<MockState>>,
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExecutor {
    /// Create a new mock executor
    pub fn new() -> Self {
        Self {
            base_url: "http://mock.invalid".to_string(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer `method path` (path including any query string) with `status` and `body`
    pub fn respond(&self, method: Method, path: &str, status: StatusCode, body: impl Into<Vec<u8>>) {
        self.state()
            .responses
            .insert((method, path.to_string()), (status, body.into()));
    }

    /// Serve a watch body for `path`, delivered as the given chunks, then end the stream
    pub fn stream(&self, path: &str, chunks: Vec<Vec<u8>>) {
        self.state().streams.insert(
            path.to_string(),
            ScriptedStream {
                chunks,
                hold_open: false,
                failure: None,
            },
        );
    }

    /// Like [`stream`](Self::stream), but keep the stream open until cancelled
    pub fn stream_held_open(&self, path: &str, chunks: Vec<Vec<u8>>) {
        self.state().streams.insert(
            path.to_string(),
            ScriptedStream {
                chunks,
                hold_open: true,
                failure: None,
            },
        );
    }

    /// Like [`stream`](Self::stream), but the connection drops with `message` after the chunks
    pub fn stream_failing(&self, path: &str, chunks: Vec<Vec<u8>>, message: &str) {
        self.state().streams.insert(
            path.to_string(),
            ScriptedStream {
                chunks,
                hold_open: false,
                failure: Some(message.to_string()),
            },
        );
    }

    /// Every request made so far, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state().requests.clone()
    }

    /// Number of requests made so far
    pub fn call_count(&self) -> usize {
        self.state().requests.len()
    }

    fn record(&self, method: &Method, path: &str, body: Option<&serde_json::Value>) {
        self.state().requests.push(RecordedRequest {
            method: method.clone(),
            path: path.to_string(),
            body: body.cloned(),
        });
    }
}

#[async_trait::async_trait]
impl HttpExecutor for MockExecutor {
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
        self.record(&method, path, body);

        let scripted = self.state().responses.get(&(method.clone(), path.to_string())).cloned();
        let Some((status, body)) = scripted else {
            return Err(ClientError::NotFound(Status::failure(
                404,
                "NotFound",
                &format!("no mock response for {} {}", method, path),
            )));
        };

        if !status_accepted(status, expected) {
            return Err(error_from_response(status, &body));
        }
        Ok(ApiResponse { status, body })
    }

    async fn execute_streaming(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        frames: FrameSender,
        cancel: CancellationToken,
    ) -> Result<ResponseMeta, ClientError> {
        self.record(&method, path, body);

        let (stream, scripted_error) = {
            let state = self.state();
            (
                state.streams.get(path).cloned(),
                state.responses.get(&(method.clone(), path.to_string())).cloned(),
            )
        };

        let Some(stream) = stream else {
            return Err(match scripted_error {
                Some((status, body)) if !status.is_success() => error_from_response(status, &body),
                _ => ClientError::Connection(format!("no mock stream for {}", path)),
            });
        };

        tokio::spawn(async move {
            let mut decoder = FrameDecoder::new();
            for chunk in &stream.chunks {
                for frame in decoder.push(chunk) {
                    if !forward_frame(&frames, &cancel, frame).await {
                        return;
                    }
                }
            }
            if let Some(frame) = decoder.finish() {
                if !forward_frame(&frames, &cancel, frame).await {
                    return;
                }
            }
            if let Some(message) = stream.failure {
                forward_frame(&frames, &cancel, Err(ClientError::Connection(message))).await;
                return;
            }
            if stream.hold_open {
                cancel.cancelled().await;
            }
        });

        Ok(ResponseMeta { status: StatusCode::OK })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_unscripted_request_is_not_found() {
        let mock = MockExecutor::new();
        let err = mock
            .execute(Method::GET, "/api/v1/pods", None, &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(mock.requests()[0].path, "/api/v1/pods");
    }

    #[tokio::test]
    async fn test_scripted_stream_error_status() {
        let mock = MockExecutor::new();
        mock.respond(
            Method::GET,
            "/api/v1/pods?watch=true",
            StatusCode::GONE,
            r#"{"kind":"Status","message":"too old","reason":"Expired","code":410}"#,
        );
        let (tx, _rx) = mpsc::channel(1);
        let err = mock
            .execute_streaming(Method::GET, "/api/v1/pods?watch=true", None, tx, CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.status().unwrap().code, 410);
    }

    #[tokio::test]
    async fn test_failing_stream_reports_connection_error_last() {
        let mock = MockExecutor::new();
        mock.stream_failing(
            "/api/v1/pods?watch=true",
            vec![br#"{"type":"ADDED","object":{"kind":"Pod","metadata":{"name":"a"}}}"#.to_vec()],
            "connection reset by peer",
        );
        let (tx, mut rx) = mpsc::channel(4);
        mock.execute_streaming(Method::GET, "/api/v1/pods?watch=true", None, tx, CancellationToken::new())
            .await
            .unwrap();

        assert!(rx.recv().await.unwrap().is_ok());
        let err = rx.recv().await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(err.to_string().contains("connection reset by peer"));
        assert!(rx.recv().await.is_none());
    }
}
