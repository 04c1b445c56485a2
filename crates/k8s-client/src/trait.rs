//! HTTP executor trait for mocking
//!
//! The generic resource executors talk to the API server only through this
//! trait. `HttpClient` implements it over reqwest; tests use `MockExecutor`.

use crate::error::ClientError;
use crate::models::Status;
use crate::watch::RawWatchFrame;
use reqwest::{Method, StatusCode};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Where a streaming call delivers decoded frames (or the failure that ended the stream)
pub type FrameSender = mpsc::Sender<Result<RawWatchFrame, ClientError>>;

/// A fully read response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Status line of an established streaming response
#[derive(Debug, Clone, Copy)]
pub struct ResponseMeta {
    pub status: StatusCode,
}

/// Transport used by the resource executors
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait HttpExecutor: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    /// Send one request and read the whole body.
    ///
    /// `expected` lists acceptable status codes; empty means any 2xx.
    /// Anything else is turned into an error via [`error_from_response`].
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        expected: &[StatusCode],
    ) -> Result<ApiResponse, ClientError>;

    /// Open a streaming request.
    ///
    /// Returns once the response status is known. Frames are then pushed to
    /// `frames` from a background reader until the body ends, `cancel` fires,
    /// or the receiving side goes away; dropping `frames` signals the end.
    async fn execute_streaming(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        frames: FrameSender,
        cancel: CancellationToken,
    ) -> Result<ResponseMeta, ClientError>;
}

/// Whether `status` is acceptable for a call expecting `expected`
pub fn status_accepted(status: StatusCode, expected: &[StatusCode]) -> bool {
    if expected.is_empty() {
        status.is_success()
    } else {
        expected.contains(&status)
    }
}

/// Map a non-success response to an error.
///
/// The body is decoded as a Status when possible; otherwise a Status is
/// synthesized from the status line and the start of the body.
pub fn error_from_response(status: StatusCode, body: &[u8]) -> ClientError {
    let decoded = serde_json::from_slice::<Status>(body)
        .ok()
        .filter(|s| s.type_meta.kind == "Status" || !s.message.is_empty() || s.code != 0);

    let mut remote = decoded.unwrap_or_else(|| {
        let text = String::from_utf8_lossy(body);
        let message = format!(
            "{} - {}",
            status,
            text.chars().take(500).collect::<String>()
        );
        Status::failure(
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown"),
            message.trim_end_matches([' ', '-']),
        )
    });
    if remote.code == 0 {
        remote.code = status.as_u16();
    }

    if status == StatusCode::NOT_FOUND {
        ClientError::NotFound(remote)
    } else {
        ClientError::Remote(remote)
    }
}
