//! Kubernetes client errors

use crate::models::Status;
use thiserror::Error;

/// Errors that can occur when interacting with the Kubernetes API
#[derive(Debug, Error)]
pub enum ClientError {
    /// Caller misuse detected before any I/O
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Client configuration could not be loaded or is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The stream could not be established or was lost
    #[error("Connection error: {0}")]
    Connection(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(Status),

    /// Payload did not match the expected schema
    #[error("failed to decode {shape}: {source}")]
    Decode {
        /// Which payload shape was being decoded (`Status` or a resource kind)
        shape: String,
        #[source]
        source: serde_json::Error,
    },

    /// A watch frame could not be read off the stream
    #[error("Malformed watch frame: {0}")]
    MalformedFrame(String),

    /// The API reported a failure (ERROR watch event or non-success status code)
    #[error("API error: {0}")]
    Remote(Status),

    /// A failure annotated with the operation and resource kind it happened in
    #[error("failed to {operation} {kind}: {source}")]
    Operation {
        operation: &'static str,
        kind: &'static str,
        #[source]
        source: Box<ClientError>,
    },
}

/// Coarse classification of a [`ClientError`], independent of wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    Connection,
    NotFound,
    Decode,
    MalformedFrame,
    Remote,
}

impl ClientError {
    /// Wrap this error with the operation and resource kind it occurred in.
    pub fn wrap(self, operation: &'static str, kind: &'static str) -> Self {
        ClientError::Operation {
            operation,
            kind,
            source: Box::new(self),
        }
    }

    /// Build a decode error for the given payload shape.
    pub fn decode(shape: impl Into<String>, source: serde_json::Error) -> Self {
        ClientError::Decode {
            shape: shape.into(),
            source,
        }
    }

    /// The innermost error, skipping operation wrappers.
    pub fn root(&self) -> &ClientError {
        let mut err = self;
        while let ClientError::Operation { source, .. } = err {
            err = source;
        }
        err
    }

    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::InvalidArgument(_) | ClientError::InvalidConfig(_) => ErrorKind::InvalidArgument,
            ClientError::Http(_) | ClientError::Connection(_) => ErrorKind::Connection,
            ClientError::NotFound(_) => ErrorKind::NotFound,
            ClientError::Decode { .. } => ErrorKind::Decode,
            ClientError::MalformedFrame(_) => ErrorKind::MalformedFrame,
            ClientError::Remote(_) => ErrorKind::Remote,
            ClientError::Operation { source, .. } => source.kind(),
        }
    }

    /// Whether the API reported that the object does not exist.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// The Status object the API returned, if any.
    pub fn status(&self) -> Option<&Status> {
        match self.root() {
            ClientError::NotFound(status) | ClientError::Remote(status) => Some(status),
            _ => None,
        }
    }
}

/// Check whether an error means "object does not exist".
pub fn is_not_found(err: &ClientError) -> bool {
    err.is_not_found()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> ClientError {
        ClientError::NotFound(Status {
            message: "pods \"web-0\" not found".to_string(),
            reason: "NotFound".to_string(),
            code: 404,
            ..Default::default()
        })
    }

    #[test]
    fn test_not_found_survives_wrapping() {
        let err = not_found().wrap("get", "Pod");
        assert!(is_not_found(&err));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.status().map(|s| s.code), Some(404));
    }

    #[test]
    fn test_other_errors_are_not_not_found() {
        let err = ClientError::Connection("reset by peer".to_string()).wrap("list", "Node");
        assert!(!err.is_not_found());
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(err.status().is_none());
    }

    #[test]
    fn test_wrapped_message_names_operation_and_kind() {
        let err = ClientError::InvalidArgument("name must not be empty".to_string()).wrap("delete", "ConfigMap");
        assert_eq!(
            err.to_string(),
            "failed to delete ConfigMap: Invalid argument: name must not be empty"
        );
    }

    #[test]
    fn test_decode_error_names_shape() {
        let source = serde_json::from_str::<Status>("{").unwrap_err();
        let err = ClientError::decode("Status", source);
        assert!(err.to_string().starts_with("failed to decode Status"));
        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
