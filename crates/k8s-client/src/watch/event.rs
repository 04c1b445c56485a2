//! Typed watch events with lazy, memoized decoding

use super::frame::{RawWatchFrame, WatchEventType};
use crate::error::ClientError;
use crate::models::{Resource, Status};
use std::sync::OnceLock;

/// A change notification for resource kind `K`.
///
/// The embedded object is decoded on first access and the result (success
/// or failure) is cached, so repeated calls never re-parse.
#[derive(Debug)]
pub struct WatchEvent<K> {
    event_type: WatchEventType,
    object: Vec<u8>,
    decoded: OnceLock<Result<K, ClientError>>,
}

impl<K: Resource> WatchEvent<K> {
    /// Wrap a raw frame; nothing is decoded yet
    pub fn from_frame(frame: RawWatchFrame) -> Self {
        Self {
            event_type: frame.event_type,
            object: frame.object,
            decoded: OnceLock::new(),
        }
    }

    /// An event standing in for a stream or frame failure
    pub(crate) fn from_error(err: ClientError) -> Self {
        Self {
            event_type: WatchEventType::Error,
            object: Vec::new(),
            decoded: OnceLock::from(Err(err)),
        }
    }

    /// Declared event type
    pub fn event_type(&self) -> WatchEventType {
        self.event_type
    }

    /// Undecoded payload bytes; empty for events synthesized from stream failures
    pub fn raw_object(&self) -> &[u8] {
        &self.object
    }

    /// The decoded object, or why it could not be produced.
    ///
    /// ERROR events always yield `Err`: the remote Status when it decodes,
    /// a decode error otherwise.
    pub fn object(&self) -> Result<&K, &ClientError> {
        self.decoded
            .get_or_init(|| decode_object(self.event_type, &self.object))
            .as_ref()
    }

    /// Take the decoded object, decoding now if needed
    pub fn into_object(self) -> Result<K, ClientError> {
        match self.decoded.into_inner() {
            Some(decoded) => decoded,
            None => decode_object(self.event_type, &self.object),
        }
    }

    /// Resource version of the decoded object, if it decoded
    pub fn resource_version(&self) -> Option<&str> {
        self.object()
            .ok()
            .map(|object| object.metadata().resource_version.as_str())
            .filter(|version| !version.is_empty())
    }
}

fn decode_object<K: Resource>(event_type: WatchEventType, object: &[u8]) -> Result<K, ClientError> {
    match event_type {
        WatchEventType::Error => {
            let status: Status = serde_json::from_slice(object).map_err(|e| ClientError::decode("Status", e))?;
            Err(ClientError::Remote(status))
        }
        _ => serde_json::from_slice(object).map_err(|e| ClientError::decode(K::KIND, e)),
    }
}
