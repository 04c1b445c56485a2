//! Raw watch frames
//!
//! A watch response body is a sequence of newline-delimited JSON envelopes,
//! `{"type": "ADDED", "object": {...}}`. This module peels the envelope off
//! without touching the embedded object, which stays as raw bytes until the
//! caller asks for it.

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;

/// Default cap on a single frame; larger frames are dropped as malformed.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Change notification type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WatchEventType {
    /// Object created (or replayed as initial state)
    Added,
    /// Object changed
    Modified,
    /// Object removed; the payload is its last state
    Deleted,
    /// Progress marker carrying only a resource version
    Bookmark,
    /// Payload is a Status, not a resource
    Error,
}

impl WatchEventType {
    /// Wire name, e.g. `ADDED`
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchEventType::Added => "ADDED",
            WatchEventType::Modified => "MODIFIED",
            WatchEventType::Deleted => "DELETED",
            WatchEventType::Bookmark => "BOOKMARK",
            WatchEventType::Error => "ERROR",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "ADDED" => Some(WatchEventType::Added),
            "MODIFIED" => Some(WatchEventType::Modified),
            "DELETED" => Some(WatchEventType::Deleted),
            "BOOKMARK" => Some(WatchEventType::Bookmark),
            "ERROR" => Some(WatchEventType::Error),
            _ => None,
        }
    }
}

impl fmt::Display for WatchEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One undecoded change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawWatchFrame {
    /// Declared `type` of the notification
    pub event_type: WatchEventType,
    /// The embedded object, exactly as received
    pub object: Vec<u8>,
}

impl RawWatchFrame {
    /// Build a frame from its parts
    pub fn new(event_type: WatchEventType, object: impl Into<Vec<u8>>) -> Self {
        Self {
            event_type,
            object: object.into(),
        }
    }
}

#[derive(Deserialize)]
struct Envelope<'a> {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(borrow, default)]
    object: Option<&'a RawValue>,
}

/// Decode one frame. The embedded object is kept as raw bytes.
pub fn decode_frame(bytes: &[u8]) -> Result<RawWatchFrame, ClientError> {
    let envelope: Envelope<'_> = serde_json::from_slice(bytes)
        .map_err(|e| ClientError::MalformedFrame(format!("invalid watch frame: {}", e)))?;

    let event_type = WatchEventType::parse(&envelope.event_type).ok_or_else(|| {
        ClientError::MalformedFrame(format!("unknown watch event type '{}'", envelope.event_type))
    })?;

    let object = envelope
        .object
        .map(RawValue::get)
        .filter(|raw| *raw != "null")
        .ok_or_else(|| ClientError::MalformedFrame(format!("Object is empty in event of type '{}'", event_type)))?;

    Ok(RawWatchFrame::new(event_type, object.as_bytes()))
}

/// Incremental newline splitter for a chunked watch body.
///
/// Holds at most one partial frame. A frame longer than the limit is
/// reported once as malformed and skipped up to its terminating newline.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    max_frame_bytes: usize,
    discarding: bool,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Decoder with the default frame size limit
    pub fn new() -> Self {
        Self::with_max_frame_bytes(DEFAULT_MAX_FRAME_BYTES)
    }

    /// Decoder that rejects frames longer than `max_frame_bytes`
    pub fn with_max_frame_bytes(max_frame_bytes: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_frame_bytes,
            discarding: false,
        }
    }

    /// Feed a chunk, returning every frame it completed in stream order.
    pub fn push(&mut self, mut chunk: &[u8]) -> Vec<Result<RawWatchFrame, ClientError>> {
        let mut frames = Vec::new();

        while !chunk.is_empty() {
            match chunk.iter().position(|b| *b == b'\n') {
                Some(pos) => {
                    let (line, rest) = chunk.split_at(pos);
                    chunk = &rest[1..];
                    if self.discarding {
                        self.discarding = false;
                        continue;
                    }
                    if self.buf.len() + line.len() > self.max_frame_bytes {
                        self.buf.clear();
                        frames.push(Err(self.oversize()));
                        continue;
                    }
                    self.buf.extend_from_slice(line);
                    let frame = std::mem::take(&mut self.buf);
                    if let Some(decoded) = decode_line(&frame) {
                        frames.push(decoded);
                    }
                }
                None => {
                    if !self.discarding {
                        if self.buf.len() + chunk.len() > self.max_frame_bytes {
                            self.buf.clear();
                            self.discarding = true;
                            frames.push(Err(self.oversize()));
                        } else {
                            self.buf.extend_from_slice(chunk);
                        }
                    }
                    break;
                }
            }
        }

        frames
    }

    /// Flush a trailing frame that was not newline-terminated.
    pub fn finish(&mut self) -> Option<Result<RawWatchFrame, ClientError>> {
        self.discarding = false;
        let frame = std::mem::take(&mut self.buf);
        decode_line(&frame)
    }

    fn oversize(&self) -> ClientError {
        ClientError::MalformedFrame(format!("watch frame exceeds {} bytes", self.max_frame_bytes))
    }
}

fn decode_line(line: &[u8]) -> Option<Result<RawWatchFrame, ClientError>> {
    let line = line.trim_ascii();
    if line.is_empty() { None } else { Some(decode_frame(line)) }
}
