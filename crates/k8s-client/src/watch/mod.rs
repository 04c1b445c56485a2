//! Watch stream handling
//!
//! The pipeline for one watch is:
//!
//! ```text
//! HTTP body ──FrameDecoder──▶ raw frame channel ──relay task──▶ mpsc::Sender<WatchEvent<K>>
//! ```
//!
//! The transport reader and the relay share a `CancellationToken`; either side
//! (or the caller, through [`WatchHandle`]) can stop the whole pipeline.

pub mod event;
pub mod frame;
pub(crate) mod relay;

pub use event::WatchEvent;
pub use frame::{decode_frame, FrameDecoder, RawWatchFrame, WatchEventType, DEFAULT_MAX_FRAME_BYTES};
pub use relay::{WatchHandle, FRAME_BUFFER};
