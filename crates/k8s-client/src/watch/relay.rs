//! Background task that turns raw frames into typed events

use super::event::WatchEvent;
use super::frame::RawWatchFrame;
use crate::error::ClientError;
use crate::models::Resource;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Capacity of the channel between the transport reader and the relay
pub const FRAME_BUFFER: usize = 32;

/// Spawn the relay for one watch.
///
/// Frames are forwarded in arrival order, one event per frame. The relay owns
/// `events` and drops it on exit, which closes the caller's channel. If the
/// caller drops its receiver the relay cancels `cancel` so the transport
/// stops too.
pub(crate) fn spawn_relay<K: Resource>(
    mut frames: mpsc::Receiver<Result<RawWatchFrame, ClientError>>,
    events: mpsc::Sender<WatchEvent<K>>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut relayed: u64 = 0;
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("{} watch cancelled after {} events", K::KIND, relayed);
                    break;
                }
                next = frames.recv() => next,
            };

            let Some(frame) = next else {
                debug!("{} watch stream ended after {} events", K::KIND, relayed);
                break;
            };

            let event = match frame {
                Ok(frame) => WatchEvent::from_frame(frame),
                Err(e) => {
                    warn!("{} watch stream error: {}", K::KIND, e);
                    WatchEvent::from_error(e)
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("{} watch cancelled while delivering an event", K::KIND);
                    break;
                }
                sent = events.send(event) => {
                    if sent.is_err() {
                        debug!("{} watch receiver dropped, stopping stream", K::KIND);
                        cancel.cancel();
                        break;
                    }
                    relayed += 1;
                }
            }
        }
    })
}

/// Push one frame to the relay unless the watch was cancelled.
/// Returns false once nothing more should be sent.
pub(crate) async fn forward_frame(
    frames: &mpsc::Sender<Result<RawWatchFrame, ClientError>>,
    cancel: &CancellationToken,
    frame: Result<RawWatchFrame, ClientError>,
) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        sent = frames.send(frame) => sent.is_ok(),
    }
}

/// Handle to a running watch
#[derive(Debug)]
pub struct WatchHandle {
    cancel: CancellationToken,
    relay: JoinHandle<()>,
}

impl WatchHandle {
    pub(crate) fn new(cancel: CancellationToken, relay: JoinHandle<()>) -> Self {
        Self { cancel, relay }
    }

    /// Stop the watch; the event channel closes shortly after.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token shared with the relay and the transport
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the relay has exited
    pub fn is_finished(&self) -> bool {
        self.relay.is_finished()
    }

    /// Wait for the relay to exit. Does not cancel the watch.
    pub async fn join(self) {
        if let Err(e) = self.relay.await {
            warn!("watch relay task failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::Pod;
    use crate::watch::WatchEventType;

    fn pod_frame(event_type: WatchEventType, name: &str) -> Result<RawWatchFrame, ClientError> {
        Ok(RawWatchFrame::new(
            event_type,
            format!(r#"{{"metadata":{{"name":"{}","namespace":"default"}}}}"#, name).into_bytes(),
        ))
    }

    #[tokio::test]
    async fn test_relays_in_order_then_closes() {
        let (frame_tx, frame_rx) = mpsc::channel(FRAME_BUFFER);
        let (tx, mut rx) = mpsc::channel::<WatchEvent<Pod>>(8);
        let relay = spawn_relay(frame_rx, tx, CancellationToken::new());

        frame_tx.send(pod_frame(WatchEventType::Added, "a")).await.unwrap();
        frame_tx.send(Err(ClientError::MalformedFrame("bad".to_string()))).await.unwrap();
        frame_tx.send(pod_frame(WatchEventType::Deleted, "a")).await.unwrap();
        drop(frame_tx);

        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            seen.push(event.event_type());
        }
        assert_eq!(
            seen,
            vec![WatchEventType::Added, WatchEventType::Error, WatchEventType::Deleted]
        );
        relay.await.unwrap();
    }

    #[tokio::test]
    async fn test_frame_error_becomes_failed_event() {
        let (frame_tx, frame_rx) = mpsc::channel(FRAME_BUFFER);
        let (tx, mut rx) = mpsc::channel::<WatchEvent<Pod>>(8);
        let _relay = spawn_relay(frame_rx, tx, CancellationToken::new());

        frame_tx.send(Err(ClientError::MalformedFrame("bad".to_string()))).await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.object().unwrap_err().kind(), ErrorKind::MalformedFrame);
    }

    #[tokio::test]
    async fn test_cancel_closes_channel() {
        let (frame_tx, frame_rx) = mpsc::channel(FRAME_BUFFER);
        let (tx, mut rx) = mpsc::channel::<WatchEvent<Pod>>(8);
        let cancel = CancellationToken::new();
        let handle = WatchHandle::new(cancel.clone(), spawn_relay(frame_rx, tx, cancel));

        handle.cancel();
        assert!(rx.recv().await.is_none());
        handle.join().await;
        drop(frame_tx);
    }

    #[tokio::test]
    async fn test_dropped_receiver_cancels_token() {
        let (frame_tx, frame_rx) = mpsc::channel(FRAME_BUFFER);
        let (tx, rx) = mpsc::channel::<WatchEvent<Pod>>(1);
        let cancel = CancellationToken::new();
        let relay = spawn_relay(frame_rx, tx, cancel.clone());

        drop(rx);
        frame_tx.send(pod_frame(WatchEventType::Added, "a")).await.unwrap();
        relay.await.unwrap();
        assert!(cancel.is_cancelled());
    }
}
