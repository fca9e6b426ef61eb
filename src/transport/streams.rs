//! Consumer-facing stream handles.
//!
//! Thin wrappers over the event loop's broadcast channels:
//!
//! - [`StatusStream`] — deduplicated boolean connection status
//! - [`FrameStream`] — unfiltered firehose of all inbound frames
//!
//! Both streams are potentially infinite and never complete on their own;
//! they end only when the client is disposed.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::{broadcast, watch};
use tracing::warn;

use crate::protocol::Frame;

// ============================================================================
// StatusStream
// ============================================================================

/// Deduplicated stream of connection status booleans.
///
/// Yields the current status immediately on first poll, then only changes:
/// two consecutive equal values are never emitted. Rapid flaps that occur
/// while the consumer is not polling coalesce to the latest value.
pub struct StatusStream {
    rx: watch::Receiver<bool>,
    last: Option<bool>,
}

impl StatusStream {
    pub(crate) fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx, last: None }
    }

    /// Waits for the next status value.
    ///
    /// Returns `None` after the client has been disposed.
    pub async fn next(&mut self) -> Option<bool> {
        loop {
            let current = *self.rx.borrow_and_update();
            if self.last != Some(current) {
                self.last = Some(current);
                return Some(current);
            }
            self.rx.changed().await.ok()?;
        }
    }

    /// Returns the current status without waiting.
    #[inline]
    #[must_use]
    pub fn current(&self) -> bool {
        *self.rx.borrow()
    }
}

impl std::fmt::Debug for StatusStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusStream")
            .field("current", &self.current())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// FrameStream
// ============================================================================

/// Unfiltered stream of all inbound frames.
///
/// Each [`receive()`](crate::RouteSocket::receive) call creates an
/// independent stream starting at the moment of the call; frames that
/// arrived earlier are not replayed. A consumer that falls further behind
/// than the channel capacity skips the lost frames (delivery is at most
/// once) and keeps going.
pub struct FrameStream {
    rx: broadcast::Receiver<Frame>,
}

impl FrameStream {
    pub(crate) fn new(rx: broadcast::Receiver<Frame>) -> Self {
        Self { rx }
    }

    /// Waits for the next inbound frame.
    ///
    /// Returns `None` after the client has been disposed.
    pub async fn next(&mut self) -> Option<Frame> {
        loop {
            match self.rx.recv().await {
                Ok(frame) => return Some(frame),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Slow receive() consumer; inbound frames dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking poll for an already-delivered frame.
    pub fn try_next(&mut self) -> Option<Frame> {
        loop {
            match self.rx.try_recv() {
                Ok(frame) => return Some(frame),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Slow receive() consumer; inbound frames dropped");
                }
                Err(_) => return None,
            }
        }
    }
}

impl std::fmt::Debug for FrameStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStream").finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[tokio::test]
    async fn test_status_stream_yields_current_first() {
        let (tx, rx) = watch::channel(false);
        let mut stream = StatusStream::new(rx);

        assert_eq!(stream.next().await, Some(false));

        tx.send(true).unwrap();
        assert_eq!(stream.next().await, Some(true));
    }

    #[tokio::test]
    async fn test_status_stream_skips_duplicate_values() {
        let (tx, rx) = watch::channel(false);
        let mut stream = StatusStream::new(rx);
        assert_eq!(stream.next().await, Some(false));

        // A duplicate publish must not produce a second `false`.
        tx.send(false).unwrap();
        tx.send(true).unwrap();
        assert_eq!(stream.next().await, Some(true));
    }

    #[tokio::test]
    async fn test_status_stream_ends_on_disposal() {
        let (tx, rx) = watch::channel(true);
        let mut stream = StatusStream::new(rx);
        assert_eq!(stream.next().await, Some(true));

        drop(tx);
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_frame_stream_independent_views() {
        let (tx, _) = broadcast::channel(16);
        let mut first = FrameStream::new(tx.subscribe());
        let mut second = FrameStream::new(tx.subscribe());

        tx.send(Frame::from(json!({"n": 1}))).unwrap();

        assert_eq!(first.next().await.unwrap().value(), &json!({"n": 1}));
        assert_eq!(second.next().await.unwrap().value(), &json!({"n": 1}));
    }

    #[tokio::test]
    async fn test_frame_stream_ends_on_disposal() {
        let (tx, rx) = broadcast::channel::<Frame>(16);
        let mut stream = FrameStream::new(rx);

        drop(tx);
        assert!(stream.next().await.is_none());
    }
}
