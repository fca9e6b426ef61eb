//! Route subscription registry.
//!
//! Tracks active route subscriptions in registration order. Each entry owns
//! an independent delivery channel, so registering the same route twice
//! yields two entries that each receive their own copy of every matching
//! inbound frame.
//!
//! Entries are garbage-collected eventually, not synchronously: dropping a
//! [`RouteHandle`] closes its channel and schedules a sweep on the event
//! loop, which removes every entry with no remaining receiver. Coalescing
//! the removal avoids churn when a consumer unsubscribes and immediately
//! resubscribes to the same route.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::protocol::Frame;

// ============================================================================
// RouteEntry
// ============================================================================

/// One active route subscription.
struct RouteEntry {
    /// Route name; not required to be unique across entries.
    route: String,
    /// Delivery channel into the entry's [`RouteHandle`].
    tx: mpsc::UnboundedSender<Frame>,
    /// Whether a subscribe-control frame has been sent for this entry on
    /// the current connection. Replay marks every entry, so one covered by
    /// an in-flight open is not announced twice.
    subscribed: bool,
}

// ============================================================================
// RouteRegistry
// ============================================================================

/// Registry of active route subscriptions.
///
/// Shared between the facade (registration) and the event loop (dispatch,
/// replay, sweep). All mutation is short critical sections under one mutex;
/// no lock is held across an await point.
#[derive(Clone, Default)]
pub(crate) struct RouteRegistry {
    entries: Arc<Mutex<Vec<RouteEntry>>>,
}

impl RouteRegistry {
    /// Creates an empty registry.
    #[inline]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscription entry and returns its handle.
    ///
    /// The subscribe-control frame is NOT sent here; the caller notifies the
    /// event loop, which emits it only while a transport is open. When
    /// disconnected the subscribe is deferred entirely to replay-on-open.
    pub(crate) fn register(
        &self,
        route: impl Into<String>,
        sweep_tx: mpsc::UnboundedSender<()>,
    ) -> RouteHandle {
        let route = route.into();
        let (tx, rx) = mpsc::unbounded_channel();

        self.entries.lock().push(RouteEntry {
            route: route.clone(),
            tx,
            subscribed: false,
        });
        debug!(route = %route, "Route registered");

        RouteHandle {
            route,
            rx,
            sweep_tx,
        }
    }

    /// Delivers a copy of the frame to every entry matching its route.
    ///
    /// Frames without a `route` field match nothing. A closed entry (handle
    /// dropped, sweep not yet run) is silently skipped.
    pub(crate) fn dispatch(&self, frame: &Frame) {
        let Some(route) = frame.route() else {
            return;
        };

        let entries = self.entries.lock();
        for entry in entries.iter().filter(|e| e.route == route) {
            if entry.tx.send(frame.clone()).is_err() {
                trace!(route = %route, "Skipping closed route entry");
            }
        }
    }

    /// Returns the routes of all current entries, in registration order,
    /// marking each as subscribed on the new connection.
    ///
    /// One subscribe-control frame is replayed per entry, so a route
    /// registered twice appears twice.
    #[must_use]
    pub(crate) fn routes_for_replay(&self) -> Vec<String> {
        let mut entries = self.entries.lock();
        entries
            .iter_mut()
            .map(|e| {
                e.subscribed = true;
                e.route.clone()
            })
            .collect()
    }

    /// Returns the routes of entries not yet subscribed on the current
    /// connection, marking them as subscribed.
    ///
    /// Empty whenever replay has already covered every entry.
    #[must_use]
    pub(crate) fn pending_routes(&self) -> Vec<String> {
        let mut entries = self.entries.lock();
        entries
            .iter_mut()
            .filter(|e| !e.subscribed)
            .map(|e| {
                e.subscribed = true;
                e.route.clone()
            })
            .collect()
    }

    /// Removes every entry whose handle has been dropped.
    pub(crate) fn sweep(&self) {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| !e.tx.is_closed());

        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, remaining = entries.len(), "Swept route entries");
        }
    }

    /// Returns the number of live entries.
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

// ============================================================================
// RouteHandle
// ============================================================================

/// Inbound frame sequence for one route subscription.
///
/// Yields every inbound frame whose `route` field matches this
/// subscription's route. The sequence never completes on its own; it ends
/// only when the handle is dropped (or the client is disposed).
///
/// Dropping the handle schedules a registry sweep; until the sweep runs the
/// entry still participates in subscribe-replay bookkeeping.
pub struct RouteHandle {
    route: String,
    rx: mpsc::UnboundedReceiver<Frame>,
    sweep_tx: mpsc::UnboundedSender<()>,
}

impl RouteHandle {
    /// Returns the route this handle is subscribed to.
    #[inline]
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Waits for the next matching inbound frame.
    ///
    /// Returns `None` only after the client has been disposed.
    pub async fn next(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    /// Non-blocking poll for an already-delivered frame.
    pub fn try_next(&mut self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }
}

impl Drop for RouteHandle {
    fn drop(&mut self) {
        // Closes the receiver implicitly; the sweep removes the dead entry
        // on the next turn of the event loop.
        let _ = self.sweep_tx.send(());
    }
}

impl std::fmt::Debug for RouteHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteHandle")
            .field("route", &self.route)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn sweep_channel() -> (
        mpsc::UnboundedSender<()>,
        mpsc::UnboundedReceiver<()>,
    ) {
        mpsc::unbounded_channel()
    }

    #[tokio::test]
    async fn test_dispatch_matches_route() {
        let registry = RouteRegistry::new();
        let (sweep_tx, _sweep_rx) = sweep_channel();

        let mut chat = registry.register("chat", sweep_tx.clone());
        let mut news = registry.register("news", sweep_tx);

        registry.dispatch(&Frame::from(json!({"route": "chat", "n": 1})));

        assert_eq!(
            chat.try_next().unwrap().value(),
            &json!({"route": "chat", "n": 1}),
        );
        assert!(news.try_next().is_none());
    }

    #[tokio::test]
    async fn test_dispatch_fans_out_to_duplicate_routes() {
        let registry = RouteRegistry::new();
        let (sweep_tx, _sweep_rx) = sweep_channel();

        let mut first = registry.register("r", sweep_tx.clone());
        let mut second = registry.register("r", sweep_tx);

        registry.dispatch(&Frame::from(json!({"route": "r", "value": 1})));

        assert!(first.try_next().is_some());
        assert!(second.try_next().is_some());
    }

    #[tokio::test]
    async fn test_dispatch_ignores_unrouted_frames() {
        let registry = RouteRegistry::new();
        let (sweep_tx, _sweep_rx) = sweep_channel();

        let mut handle = registry.register("r", sweep_tx);
        registry.dispatch(&Frame::from(json!({"type": "ping"})));
        registry.dispatch(&Frame::from(json!("bare string")));

        assert!(handle.try_next().is_none());
    }

    #[tokio::test]
    async fn test_replay_routes_in_registration_order() {
        let registry = RouteRegistry::new();
        let (sweep_tx, _sweep_rx) = sweep_channel();

        let _a = registry.register("b", sweep_tx.clone());
        let _b = registry.register("a", sweep_tx.clone());
        let _c = registry.register("b", sweep_tx);

        assert_eq!(registry.routes_for_replay(), vec!["b", "a", "b"]);
    }

    #[tokio::test]
    async fn test_entry_covered_by_replay_is_not_pending() {
        let registry = RouteRegistry::new();
        let (sweep_tx, _sweep_rx) = sweep_channel();

        // Registered before the open completes: the replay snapshot covers
        // it, leaving nothing for the follow-up sync to announce.
        let _a = registry.register("a", sweep_tx.clone());
        assert_eq!(registry.routes_for_replay(), vec!["a"]);
        assert!(registry.pending_routes().is_empty());

        // Registered afterwards: announced exactly once by the sync.
        let _b = registry.register("b", sweep_tx);
        assert_eq!(registry.pending_routes(), vec!["b"]);
        assert!(registry.pending_routes().is_empty());
    }

    #[tokio::test]
    async fn test_drop_schedules_sweep_and_sweep_removes_entry() {
        let registry = RouteRegistry::new();
        let (sweep_tx, mut sweep_rx) = sweep_channel();

        let keep = registry.register("keep", sweep_tx.clone());
        let dropped = registry.register("drop", sweep_tx);
        assert_eq!(registry.len(), 2);

        drop(dropped);
        assert!(sweep_rx.try_recv().is_ok());

        registry.sweep();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.routes_for_replay(), vec!["keep"]);

        drop(keep);
    }
}
