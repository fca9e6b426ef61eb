//! Connection lifecycle event loop.
//!
//! One spawned tokio task owns the WebSocket, the retry timer, and all
//! lifecycle state; the facade talks to it over a command channel. Because
//! a single task performs every state transition, no locking is needed for
//! lifecycle state and event ordering is exactly arrival order.
//!
//! # Event Loop
//!
//! The task multiplexes four sources with `select!`:
//!
//! - Commands from the facade (connect, disconnect, send, subscribe)
//! - Inbound frames from the socket (pending while disconnected)
//! - The single retry deadline (pending while none is armed)
//! - Sweep requests from dropped route handles
//!
//! # Retry
//!
//! On an unexpected close or error the loop publishes `false` on the status
//! channel, increments the lifetime attempt counter, and arms one deadline
//! of the configured fixed delay before reopening the same URL. Retries are
//! unbounded with no escalation; this is a deliberate simplicity choice.
//! An explicit disconnect clears the connect target, so it is authoritative:
//! nothing reconnects until the next explicit connect.
//!
//! # Replay
//!
//! Immediately after every successful open, one subscribe-control frame is
//! sent per registered route entry (registration order, duplicates
//! included) *before* the status channel flips to `true`. A consumer that
//! sends in reaction to the open therefore always runs after replay, and
//! since this same task reads inbound frames, replay also completes before
//! any inbound frame of the new connection generation is dispatched.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::protocol::Frame;

use super::registry::RouteRegistry;

// ============================================================================
// Constants
// ============================================================================

/// Capacity of the generic inbound broadcast channel.
///
/// A consumer that falls further behind skips frames; see
/// [`FrameStream`](super::streams::FrameStream).
const BROADCAST_CAPACITY: usize = 256;

// ============================================================================
// Types
// ============================================================================

/// Client-side WebSocket stream (plain or TLS).
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Commands from the facade to the event loop.
pub(crate) enum Command {
    /// Tear down any existing transport and open `url`.
    Connect {
        url: Url,
        retry_delay: Duration,
        connect_timeout: Duration,
    },
    /// Close the transport and disable automatic retry.
    Disconnect,
    /// Transmit one outbound frame.
    Send(Frame),
    /// Announce any route entries not yet subscribed on the current
    /// connection, if one is open. Deferred to replay otherwise.
    SyncRoutes,
}

/// Handles returned by [`spawn`] for the facade to hold.
pub(crate) struct ManagerHandle {
    pub(crate) command_tx: mpsc::UnboundedSender<Command>,
    pub(crate) sweep_tx: mpsc::UnboundedSender<()>,
    pub(crate) status_rx: watch::Receiver<bool>,
    pub(crate) broadcast_tx: broadcast::Sender<Frame>,
    pub(crate) attempts: Arc<AtomicU64>,
}

/// Outcome of one `select!` turn, extracted so handlers can borrow the
/// whole loop state mutably.
enum LoopEvent {
    Command(Option<Command>),
    Sweep,
    Inbound(Option<Result<Message, WsError>>),
    RetryElapsed,
}

/// Connect target captured at `connect()` time.
///
/// Retries reuse this snapshot; configuration changes apply only to the
/// next explicit connect.
#[derive(Clone)]
struct Target {
    url: Url,
    retry_delay: Duration,
    connect_timeout: Duration,
}

// ============================================================================
// Spawn
// ============================================================================

/// Spawns the connection event loop and returns the facade handles.
pub(crate) fn spawn(registry: RouteRegistry) -> ManagerHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (sweep_tx, sweep_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = watch::channel(false);
    let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
    let attempts = Arc::new(AtomicU64::new(0));

    let event_loop = EventLoop {
        registry,
        status_tx,
        broadcast_tx: broadcast_tx.clone(),
        attempts: Arc::clone(&attempts),
        socket: None,
        target: None,
        retry_at: None,
    };

    tokio::spawn(event_loop.run(command_rx, sweep_rx));

    ManagerHandle {
        command_tx,
        sweep_tx,
        status_rx,
        broadcast_tx,
        attempts,
    }
}

// ============================================================================
// EventLoop
// ============================================================================

struct EventLoop {
    registry: RouteRegistry,
    status_tx: watch::Sender<bool>,
    broadcast_tx: broadcast::Sender<Frame>,
    /// Lifetime reconnect-attempt counter; monotonic, never reset.
    attempts: Arc<AtomicU64>,
    /// The live transport. At most one exists per client.
    socket: Option<WsStream>,
    /// Current connect target; `None` after disconnect (retry disabled).
    target: Option<Target>,
    /// The single pending retry deadline, if armed.
    retry_at: Option<Instant>,
}

impl EventLoop {
    /// Runs until every facade clone has been dropped.
    async fn run(
        mut self,
        mut command_rx: mpsc::UnboundedReceiver<Command>,
        mut sweep_rx: mpsc::UnboundedReceiver<()>,
    ) {
        loop {
            let event = tokio::select! {
                command = command_rx.recv() => LoopEvent::Command(command),
                Some(()) = sweep_rx.recv() => LoopEvent::Sweep,
                message = Self::next_inbound(&mut self.socket) => LoopEvent::Inbound(message),
                () = Self::retry_deadline(self.retry_at) => LoopEvent::RetryElapsed,
            };

            match event {
                LoopEvent::Command(Some(Command::Connect {
                    url,
                    retry_delay,
                    connect_timeout,
                })) => {
                    self.handle_connect(Target {
                        url,
                        retry_delay,
                        connect_timeout,
                    })
                    .await;
                }
                LoopEvent::Command(Some(Command::Disconnect)) => {
                    self.handle_disconnect().await;
                }
                LoopEvent::Command(Some(Command::Send(frame))) => {
                    self.send_frame(frame).await;
                }
                LoopEvent::Command(Some(Command::SyncRoutes)) => {
                    self.sync_routes().await;
                }
                LoopEvent::Command(None) => {
                    debug!("Client disposed; stopping event loop");
                    break;
                }
                LoopEvent::Sweep => self.registry.sweep(),
                LoopEvent::Inbound(message) => self.handle_inbound(message).await,
                LoopEvent::RetryElapsed => {
                    self.retry_at = None;
                    self.try_open().await;
                }
            }
        }

        // Disposal: release the socket; the retry deadline dies with us.
        self.close_socket().await;
        debug!("Event loop terminated");
    }

    /// Resolves with the next inbound message, or never while disconnected.
    async fn next_inbound(socket: &mut Option<WsStream>) -> Option<Result<Message, WsError>> {
        match socket.as_mut() {
            Some(stream) => stream.next().await,
            None => std::future::pending().await,
        }
    }

    /// Resolves when the retry deadline elapses, or never if none is armed.
    async fn retry_deadline(retry_at: Option<Instant>) {
        match retry_at {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Handles an explicit connect: tear down, re-target, open.
    ///
    /// Idempotent; connecting while connected reopens with the new target.
    async fn handle_connect(&mut self, target: Target) {
        if self.socket.is_some() {
            self.close_socket().await;
            self.publish_status(false);
        }
        self.retry_at = None;
        self.target = Some(target);
        self.try_open().await;
    }

    /// Handles an explicit disconnect: terminal for the current session.
    ///
    /// Clears the connect target so no retry fires until the next explicit
    /// connect, and cancels any pending retry deadline immediately.
    async fn handle_disconnect(&mut self) {
        self.target = None;
        self.retry_at = None;
        self.close_socket().await;
        self.publish_status(false);
        debug!("Disconnected; automatic retry disabled");
    }

    /// Attempts to open the current target. No-op when disconnected.
    ///
    /// The open is bounded by the configured connect timeout, so a
    /// black-holed host cannot stall command processing for longer than
    /// that; a timed-out attempt is rescheduled like any other failure.
    async fn try_open(&mut self) {
        let Some(target) = self.target.clone() else {
            return;
        };

        debug!(url = %target.url, "Opening connection");
        let opened = tokio::time::timeout(
            target.connect_timeout,
            connect_async(target.url.as_str()),
        )
        .await;

        match opened {
            Ok(Ok((stream, _response))) => {
                self.socket = Some(stream);
                info!(url = %target.url, "Connection open");

                // Replay precedes the status flip so consumers reacting to
                // `true` observe their subscriptions already registered.
                self.replay_subscriptions().await;

                // A replay send failure recycles the socket; only a
                // connection that survived replay is ready.
                if self.socket.is_some() {
                    self.publish_status(true);
                }
            }
            Ok(Err(e)) => {
                warn!(url = %target.url, error = %e, "Connection attempt failed");
                self.schedule_retry();
            }
            Err(_) => {
                warn!(
                    url = %target.url,
                    timeout_ms = target.connect_timeout.as_millis() as u64,
                    "Connection attempt timed out"
                );
                self.schedule_retry();
            }
        }
    }

    /// Arms the single fixed-delay retry deadline.
    ///
    /// Publishes `false`, bumps the lifetime attempt counter, and schedules
    /// one reopen. Unbounded: there is no maximum attempt count.
    fn schedule_retry(&mut self) {
        let Some(target) = &self.target else {
            // Closure originated from disconnect(); retry is inhibited.
            return;
        };

        self.publish_status(false);
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        self.retry_at = Some(Instant::now() + target.retry_delay);

        debug!(
            attempt,
            delay_ms = target.retry_delay.as_millis() as u64,
            "Retry scheduled"
        );
    }

    /// Closes and releases the live socket, if any.
    async fn close_socket(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None).await;
        }
    }

    /// Publishes a status value, deduplicated: observers never see the same
    /// boolean twice in a row.
    fn publish_status(&self, connected: bool) {
        self.status_tx.send_if_modified(|current| {
            if *current == connected {
                false
            } else {
                *current = connected;
                true
            }
        });
    }

    // ------------------------------------------------------------------------
    // Outbound
    // ------------------------------------------------------------------------

    /// Sends one subscribe-control frame per registered entry, in
    /// registration order, duplicates included.
    ///
    /// Marks every entry as subscribed on this connection, so an entry
    /// registered while the open was in flight is not announced a second
    /// time by the follow-up [`Command::SyncRoutes`].
    async fn replay_subscriptions(&mut self) {
        let routes = self.registry.routes_for_replay();
        if routes.is_empty() {
            return;
        }

        debug!(count = routes.len(), "Replaying route subscriptions");
        for route in routes {
            self.send_frame(Frame::subscribe(route)).await;
        }
    }

    /// Emits subscribe-control frames for entries not yet announced on the
    /// current connection.
    ///
    /// Never attempts a send on an absent transport: while disconnected the
    /// subscribe is deferred entirely to replay-on-open.
    async fn sync_routes(&mut self) {
        if self.socket.is_none() {
            trace!("Subscribe deferred to replay-on-open");
            return;
        }

        for route in self.registry.pending_routes() {
            self.send_frame(Frame::subscribe(route)).await;
        }
    }

    /// Transmits one frame; a send failure recycles the connection.
    ///
    /// Frames are never queued: with no open transport the frame is dropped
    /// with a diagnostic. The facade rejects sends with `TransportNotReady`
    /// up front, so this only absorbs the race with a concurrent close.
    async fn send_frame(&mut self, frame: Frame) {
        let Some(socket) = self.socket.as_mut() else {
            warn!("Dropping outbound frame: no open transport");
            return;
        };

        let text = match frame.to_text() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to serialize outbound frame");
                return;
            }
        };

        if let Err(e) = socket.send(Message::text(text)).await {
            warn!(error = %e, "Send failed; recycling connection");
            self.socket = None;
            self.schedule_retry();
        }
    }

    // ------------------------------------------------------------------------
    // Inbound
    // ------------------------------------------------------------------------

    /// Handles one inbound socket event.
    async fn handle_inbound(&mut self, message: Option<Result<Message, WsError>>) {
        match message {
            Some(Ok(Message::Text(text))) => self.dispatch(text.as_str()),

            Some(Ok(Message::Close(_))) => {
                debug!("Connection closed by remote");
                self.socket = None;
                self.schedule_retry();
            }

            // Binary frames are not part of the protocol; Ping/Pong are
            // handled by tungstenite.
            Some(Ok(_)) => {}

            Some(Err(e)) => {
                error!(error = %e, "WebSocket error");
                self.socket = None;
                self.schedule_retry();
            }

            None => {
                debug!("WebSocket stream ended");
                self.socket = None;
                self.schedule_retry();
            }
        }
    }

    /// Demultiplexes one inbound text frame.
    ///
    /// The frame goes unconditionally to the generic channel, then a copy to
    /// every matching route entry, synchronously within this one event.
    /// Malformed frames are reported through the diagnostic log and skipped;
    /// they never terminate the connection or the dispatch loop.
    fn dispatch(&self, text: &str) {
        let frame = match Frame::from_text(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Discarding malformed inbound frame");
                return;
            }
        };

        trace!(route = frame.route().unwrap_or("<generic>"), "Frame received");

        // Errors only mean no receive() consumer exists right now.
        let _ = self.broadcast_tx.send(frame.clone());

        self.registry.dispatch(&frame);
    }
}
