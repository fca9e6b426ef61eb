//! Public client facade.
//!
//! [`RouteSocket`] composes the connection event loop, the route registry,
//! and the consumer streams behind one chainable API.
//!
//! # Example
//!
//! ```no_run
//! use route_socket::{Result, RouteSocket};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let socket = RouteSocket::new();
//!     socket
//!         .set_host("localhost")
//!         .set_port(9501)
//!         .set_path("/ws")
//!         .connect()?;
//!
//!     // Subscribe to a route
//!     let mut chat = socket.route("chat/123/message");
//!
//!     // Wait until the connection is up, then send
//!     let mut status = socket.connection_status();
//!     while status.next().await == Some(false) {}
//!     socket.send_to("chat/123/message", json!({"text": "hello"}))?;
//!
//!     while let Some(frame) = chat.next().await {
//!         println!("chat frame: {}", frame.value());
//!     }
//!     Ok(())
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, watch};

use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::protocol::Frame;
use crate::transport::manager::{self, Command};
use crate::transport::registry::RouteRegistry;
use crate::transport::{FrameStream, RouteHandle, StatusStream};

// ============================================================================
// RouteSocket
// ============================================================================

/// Reconnecting, route-multiplexed WebSocket client.
///
/// One `RouteSocket` owns at most one live physical connection at a time and
/// multiplexes any number of logical routes over it. Cloning produces
/// another handle to the same client; the underlying event loop stops when
/// the last clone is dropped, closing the socket and cancelling any pending
/// retry.
///
/// # Thread Safety
///
/// `RouteSocket` is `Send + Sync` and cheap to clone. All lifecycle state
/// transitions are serialized through one owning task.
#[derive(Clone)]
pub struct RouteSocket {
    /// Pending configuration, read once per `connect()` call.
    config: Arc<Mutex<ConnectionConfig>>,
    /// Commands into the event loop.
    command_tx: mpsc::UnboundedSender<Command>,
    /// Sweep scheduling channel handed to route handles.
    sweep_tx: mpsc::UnboundedSender<()>,
    /// Deduplicated connection status.
    status_rx: watch::Receiver<bool>,
    /// Generic inbound firehose.
    broadcast_tx: broadcast::Sender<Frame>,
    /// Route subscription registry (shared with the event loop).
    registry: RouteRegistry,
    /// Lifetime reconnect-attempt counter.
    attempts: Arc<AtomicU64>,
}

impl RouteSocket {
    /// Creates a new client with default configuration and spawns its
    /// event loop.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ConnectionConfig::default())
    }

    /// Creates a new client with the given initial configuration.
    #[must_use]
    pub fn with_config(config: ConnectionConfig) -> Self {
        let registry = RouteRegistry::new();
        let handle = manager::spawn(registry.clone());

        Self {
            config: Arc::new(Mutex::new(config)),
            command_tx: handle.command_tx,
            sweep_tx: handle.sweep_tx,
            status_rx: handle.status_rx,
            broadcast_tx: handle.broadcast_tx,
            registry,
            attempts: handle.attempts,
        }
    }
}

impl Default for RouteSocket {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Chainable setters. Each mutates the pending configuration only; a live
/// connection is never re-targeted before the next `connect()`.
impl RouteSocket {
    /// Sets the host for the next `connect()`.
    pub fn set_host(&self, host: impl Into<String>) -> &Self {
        self.config.lock().host = host.into();
        self
    }

    /// Sets the port for the next `connect()`.
    pub fn set_port(&self, port: u16) -> &Self {
        self.config.lock().port = Some(port);
        self
    }

    /// Sets the URL path for the next `connect()`.
    pub fn set_path(&self, path: impl Into<String>) -> &Self {
        self.config.lock().path = path.into();
        self
    }

    /// Selects `wss` (TLS) or `ws` for the next `connect()`.
    pub fn set_secure(&self, secure: bool) -> &Self {
        self.config.lock().secure = secure;
        self
    }

    /// Sets the fixed delay between reconnection attempts for the next
    /// `connect()`. Defaults to 1000 ms.
    pub fn set_retry_delay(&self, delay: Duration) -> &Self {
        self.config.lock().retry_delay = delay;
        self
    }

    /// Sets the bound on a single connection attempt for the next
    /// `connect()`. Defaults to 10 s.
    ///
    /// An attempt that exceeds the bound is abandoned and retried after the
    /// fixed delay, like any other failed open.
    pub fn set_connect_timeout(&self, timeout: Duration) -> &Self {
        self.config.lock().connect_timeout = timeout;
        self
    }

    /// Returns a copy of the pending configuration.
    #[must_use]
    pub fn config(&self) -> ConnectionConfig {
        self.config.lock().clone()
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

impl RouteSocket {
    /// Connects using the current configuration.
    ///
    /// Closes any existing transport first, then opens a new one and arms
    /// the retry machine. Idempotent: re-invoking while connected tears
    /// down and reopens. The connection is established asynchronously;
    /// observe [`connection_status()`](Self::connection_status) for the
    /// result.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the configuration does not produce a valid URL
    /// - [`Error::ConnectionClosed`] if the client has been disposed
    pub fn connect(&self) -> Result<&Self> {
        let (url, retry_delay, connect_timeout) = {
            let config = self.config.lock();
            (config.url()?, config.retry_delay, config.connect_timeout)
        };

        self.command_tx
            .send(Command::Connect {
                url,
                retry_delay,
                connect_timeout,
            })
            .map_err(|_| Error::ConnectionClosed)?;

        Ok(self)
    }

    /// Disconnects and disables automatic retry.
    ///
    /// Authoritative: cancels any pending retry immediately and no
    /// reconnection occurs until the next explicit `connect()`.
    pub fn disconnect(&self) -> &Self {
        let _ = self.command_tx.send(Command::Disconnect);
        self
    }

    /// Returns `true` while a transport is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        *self.status_rx.borrow()
    }

    /// Returns a deduplicated stream of connection status booleans.
    ///
    /// Yields the current value first, then changes only; the same boolean
    /// is never emitted twice in a row.
    #[must_use]
    pub fn connection_status(&self) -> StatusStream {
        StatusStream::new(self.status_rx.clone())
    }

    /// Returns the lifetime reconnect-attempt counter.
    ///
    /// Monotonic: incremented once per scheduled retry, never reset by a
    /// successful open.
    #[inline]
    #[must_use]
    pub fn reconnect_attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Messaging
// ============================================================================

impl RouteSocket {
    /// Sends a generic frame, transmitted verbatim.
    ///
    /// # Errors
    ///
    /// - [`Error::TransportNotReady`] if no transport is open; the frame is
    ///   never queued for later delivery
    /// - [`Error::ConnectionClosed`] if the client has been disposed
    pub fn send(&self, payload: impl Into<Value>) -> Result<()> {
        self.send_frame(Frame::from(payload.into()))
    }

    /// Sends a route-addressed frame: `data` merged with `{"route": route}`,
    /// the route field winning on key collision.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub fn send_to(&self, route: impl Into<String>, data: Value) -> Result<()> {
        self.send_frame(Frame::routed(route, data))
    }

    fn send_frame(&self, frame: Frame) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::TransportNotReady);
        }

        self.command_tx
            .send(Command::Send(frame))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Returns the unfiltered stream of all inbound frames.
    ///
    /// Each call yields an independent view starting at the moment of the
    /// call; the stream is infinite and never completes on its own.
    #[must_use]
    pub fn receive(&self) -> FrameStream {
        FrameStream::new(self.broadcast_tx.subscribe())
    }

    /// Subscribes to a route and returns its inbound frame sequence.
    ///
    /// While connected, the subscribe-control frame `{"subscribe": route}`
    /// is emitted immediately; while disconnected it is deferred to
    /// replay-on-open. Either way each entry is announced exactly once per
    /// connection. Registering the same route twice yields independent
    /// handles that each receive a copy of every matching frame.
    #[must_use]
    pub fn route(&self, route: impl Into<String>) -> RouteHandle {
        let handle = self.registry.register(route.into(), self.sweep_tx.clone());
        let _ = self.command_tx.send(Command::SyncRoutes);
        handle
    }
}

impl std::fmt::Debug for RouteSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteSocket")
            .field("connected", &self.is_connected())
            .field("routes", &self.registry.len())
            .field("attempts", &self.reconnect_attempts())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
