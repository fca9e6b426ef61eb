//! route-socket - Reconnecting, route-multiplexed WebSocket client.
//!
//! This library maintains a single persistent, automatically-reconnecting
//! WebSocket connection and multiplexes many logical "routes" of traffic
//! over it. Consumers subscribe to named routes and receive only frames
//! tagged for that route, plus an optional unfiltered firehose of all
//! inbound frames; outbound frames may be route-addressed or generic.
//!
//! # Architecture
//!
//! One spawned task owns the socket, the retry timer, and all lifecycle
//! state; everything else is channels:
//!
//! - [`RouteSocket`] - public facade: chainable configuration,
//!   connect/disconnect/send, stream accessors
//! - Event loop - lifecycle state machine, fixed-delay unbounded retry,
//!   subscribe replay after every (re)connect, inbound demultiplexing
//! - Route registry - per-subscription fan-out channels, eventual cleanup
//!
//! Key design points:
//!
//! - At most one live physical connection per client
//! - Deduplicated status stream (never the same boolean twice in a row)
//! - Subscribe-control frames replayed for every registered route, in
//!   registration order, on every successful (re)connect
//! - Transport failures absorbed by retry, never surfaced as hard errors
//!
//! # Quick Start
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
//!         .connect()?;
//!
//!     // Route-filtered subscription
//!     let mut chat = socket.route("chat/123/message");
//!
//!     // Generic firehose
//!     let mut all = socket.receive();
//!
//!     tokio::spawn(async move {
//!         while let Some(frame) = all.next().await {
//!             println!("inbound: {}", frame.value());
//!         }
//!     });
//!
//!     while let Some(frame) = chat.next().await {
//!         println!("chat: {}", frame.value());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Public facade: [`RouteSocket`] |
//! | [`config`] | Connection target and retry configuration |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`protocol`] | Wire envelope: [`Frame`] |
//! | [`transport`] | Event loop, route registry, stream handles (internal) |

// ============================================================================
// Modules
// ============================================================================

/// Public client facade.
pub mod client;

/// Connection configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Wire protocol envelope types.
pub mod protocol;

/// WebSocket transport layer.
///
/// Internal module holding the connection event loop and route registry.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::RouteSocket;

// Configuration types
pub use config::ConnectionConfig;

// Error types
pub use error::{Error, Result};

// Protocol types
pub use protocol::Frame;

// Stream handles
pub use transport::{FrameStream, RouteHandle, StatusStream};
