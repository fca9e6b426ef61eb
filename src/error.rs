//! Error types for the route-multiplexed WebSocket client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use route_socket::{Result, RouteSocket};
//!
//! fn example(socket: &RouteSocket) -> Result<()> {
//!     socket.send(serde_json::json!({"type": "ping"}))?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::ConnectionClosed`], [`Error::TransportNotReady`] |
//! | Protocol | [`Error::MalformedFrame`] |
//! | External | [`Error::Json`], [`Error::WebSocket`] |
//!
//! Transport-level failures (abnormal close, socket error) are *not* part of
//! this taxonomy as far as consumers are concerned: they are absorbed by the
//! fixed-delay retry loop and only show up on the connection status stream.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when the connection configuration (host, port, path) is
    /// invalid at `connect()` time.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Send attempted while no transport is open.
    ///
    /// Frames are never queued for later delivery; the caller must wait for
    /// the status stream to report a live connection.
    #[error("Transport not ready: no open connection")]
    TransportNotReady,

    /// Connection handle is closed.
    ///
    /// Returned when the client has been disposed and its event loop
    /// is no longer running.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Inbound frame could not be parsed as structured data.
    ///
    /// Reported through the diagnostic log by the dispatch loop; surfaced
    /// directly only by [`Frame::from_text`](crate::Frame::from_text).
    #[error("Malformed frame: {message}")]
    MalformedFrame {
        /// Description of the parse failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a malformed frame error.
    #[inline]
    pub fn malformed_frame(message: impl Into<String>) -> Self {
        Self::MalformedFrame {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::TransportNotReady | Self::ConnectionClosed | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error may succeed on retry.
    ///
    /// `TransportNotReady` clears once the retry loop re-establishes the
    /// connection; configuration and frame errors do not.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::TransportNotReady | Self::WebSocket(_))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::malformed_frame("unexpected end of input");
        assert_eq!(err.to_string(), "Malformed frame: unexpected end of input");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("empty host");
        assert_eq!(err.to_string(), "Configuration error: empty host");
    }

    #[test]
    fn test_transport_not_ready_display() {
        let err = Error::TransportNotReady;
        assert_eq!(err.to_string(), "Transport not ready: no open connection");
    }

    #[test]
    fn test_is_connection_error() {
        let not_ready = Error::TransportNotReady;
        let closed = Error::ConnectionClosed;
        let config = Error::config("test");

        assert!(not_ready.is_connection_error());
        assert!(closed.is_connection_error());
        assert!(!config.is_connection_error());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::TransportNotReady.is_recoverable());
        assert!(!Error::config("test").is_recoverable());
        assert!(!Error::malformed_frame("not json").is_recoverable());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
