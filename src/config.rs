//! Connection configuration.
//!
//! Holds the pending connection target (scheme, host, port, path) and the
//! fixed retry delay. Mutating the configuration never affects a live
//! connection; it is read once per `connect()` call to build the URL.
//!
//! # Example
//!
//! ```
//! use route_socket::ConnectionConfig;
//!
//! let mut config = ConnectionConfig::default();
//! config.host = "localhost".into();
//! config.port = Some(9501);
//! config.path = "/ws".into();
//!
//! let url = config.url().unwrap();
//! assert_eq!(url.as_str(), "ws://localhost:9501/ws");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default WebSocket path.
pub const DEFAULT_PATH: &str = "/ws";

/// Default fixed delay between reconnection attempts (1s).
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Default bound on a single connection attempt (10s).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// ConnectionConfig
// ============================================================================

/// Connection target and retry configuration.
///
/// The scheme is derived from [`secure`](Self::secure): `wss` when `true`,
/// `ws` otherwise. Setters on [`RouteSocket`](crate::RouteSocket) mutate a
/// pending copy of this config; a live connection is never re-targeted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Use `wss` (TLS) instead of `ws`.
    pub secure: bool,

    /// Host name or IP address.
    pub host: String,

    /// Optional port; omitted from the URL when `None`.
    pub port: Option<u16>,

    /// URL path, must start with `/`.
    pub path: String,

    /// Fixed delay between reconnection attempts.
    ///
    /// The delay is configurable but the strategy is deliberately fixed:
    /// no exponential backoff, no maximum attempt count.
    pub retry_delay: Duration,

    /// Bound on a single connection attempt (TCP + handshake).
    ///
    /// An attempt that exceeds this is abandoned and rescheduled like any
    /// other failed open, so a black-holed host cannot stall the client.
    pub connect_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            secure: false,
            host: "localhost".to_string(),
            port: None,
            path: DEFAULT_PATH.to_string(),
            retry_delay: DEFAULT_RETRY_DELAY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    /// Returns the URL scheme derived from the `secure` flag.
    #[inline]
    #[must_use]
    pub const fn scheme(&self) -> &'static str {
        if self.secure { "wss" } else { "ws" }
    }

    /// Builds and validates the connection URL.
    ///
    /// Format: `ws[s]://{host}[:{port}]{path}`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host is empty, the path does not
    /// start with `/`, or the assembled URL does not parse.
    pub fn url(&self) -> Result<Url> {
        if self.host.trim().is_empty() {
            return Err(Error::config(
                "Host is required. Use .set_host() to set it before connect().",
            ));
        }

        if !self.path.starts_with('/') {
            return Err(Error::config(format!(
                "Path must start with '/': {}",
                self.path
            )));
        }

        let mut raw = format!("{}://{}", self.scheme(), self.host);
        if let Some(port) = self.port {
            raw.push_str(&format!(":{port}"));
        }
        raw.push_str(&self.path);

        let url = Url::parse(&raw).map_err(|e| Error::config(format!("Invalid URL {raw}: {e}")))?;

        // Catch hosts like "foo/bar" that parse but shift the path.
        if url.host_str().is_none() {
            return Err(Error::config(format!("Invalid host: {}", self.host)));
        }

        Ok(url)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConnectionConfig::default();
        assert!(!config.secure);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, None);
        assert_eq!(config.path, "/ws");
        assert_eq!(config.retry_delay, Duration::from_millis(1000));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_url_without_port() {
        let config = ConnectionConfig::default();
        assert_eq!(config.url().unwrap().as_str(), "ws://localhost/ws");
    }

    #[test]
    fn test_url_with_port() {
        let config = ConnectionConfig {
            host: "localhost".into(),
            port: Some(9501),
            ..Default::default()
        };
        assert_eq!(config.url().unwrap().as_str(), "ws://localhost:9501/ws");
    }

    #[test]
    fn test_url_secure_scheme() {
        let config = ConnectionConfig {
            secure: true,
            host: "example.com".into(),
            ..Default::default()
        };
        assert_eq!(config.scheme(), "wss");
        assert_eq!(config.url().unwrap().as_str(), "wss://example.com/ws");
    }

    #[test]
    fn test_empty_host_rejected() {
        let config = ConnectionConfig {
            host: "  ".into(),
            ..Default::default()
        };
        let err = config.url().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_relative_path_rejected() {
        let config = ConnectionConfig {
            path: "ws".into(),
            ..Default::default()
        };
        let err = config.url().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
