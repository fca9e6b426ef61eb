//! WebSocket transport layer.
//!
//! One physical connection carrying many logical routes.
//!
//! ```text
//! ┌──────────────┐  commands   ┌─────────────────────┐
//! │ RouteSocket  │────────────►│  Event loop (task)  │◄──── WebSocket
//! │  (facade)    │             │  lifecycle + retry  │
//! └──────┬───────┘             └───────┬─────────────┘
//!        │ register                    │ dispatch / replay
//!        ▼                             ▼
//! ┌──────────────┐             ┌─────────────────────┐
//! │ RouteHandle  │◄────────────│   RouteRegistry     │
//! └──────────────┘   fan-out   └─────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `manager` | Connection lifecycle event loop and fixed-delay retry |
//! | `registry` | Route subscription bookkeeping, replay, cleanup |
//! | `streams` | Consumer-facing status and firehose streams |

// ============================================================================
// Submodules
// ============================================================================

/// Connection lifecycle event loop.
pub(crate) mod manager;

/// Route subscription registry.
pub(crate) mod registry;

/// Consumer-facing stream handles.
pub(crate) mod streams;

// ============================================================================
// Re-exports
// ============================================================================

pub use registry::RouteHandle;
pub use streams::{FrameStream, StatusStream};
