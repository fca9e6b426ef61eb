//! Wire protocol envelope types.
//!
//! One text frame per message, each carrying an arbitrary JSON value with
//! two reserved optional fields:
//!
//! | Frame kind | Direction | Shape |
//! |------------|-----------|-------|
//! | Subscribe control | client → server | `{"subscribe": route}` |
//! | Route data | either | `{"route": route, ...fields}` |
//! | Generic data | either | arbitrary JSON value |
//!
//! Everything outside the two reserved fields is application payload; the
//! client never assumes a schema beyond them.

// ============================================================================
// Submodules
// ============================================================================

/// Frame envelope over an opaque JSON value.
pub mod frame;

// ============================================================================
// Re-exports
// ============================================================================

pub use frame::Frame;
