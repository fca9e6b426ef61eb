//! Frame envelope over an opaque JSON value.
//!
//! A [`Frame`] wraps one JSON value exchanged over the connection. Two field
//! names are reserved on object frames:
//!
//! - `route` — present on route-addressed data frames
//! - `subscribe` — present only on control frames registering a route
//!
//! # Format
//!
//! Subscribe control:
//! ```json
//! {"subscribe": "chat/123/message"}
//! ```
//!
//! Route data:
//! ```json
//! {"route": "chat/123/message", "text": "hello"}
//! ```
//!
//! Generic data frames carry any JSON value and are not inspected.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Reserved field naming the target route on data frames.
pub const ROUTE_FIELD: &str = "route";

/// Reserved field naming the route on subscribe-control frames.
pub const SUBSCRIBE_FIELD: &str = "subscribe";

// ============================================================================
// Frame
// ============================================================================

/// One discrete structured message exchanged over the connection.
///
/// Transparent wrapper around a [`serde_json::Value`]; serializes to exactly
/// the wrapped value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frame(Value);

impl Frame {
    /// Creates a subscribe-control frame: `{"subscribe": route}`.
    #[inline]
    #[must_use]
    pub fn subscribe(route: impl Into<String>) -> Self {
        Self(json!({ SUBSCRIBE_FIELD: route.into() }))
    }

    /// Creates a route-addressed data frame: `data` merged with
    /// `{"route": route}`.
    ///
    /// The `route` field wins on key collision. Non-object `data` has no
    /// fields to merge, so the result is the bare `{"route": route}` frame.
    #[must_use]
    pub fn routed(route: impl Into<String>, data: Value) -> Self {
        let mut map = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        map.insert(ROUTE_FIELD.to_string(), Value::String(route.into()));
        Self(Value::Object(map))
    }

    /// Parses a frame from wire text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedFrame`] if the text is not valid JSON.
    pub fn from_text(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::malformed_frame(e.to_string()))
    }

    /// Serializes the frame to wire text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    #[inline]
    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Returns the target route of a route-addressed data frame.
    #[inline]
    #[must_use]
    pub fn route(&self) -> Option<&str> {
        self.0.get(ROUTE_FIELD).and_then(Value::as_str)
    }

    /// Returns the route of a subscribe-control frame.
    #[inline]
    #[must_use]
    pub fn subscribe_route(&self) -> Option<&str> {
        self.0.get(SUBSCRIBE_FIELD).and_then(Value::as_str)
    }

    /// Returns a payload field by name, if the frame is an object.
    #[inline]
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Returns the wrapped JSON value.
    #[inline]
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.0
    }

    /// Consumes the frame, returning the wrapped JSON value.
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for Frame {
    #[inline]
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<Frame> for Value {
    #[inline]
    fn from(frame: Frame) -> Self {
        frame.0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_subscribe_frame_shape() {
        let frame = Frame::subscribe("test");
        assert_eq!(frame.to_text().unwrap(), r#"{"subscribe":"test"}"#);
        assert_eq!(frame.subscribe_route(), Some("test"));
        assert_eq!(frame.route(), None);
    }

    #[test]
    fn test_routed_merges_data() {
        let frame = Frame::routed("chat", json!({"text": "hi"}));
        assert_eq!(frame.route(), Some("chat"));
        assert_eq!(frame.get("text"), Some(&json!("hi")));
        assert_eq!(
            frame.value(),
            &json!({"route": "chat", "text": "hi"}),
        );
    }

    #[test]
    fn test_routed_route_wins_on_collision() {
        let frame = Frame::routed("chat", json!({"route": "other", "n": 1}));
        assert_eq!(frame.route(), Some("chat"));
        assert_eq!(frame.get("n"), Some(&json!(1)));
    }

    #[test]
    fn test_routed_non_object_data() {
        let frame = Frame::routed("chat", json!(42));
        assert_eq!(frame.value(), &json!({"route": "chat"}));
    }

    #[test]
    fn test_generic_frame_verbatim() {
        let frame = Frame::from(json!({"type": "echo", "message": "hello-123"}));
        assert_eq!(
            frame.to_text().unwrap(),
            r#"{"message":"hello-123","type":"echo"}"#,
        );
        assert_eq!(frame.route(), None);
    }

    #[test]
    fn test_from_text_valid() {
        let frame = Frame::from_text(r#"{"route":"test","value":1}"#).unwrap();
        assert_eq!(frame.route(), Some("test"));
        assert_eq!(frame.get("value"), Some(&json!(1)));
    }

    #[test]
    fn test_from_text_malformed() {
        let err = Frame::from_text("{not json").unwrap_err();
        assert!(matches!(err, Error::MalformedFrame { .. }));
    }

    #[test]
    fn test_non_string_route_ignored() {
        let frame = Frame::from(json!({"route": 7}));
        assert_eq!(frame.route(), None);
    }

    proptest! {
        // The route field always wins, whatever payload keys collide.
        #[test]
        fn prop_routed_route_always_wins(
            route in "[a-z/0-9]{1,20}",
            keys in proptest::collection::vec("[a-z]{1,8}", 0..5),
        ) {
            let mut data = Map::new();
            for (i, key) in keys.into_iter().enumerate() {
                data.insert(key, json!(i));
            }
            data.insert("route".to_string(), json!("collision"));

            let frame = Frame::routed(route.clone(), Value::Object(data));
            prop_assert_eq!(frame.route(), Some(route.as_str()));
        }
    }
}
