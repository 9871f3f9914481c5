//! The untyped wire object every event is recovered from.
//!
//! `StructuredPayload` is an immutable, order-preserving JSON object. All of
//! its accessors are total: an absent or mistyped key yields a documented
//! default instead of an error. Every event view relies on this to stay
//! infallible on malformed input.

use crate::error::{EventError, EventResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Immutable, order-preserving key/value document received from the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredPayload(Map<String, Value>);

/// A type that can be read out of a payload value.
///
/// Returning `None` means "absent or mistyped"; callers substitute their
/// default in that case.
pub trait PayloadValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

impl PayloadValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(ToOwned::to_owned)
    }
}

impl PayloadValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl PayloadValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|float| float.trunc() as i64))
    }
}

impl PayloadValue for u64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_u64().or_else(|| {
            value
                .as_f64()
                .filter(|float| *float >= 0.0)
                .map(|float| float.trunc() as u64)
        })
    }
}

impl PayloadValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

/// Numbers are milliseconds since the UNIX epoch.
impl PayloadValue for DateTime<Utc> {
    fn from_value(value: &Value) -> Option<Self> {
        i64::from_value(value).and_then(DateTime::from_timestamp_millis)
    }
}

impl PayloadValue for StructuredPayload {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_object().cloned().map(Self)
    }
}

impl PayloadValue for Vec<Value> {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_array().cloned()
    }
}

impl PayloadValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl StructuredPayload {
    /// An empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a payload from JSON text. Anything but an object is rejected.
    pub fn from_json_str(text: &str) -> EventResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::try_from(value)
    }

    /// Decode a payload from JSON bytes. Anything but an object is rejected.
    pub fn from_json_slice(bytes: &[u8]) -> EventResult<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::try_from(value)
    }

    /// Read `key` as `T`, or return `default` when it is absent or mistyped.
    pub fn get<T: PayloadValue>(&self, key: &str, default: T) -> T {
        self.0.get(key).and_then(T::from_value).unwrap_or(default)
    }

    /// Borrow a string value; `""` when absent or not a string.
    pub fn get_str(&self, key: &str) -> &str {
        self.0.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    /// Borrow a string inside a nested object; `""` when any step is missing.
    pub fn get_nested_str(&self, object: &str, key: &str) -> &str {
        self.0
            .get(object)
            .and_then(|inner| inner.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn get_string(&self, key: &str) -> String {
        self.get_str(key).to_owned()
    }

    /// Integer value; `0` when absent or not a number.
    pub fn get_i64(&self, key: &str) -> i64 {
        self.get(key, 0)
    }

    /// Millisecond timestamp; the UNIX epoch when absent or not a number.
    pub fn get_timestamp(&self, key: &str) -> DateTime<Utc> {
        self.get(key, DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Nested object; an empty payload when absent or not an object.
    pub fn nested(&self, key: &str) -> StructuredPayload {
        self.0
            .get(key)
            .and_then(Value::as_object)
            .map(|object| Self(object.clone()))
            .unwrap_or_default()
    }

    /// Array value; empty when absent or not an array.
    pub fn sequence(&self, key: &str) -> Vec<Value> {
        self.get(key, Vec::new())
    }

    /// Borrow the raw value under `key`, if any.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Keys in wire order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Entries in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for StructuredPayload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for StructuredPayload {
    type Error = EventError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(EventError::NotAnObject(value_kind(&other))),
        }
    }
}

impl From<StructuredPayload> for Value {
    fn from(payload: StructuredPayload) -> Self {
        payload.into_value()
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
