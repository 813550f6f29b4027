use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Decoded sample content.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Bool(bool),
    Number(f64),
}

/// An immutable sample on a channel.
///
/// Two values are coincident iff their timestamps are exactly equal; there is
/// no tolerance window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub payload: Payload,
    /// Source time of the sample (or the time the decision was made for writes)
    pub timestamp: DateTime<Utc>,
}

impl Value {
    pub fn new(payload: Payload, timestamp: DateTime<Utc>) -> Self {
        Self { payload, timestamp }
    }

    pub fn number(value: f64, timestamp: DateTime<Utc>) -> Self {
        Self::new(Payload::Number(value), timestamp)
    }

    pub fn boolean(value: bool, timestamp: DateTime<Utc>) -> Self {
        Self::new(Payload::Bool(value), timestamp)
    }

    /// Numeric view of the payload; booleans map to 1.0 / 0.0.
    pub fn as_f64(&self) -> f64 {
        match self.payload {
            Payload::Number(v) => v,
            Payload::Bool(true) => 1.0,
            Payload::Bool(false) => 0.0,
        }
    }

    /// Boolean view of the payload; any non-zero number is `true`.
    pub fn as_bool(&self) -> bool {
        match self.payload {
            Payload::Bool(b) => b,
            Payload::Number(v) => v != 0.0,
        }
    }

    pub fn is_coincident(&self, other: &Value) -> bool {
        self.timestamp == other.timestamp
    }
}
