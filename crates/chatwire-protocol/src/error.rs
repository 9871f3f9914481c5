//! Error types for the chat event layer.
//!
//! Parsing an event never fails; the only errors here come from building a
//! registry or from decoding bytes that are not an event object at all.

use thiserror::Error;

/// Errors surfaced by registry construction and wire decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("conflicting constructors registered for event type: {discriminator}")]
    ConflictingRegistration { discriminator: String },
    #[error("event type must not be empty")]
    EmptyDiscriminator,
    #[error("wire payload is not an object: found {0}")]
    NotAnObject(&'static str),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EventError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// Convenience result type for registry and decoding operations.
pub type EventResult<T> = Result<T, EventError>;
