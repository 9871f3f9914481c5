//! The read-only event view contract and the base views.
//!
//! Every event, whatever its kind, is handed out as a `Box<dyn EventView>`.
//! Consumers narrow it with the `is`/`downcast_ref` capability queries on
//! `dyn EventView` rather than matching on a closed enum, so new kinds can be
//! registered without touching existing callers.

use crate::ids::{EventId, RoomId, TransactionId, UserId};
use crate::payload::StructuredPayload;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::any::Any;
use std::fmt;

/// Upcast hook used by the capability queries on `dyn EventView`.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Uniform handle for an event of possibly unknown shape.
pub trait EventView: AsAny + fmt::Debug + Send + Sync + 'static {
    /// The discriminator this event was classified under.
    fn event_type(&self) -> &str;

    /// The full original wire object, kept for lossless forwarding.
    fn raw_payload(&self) -> &StructuredPayload;

    /// The `content` object, or an empty payload.
    fn content(&self) -> StructuredPayload {
        self.raw_payload().nested("content")
    }

    /// The `unsigned` object, or an empty payload.
    fn unsigned(&self) -> StructuredPayload {
        self.raw_payload().nested("unsigned")
    }

    /// Re-serialize the event exactly as it arrived.
    fn to_json(&self) -> Value {
        self.raw_payload().to_value()
    }
}

impl dyn EventView {
    /// Whether this handle is backed by the concrete view `T`.
    pub fn is<T: EventView>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Narrow to the concrete view `T`.
    pub fn downcast_ref<T: EventView>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn is_type(&self, discriminator: &str) -> bool {
        self.event_type() == discriminator
    }
}

/// A view bound to one fixed discriminator.
///
/// `from_payload` must not fail: missing or malformed sub-fields degrade to
/// defaults. The payload has already been classified by the caller.
pub trait TypedEvent: EventView + Sized {
    const TYPE_ID: &'static str;

    fn from_payload(payload: StructuredPayload) -> Self;
}

/// Accessors shared by events that live in a room timeline.
pub trait RoomEventView: EventView {
    fn event_id(&self) -> EventId {
        EventId::from(self.raw_payload().get_str("event_id"))
    }

    fn room_id(&self) -> RoomId {
        RoomId::from(self.raw_payload().get_str("room_id"))
    }

    fn sender(&self) -> UserId {
        UserId::from(self.raw_payload().get_str("sender"))
    }

    fn origin_server_ts(&self) -> DateTime<Utc> {
        self.raw_payload().get_timestamp("origin_server_ts")
    }

    /// Set only on the sender's own echo of a locally sent event.
    fn transaction_id(&self) -> TransactionId {
        TransactionId::from(self.unsigned().get_str("transaction_id"))
    }

    fn redacted_because(&self) -> StructuredPayload {
        self.unsigned().nested("redacted_because")
    }

    fn is_redacted(&self) -> bool {
        self.unsigned()
            .value("redacted_because")
            .is_some_and(Value::is_object)
    }
}

/// Accessors shared by room state events.
pub trait StateEventView: RoomEventView {
    fn state_key(&self) -> &str {
        self.raw_payload().get_str("state_key")
    }

    /// A state event carries `state_key`, even when it is empty.
    fn is_state_event(&self) -> bool {
        self.raw_payload().has_key("state_key")
    }

    /// Previous content from `unsigned`, falling back to the legacy top-level field.
    fn prev_content(&self) -> StructuredPayload {
        let unsigned = self.unsigned();
        if unsigned.has_key("prev_content") {
            unsigned.nested("prev_content")
        } else {
            self.raw_payload().nested("prev_content")
        }
    }
}

/// Fallback view for any payload, including unrecognized kinds.
///
/// A payload without a `type` string gets the empty discriminator.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericEvent {
    event_type: String,
    payload: StructuredPayload,
}

impl GenericEvent {
    pub fn new(payload: StructuredPayload) -> Self {
        Self {
            event_type: payload.get_string("type"),
            payload,
        }
    }

    pub fn into_payload(self) -> StructuredPayload {
        self.payload
    }
}

impl EventView for GenericEvent {
    fn event_type(&self) -> &str {
        &self.event_type
    }

    fn raw_payload(&self) -> &StructuredPayload {
        &self.payload
    }
}

/// Room-scoped view for timeline events of a kind nobody registered.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomEvent {
    event_type: String,
    payload: StructuredPayload,
}

impl RoomEvent {
    pub fn new(payload: StructuredPayload) -> Self {
        Self {
            event_type: payload.get_string("type"),
            payload,
        }
    }
}

impl EventView for RoomEvent {
    fn event_type(&self) -> &str {
        &self.event_type
    }

    fn raw_payload(&self) -> &StructuredPayload {
        &self.payload
    }
}

impl RoomEventView for RoomEvent {}

/// State view for room state events of a kind nobody registered.
#[derive(Debug, Clone, PartialEq)]
pub struct StateEvent {
    event_type: String,
    payload: StructuredPayload,
}

impl StateEvent {
    pub fn new(payload: StructuredPayload) -> Self {
        Self {
            event_type: payload.get_string("type"),
            payload,
        }
    }
}

impl EventView for StateEvent {
    fn event_type(&self) -> &str {
        &self.event_type
    }

    fn raw_payload(&self) -> &StructuredPayload {
        &self.payload
    }
}

impl RoomEventView for StateEvent {}

impl StateEventView for StateEvent {}
