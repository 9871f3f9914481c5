//! Message redaction (`m.room.redaction`).

use chatwire_protocol::{EventId, EventView, RoomEventView, StructuredPayload, TypedEvent};

/// Retraction of a previously sent event.
///
/// Whether the sender may redact the target is not checked here.
#[derive(Debug, Clone, PartialEq)]
pub struct RedactionEvent {
    payload: StructuredPayload,
    redacted_event: String,
    reason: String,
}

impl RedactionEvent {
    /// Id of the retracted event; empty if the payload had no `redacts`.
    pub fn redacted_event(&self) -> &str {
        &self.redacted_event
    }

    pub fn redacted_event_id(&self) -> EventId {
        EventId::from(self.redacted_event.as_str())
    }

    /// Free-form `content.reason`; empty if absent.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl EventView for RedactionEvent {
    fn event_type(&self) -> &str {
        Self::TYPE_ID
    }

    fn raw_payload(&self) -> &StructuredPayload {
        &self.payload
    }
}

impl RoomEventView for RedactionEvent {}

impl TypedEvent for RedactionEvent {
    const TYPE_ID: &'static str = "m.room.redaction";

    fn from_payload(payload: StructuredPayload) -> Self {
        Self {
            redacted_event: payload.get_string("redacts"),
            reason: payload.get_nested_str("content", "reason").to_owned(),
            payload,
        }
    }
}
