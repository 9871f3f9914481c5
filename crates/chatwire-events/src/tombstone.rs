//! Room deprecation marker (`m.room.tombstone`).

use chatwire_protocol::{
    EventView, RoomEventView, RoomId, StateEventView, StructuredPayload, TypedEvent,
};

/// State event announcing that a room has been replaced by a successor.
///
/// An empty successor is accepted as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomTombstoneEvent {
    payload: StructuredPayload,
}

impl RoomTombstoneEvent {
    /// `content.body`, shown to users of the old room.
    pub fn server_message(&self) -> &str {
        self.payload.get_nested_str("content", "body")
    }

    /// `content.replacement_room`.
    pub fn successor_room_id(&self) -> &str {
        self.payload.get_nested_str("content", "replacement_room")
    }

    pub fn successor_room(&self) -> RoomId {
        RoomId::from(self.successor_room_id())
    }
}

impl EventView for RoomTombstoneEvent {
    fn event_type(&self) -> &str {
        Self::TYPE_ID
    }

    fn raw_payload(&self) -> &StructuredPayload {
        &self.payload
    }
}

impl RoomEventView for RoomTombstoneEvent {}

impl StateEventView for RoomTombstoneEvent {}

impl TypedEvent for RoomTombstoneEvent {
    const TYPE_ID: &'static str = "m.room.tombstone";

    fn from_payload(payload: StructuredPayload) -> Self {
        Self { payload }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn tombstone(value: Value) -> RoomTombstoneEvent {
        RoomTombstoneEvent::from_payload(StructuredPayload::try_from(value).unwrap())
    }

    #[test]
    fn reads_message_and_successor() {
        let event = tombstone(json!({
            "type": "m.room.tombstone",
            "state_key": "",
            "content": {"body": "upgraded", "replacement_room": "!new:server"}
        }));
        assert_eq!(event.server_message(), "upgraded");
        assert_eq!(event.successor_room_id(), "!new:server");
        assert_eq!(event.successor_room().as_str(), "!new:server");
        assert!(event.is_state_event());
        assert_eq!(event.state_key(), "");
    }

    #[test]
    fn missing_content_is_empty() {
        let event = tombstone(json!({"type": "m.room.tombstone"}));
        assert_eq!(event.server_message(), "");
        assert_eq!(event.successor_room_id(), "");
        assert!(event.successor_room().is_empty());
    }

    #[test]
    fn accessors_are_repeatable() {
        let event = tombstone(json!({
            "type": "m.room.tombstone",
            "content": {"body": "moved", "replacement_room": "!b:s"}
        }));
        assert_eq!(event.server_message(), event.server_message());
        assert_eq!(event.successor_room_id(), event.successor_room_id());
    }
}
