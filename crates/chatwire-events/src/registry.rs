//! Discriminator to constructor registry.
//!
//! Registration happens on an [`EventRegistryBuilder`] during startup. Once
//! built, an [`EventRegistry`] is frozen: it has no mutation API, so it can be
//! shared across threads and read without locking.

use std::any::TypeId;
use std::sync::OnceLock;

use chatwire_protocol::{
    EventError, EventResult, EventView, GenericEvent, RoomEvent, StateEvent, StructuredPayload,
    TypedEvent,
};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::receipt::ReceiptEvent;
use crate::redaction::RedactionEvent;
use crate::tombstone::RoomTombstoneEvent;

/// Builds the view for an already classified payload. Must not fail.
///
/// The view must report the discriminator it is bound to as its
/// `event_type()`. The base views ([`GenericEvent`], [`RoomEvent`],
/// [`StateEvent`]) read it from the payload's `type`, so they fit under any
/// discriminator; a [`TypedEvent`] reports its `TYPE_ID` and belongs only
/// under that id, which is what [`EventRegistryBuilder::register_typed`] binds.
pub type EventConstructor = fn(StructuredPayload) -> Box<dyn EventView>;

#[derive(Debug, Clone, Copy)]
struct Registration {
    constructor: EventConstructor,
    origin: Option<TypeId>,
}

impl Registration {
    fn same_binding(&self, other: &Registration) -> bool {
        match (self.origin, other.origin) {
            (Some(ours), Some(theirs)) => ours == theirs,
            _ => std::ptr::fn_addr_eq(self.constructor, other.constructor),
        }
    }
}

fn construct<T: TypedEvent>(payload: StructuredPayload) -> Box<dyn EventView> {
    Box::new(T::from_payload(payload))
}

/// Write phase of the registry.
#[derive(Debug, Default)]
pub struct EventRegistryBuilder {
    constructors: IndexMap<String, Registration>,
}

impl EventRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder preloaded with the receipt, redaction and tombstone views.
    pub fn with_core_events() -> Self {
        let mut builder = Self::default();
        builder.bind::<ReceiptEvent>();
        builder.bind::<RedactionEvent>();
        builder.bind::<RoomTombstoneEvent>();
        builder
    }

    /// Add the core views to a builder that may already hold other kinds.
    pub fn register_core_events(&mut self) -> EventResult<()> {
        self.register_typed::<ReceiptEvent>()?;
        self.register_typed::<RedactionEvent>()?;
        self.register_typed::<RoomTombstoneEvent>()
    }

    /// Bind `discriminator` to `constructor`.
    ///
    /// Binding the same constructor twice is a no-op; binding a different
    /// one to a taken discriminator is rejected. `constructor` must build
    /// views that report `discriminator` (see [`EventConstructor`]).
    pub fn register(
        &mut self,
        discriminator: impl Into<String>,
        constructor: EventConstructor,
    ) -> EventResult<()> {
        self.insert(
            discriminator.into(),
            Registration {
                constructor,
                origin: None,
            },
        )
    }

    /// Bind `T::TYPE_ID` to the view `T`.
    pub fn register_typed<T: TypedEvent>(&mut self) -> EventResult<()> {
        self.insert(T::TYPE_ID.to_owned(), Self::typed_registration::<T>())
    }

    pub fn contains(&self, discriminator: &str) -> bool {
        self.constructors.contains_key(discriminator)
    }

    /// Freeze the registry.
    pub fn build(self) -> EventRegistry {
        debug!(event_types = self.constructors.len(), "event registry frozen");
        EventRegistry {
            constructors: self
                .constructors
                .into_iter()
                .map(|(discriminator, registration)| (discriminator, registration.constructor))
                .collect(),
        }
    }

    fn typed_registration<T: TypedEvent>() -> Registration {
        Registration {
            constructor: construct::<T>,
            origin: Some(TypeId::of::<T>()),
        }
    }

    // Only used on an empty builder with distinct core discriminators.
    fn bind<T: TypedEvent>(&mut self) {
        self.constructors
            .insert(T::TYPE_ID.to_owned(), Self::typed_registration::<T>());
    }

    fn insert(&mut self, discriminator: String, registration: Registration) -> EventResult<()> {
        if discriminator.is_empty() {
            warn!("rejected registration of an empty event type");
            return Err(EventError::EmptyDiscriminator);
        }

        if let Some(existing) = self.constructors.get(&discriminator) {
            if existing.same_binding(&registration) {
                trace!(event_type = %discriminator, "event type already registered");
                return Ok(());
            }
            warn!(event_type = %discriminator, "conflicting constructor for event type");
            return Err(EventError::ConflictingRegistration { discriminator });
        }

        debug!(event_type = %discriminator, "event type registered");
        self.constructors.insert(discriminator, registration);
        Ok(())
    }
}

/// Read phase of the registry: a frozen discriminator to constructor table.
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    constructors: IndexMap<String, EventConstructor>,
}

impl EventRegistry {
    pub fn builder() -> EventRegistryBuilder {
        EventRegistryBuilder::new()
    }

    /// Classify `payload` by its `type` and build the bound view.
    ///
    /// Never fails: an unknown or missing `type` yields a [`GenericEvent`]
    /// over the unchanged payload.
    pub fn parse(&self, payload: StructuredPayload) -> Box<dyn EventView> {
        match self.lookup(&payload) {
            Some(constructor) => constructor(payload),
            None => {
                trace!(
                    event_type = payload.get_str("type"),
                    "unrecognized event type, using generic view"
                );
                Box::new(GenericEvent::new(payload))
            }
        }
    }

    /// Like [`parse`](Self::parse) for an arbitrary JSON value. Non-objects
    /// become a generic view over an empty payload.
    pub fn parse_value(&self, value: Value) -> Box<dyn EventView> {
        let payload = StructuredPayload::try_from(value).unwrap_or_else(|error| {
            trace!(%error, "event is not an object, using empty payload");
            StructuredPayload::new()
        });
        self.parse(payload)
    }

    /// Like [`parse`](Self::parse) for events known to come from a room
    /// timeline: unknown kinds fall back to [`StateEvent`] when the payload
    /// has a `state_key`, otherwise to [`RoomEvent`].
    pub fn parse_room_event(&self, payload: StructuredPayload) -> Box<dyn EventView> {
        match self.lookup(&payload) {
            Some(constructor) => constructor(payload),
            None if payload.has_key("state_key") => Box::new(StateEvent::new(payload)),
            None => Box::new(RoomEvent::new(payload)),
        }
    }

    pub fn contains(&self, discriminator: &str) -> bool {
        self.constructors.contains_key(discriminator)
    }

    /// Registered discriminators in registration order.
    pub fn discriminators(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    fn lookup(&self, payload: &StructuredPayload) -> Option<EventConstructor> {
        self.constructors.get(payload.get_str("type")).copied()
    }
}

/// Process-wide registry holding the core views, built on first use.
pub fn core_registry() -> &'static EventRegistry {
    static CORE: OnceLock<EventRegistry> = OnceLock::new();
    CORE.get_or_init(|| EventRegistryBuilder::with_core_events().build())
}

/// Parse with the [`core_registry`].
pub fn parse(payload: StructuredPayload) -> Box<dyn EventView> {
    core_registry().parse(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatwire_protocol::{RoomEventView, StateEventView};
    use serde_json::json;

    fn payload(value: Value) -> StructuredPayload {
        StructuredPayload::try_from(value).unwrap()
    }

    #[derive(Debug)]
    struct TopicEvent {
        payload: StructuredPayload,
    }

    impl EventView for TopicEvent {
        fn event_type(&self) -> &str {
            "m.room.topic"
        }

        fn raw_payload(&self) -> &StructuredPayload {
            &self.payload
        }
    }

    fn topic(payload: StructuredPayload) -> Box<dyn EventView> {
        Box::new(TopicEvent { payload })
    }

    fn generic(payload: StructuredPayload) -> Box<dyn EventView> {
        Box::new(GenericEvent::new(payload))
    }

    #[test]
    fn redaction_with_reason() {
        let event = parse(payload(json!({
            "type": "m.room.redaction",
            "redacts": "$abc",
            "content": {"reason": "spam"}
        })));
        assert_eq!(event.event_type(), "m.room.redaction");
        let redaction = event.downcast_ref::<RedactionEvent>().unwrap();
        assert_eq!(redaction.redacted_event(), "$abc");
        assert_eq!(redaction.reason(), "spam");
    }

    #[test]
    fn redaction_without_target() {
        let event = parse(payload(json!({"type": "m.room.redaction", "content": {}})));
        let redaction = event.downcast_ref::<RedactionEvent>().unwrap();
        assert_eq!(redaction.redacted_event(), "");
        assert_eq!(redaction.reason(), "");
    }

    #[test]
    fn tombstone_with_successor() {
        let event = parse(payload(json!({
            "type": "m.room.tombstone",
            "content": {"body": "upgraded", "replacement_room": "!new:server"}
        })));
        let tombstone = event.downcast_ref::<RoomTombstoneEvent>().unwrap();
        assert_eq!(tombstone.server_message(), "upgraded");
        assert_eq!(tombstone.successor_room_id(), "!new:server");
    }

    #[test]
    fn receipt_for_single_user() {
        let event = parse(payload(json!({
            "type": "m.receipt",
            "$evt1": {"m.read": {"@alice:server": {"ts": 100}}}
        })));
        let receipts = event
            .downcast_ref::<ReceiptEvent>()
            .unwrap()
            .events_with_receipts();
        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].event_id.as_str(), "$evt1");
        assert_eq!(receipts[0].receipts.len(), 1);
        assert_eq!(receipts[0].receipts[0].user_id.as_str(), "@alice:server");
        assert_eq!(receipts[0].receipts[0].timestamp.timestamp_millis(), 100);
    }

    #[test]
    fn unknown_kind_becomes_generic_and_roundtrips() {
        let original = json!({"type": "m.some.unknown.kind", "content": {"x": 1}});
        let event = parse(payload(original.clone()));
        assert!(event.is::<GenericEvent>());
        assert_eq!(event.event_type(), "m.some.unknown.kind");
        assert_eq!(event.to_json(), original);
        assert_eq!(
            serde_json::to_string(event.raw_payload()).unwrap(),
            serde_json::to_string(&original).unwrap()
        );
    }

    #[test]
    fn odd_payloads_never_fail() {
        let registry = core_registry();
        for value in [
            json!({}),
            json!({"type": 17}),
            json!({"type": null, "content": "x"}),
            json!({"type": "m.receipt", "content": 3}),
            json!({"type": "m.room.tombstone", "content": null}),
            json!({"type": ""}),
        ] {
            let event = registry.parse(payload(value.clone()));
            assert_eq!(event.to_json(), value);
        }
        assert!(registry.parse_value(json!([1, 2])).is::<GenericEvent>());
        assert!(registry.parse_value(json!("m.receipt")).raw_payload().is_empty());
    }

    #[test]
    fn discriminator_matches_registration() {
        let registry = core_registry();
        for discriminator in registry.discriminators() {
            let event = registry.parse(payload(json!({"type": discriminator})));
            assert_eq!(event.event_type(), discriminator);
            assert!(!event.is::<GenericEvent>());
        }
        assert_eq!(
            registry.discriminators().collect::<Vec<_>>(),
            vec!["m.receipt", "m.room.redaction", "m.room.tombstone"]
        );
    }

    #[test]
    fn custom_kind_can_be_registered() {
        let mut builder = EventRegistryBuilder::with_core_events();
        builder.register("m.room.topic", topic).unwrap();
        let registry = builder.build();
        assert_eq!(registry.len(), 4);
        let event = registry.parse(payload(json!({"type": "m.room.topic", "content": {}})));
        assert!(event.is::<TopicEvent>());
    }

    #[test]
    fn reregistering_same_constructor_is_noop() {
        let mut builder = EventRegistry::builder();
        builder.register("m.room.topic", topic).unwrap();
        builder.register("m.room.topic", topic).unwrap();
        builder.register_typed::<RedactionEvent>().unwrap();
        builder.register_typed::<RedactionEvent>().unwrap();
        builder.register_core_events().unwrap();
        assert_eq!(builder.build().len(), 4);
    }

    #[test]
    fn conflicting_constructor_is_rejected() {
        let mut builder = EventRegistryBuilder::with_core_events();
        assert_eq!(
            builder.register("m.room.redaction", generic),
            Err(EventError::ConflictingRegistration {
                discriminator: "m.room.redaction".to_owned()
            })
        );
        builder.register("m.room.topic", topic).unwrap();
        assert!(builder.register("m.room.topic", generic).is_err());

        let mut other = EventRegistry::builder();
        other.register(RoomTombstoneEvent::TYPE_ID, generic).unwrap();
        assert!(other.register_core_events().is_err());
    }

    #[test]
    fn empty_discriminator_is_rejected() {
        let mut builder = EventRegistry::builder();
        assert_eq!(
            builder.register("", generic),
            Err(EventError::EmptyDiscriminator)
        );
        assert!(!builder.contains(""));
    }

    #[test]
    fn room_fallbacks_by_shape() {
        let registry = core_registry();
        let state = registry.parse_room_event(payload(json!({
            "type": "m.room.name",
            "state_key": "",
            "event_id": "$n1",
            "content": {"name": "Lobby"}
        })));
        let state = state.downcast_ref::<StateEvent>().unwrap();
        assert!(state.is_state_event());
        assert_eq!(state.event_id().as_str(), "$n1");

        let message = registry.parse_room_event(payload(json!({
            "type": "m.room.message",
            "sender": "@a:s",
            "content": {"body": "hi"}
        })));
        assert_eq!(
            message.downcast_ref::<RoomEvent>().unwrap().sender().as_str(),
            "@a:s"
        );

        let known = registry.parse_room_event(payload(json!({"type": "m.room.redaction"})));
        assert!(known.is::<RedactionEvent>());
    }

    #[test]
    fn frozen_registry_is_shared_across_threads() {
        let registry = EventRegistryBuilder::with_core_events().build();
        std::thread::scope(|scope| {
            for n in 0..4 {
                let registry = &registry;
                scope.spawn(move || {
                    let event = registry.parse(payload(json!({
                        "type": "m.room.redaction",
                        "redacts": format!("$e{n}")
                    })));
                    let redaction = event.downcast_ref::<RedactionEvent>().unwrap();
                    assert_eq!(redaction.redacted_event(), format!("$e{n}"));
                });
            }
        });
    }

    #[test]
    fn base_view_constructors_report_the_bound_discriminator() {
        let mut builder = EventRegistryBuilder::with_core_events();
        builder.register("org.example.note", generic).unwrap();
        let registry = builder.build();
        let event = registry.parse(payload(json!({"type": "org.example.note", "content": {}})));
        assert_eq!(event.event_type(), "org.example.note");
        for discriminator in registry.discriminators() {
            let event = registry.parse(payload(json!({"type": discriminator})));
            assert!(event.is_type(discriminator));
        }
    }

    #[test]
    fn empty_registry_treats_everything_as_generic() {
        let registry = EventRegistry::default();
        assert!(registry.is_empty());
        let event = registry.parse(payload(json!({"type": "m.room.redaction"})));
        assert!(event.is::<GenericEvent>());
        assert_eq!(event.event_type(), "m.room.redaction");
    }
}
