//! Typed event catalog and the discriminator registry that selects it.
//!
//! Wire objects are classified by their `type` field. Registered kinds get a
//! typed view; everything else is kept as a [`GenericEvent`] so it can still be
//! stored and forwarded unchanged.
//!
//! ```no_run
//! use chatwire_events::{RedactionEvent, core_registry};
//! use chatwire_protocol::StructuredPayload;
//!
//! let payload = StructuredPayload::from_json_str(
//!     r#"{"type":"m.room.redaction","redacts":"$abc","content":{"reason":"spam"}}"#,
//! )?;
//! let event = core_registry().parse(payload);
//! if let Some(redaction) = event.downcast_ref::<RedactionEvent>() {
//!     println!("{} redacted: {}", redaction.redacted_event(), redaction.reason());
//! }
//! # Ok::<(), chatwire_protocol::EventError>(())
//! ```

pub mod receipt;
pub mod redaction;
pub mod registry;
pub mod tombstone;

pub use chatwire_protocol::{
    EventView, GenericEvent, RoomEvent, RoomEventView, StateEvent, StateEventView,
    StructuredPayload, TypedEvent,
};
pub use receipt::{EventsWithReceipts, ReceiptEvent, ReceiptsForEvent, UserTimestamp};
pub use redaction::RedactionEvent;
pub use registry::{EventConstructor, EventRegistry, EventRegistryBuilder, core_registry, parse};
pub use tombstone::RoomTombstoneEvent;
