//! # chatwire-protocol — event contract for chat protocol clients
//!
//! This crate defines the untyped wire payload, the typed identifiers, and the
//! read-only view contract that every typed event exposes.
//!
//! It is intentionally dependency-light (no logging, no runtime) so it can be
//! used as a pure contract crate by the catalog and by consumers that add
//! their own event kinds.
//!
//! ## Module Overview
//!
//! - [`payload`] — StructuredPayload, the order-preserving wire object with total accessors
//! - [`ids`] — Typed ID wrappers (EventId, RoomId, UserId, TransactionId)
//! - [`view`] — EventView, TypedEvent, RoomEventView, StateEventView and the base views
//! - [`error`] — EventError, EventResult

pub mod error;
pub mod ids;
pub mod payload;
pub mod view;

// Re-export the most commonly used types at the crate root.
pub use error::{EventError, EventResult};
pub use ids::{EventId, RoomId, TransactionId, UserId};
pub use payload::{PayloadValue, StructuredPayload};
pub use view::{
    AsAny, EventView, GenericEvent, RoomEvent, RoomEventView, StateEvent, StateEventView,
    TypedEvent,
};
