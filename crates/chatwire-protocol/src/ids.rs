//! Typed identifiers for protocol entities.
//!
//! IDs are opaque String wrappers (serde-transparent). The server assigns
//! them; this layer never generates or validates sigils.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create from any string value.
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// View as string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

typed_id!(
    /// Server-assigned identifier of an event, e.g. `$abc:server`.
    EventId
);
typed_id!(
    /// Identifier of a room, e.g. `!room:server`.
    RoomId
);
typed_id!(
    /// Fully qualified user identifier, e.g. `@alice:server`.
    UserId
);
typed_id!(
    /// Client-chosen transaction id echoed back in `unsigned`.
    TransactionId
);
