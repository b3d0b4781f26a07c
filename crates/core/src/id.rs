//! Strongly-typed identifiers used across the domain.
//!
//! Each id wraps a UUID without exposing it structurally, so a staff id can
//! never be handed to something expecting a property id. Fresh ids use
//! UUIDv7, which sorts by creation time in logs and storage.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident, $label:literal) => {
        $(#[$doc])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Mint a fresh, time-ordered identifier. Tests that need
            /// determinism should pass an explicit UUID instead.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::from_str(s)
                    .map(Self)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {e}", $label)))
            }
        }
    };
}

uuid_id! {
    /// Scopes every stream, read model row and request to one hotel
    /// property. Nothing crosses this boundary.
    PropertyId, "property id"
}

uuid_id! {
    /// The staff member acting on a request, recorded for attribution.
    StaffId, "staff id"
}

uuid_id! {
    /// Stream identity of an aggregate root (room, guest, booking, ...).
    AggregateId, "aggregate id"
}
