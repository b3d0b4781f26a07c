//! Storage and wire framing around a domain event payload.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stayforge_core::{AggregateId, PropertyId};

/// A domain event plus the metadata the platform needs to store, replay and
/// fan it out.
///
/// The payload type is generic on purpose: aggregates append their typed
/// events, while projections, sagas and the realtime feed consume
/// `EventEnvelope<serde_json::Value>` so a single subscriber loop can watch
/// every stream at once.
///
/// `property_id` scopes the envelope to one property and is checked on every
/// read and append. `sequence_number` is the 1-based position within the
/// aggregate's stream, assigned by the store when the event is committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    property_id: PropertyId,
    aggregate_id: AggregateId,
    aggregate_type: String,
    sequence_number: u64,
    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        property_id: PropertyId,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            property_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            sequence_number,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn property_id(&self) -> PropertyId {
        self.property_id
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }

    /// Stream family, for example "room" or "dining_order".
    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    /// Position within the aggregate's stream, starting at 1.
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    /// Consume the envelope, keeping only the payload. Used by rehydration
    /// paths that have already routed on the metadata.
    pub fn into_payload(self) -> E {
        self.payload
    }
}
