//! Store contract plus the two event shapes it traffics in.
//!
//! Every aggregate instance owns one append-only stream, keyed by
//! `(property_id, aggregate_id)`. Sequence numbers run 1, 2, 3 within a
//! stream and never change once assigned; a stream's version is its highest
//! sequence number. Commands write through [`EventStore::append`] under an
//! [`ExpectedVersion`], which makes the append a compare-and-swap on the
//! whole stream. That check is what turns two staff members racing to book
//! the same room into one winner and one [`EventStoreError::Concurrency`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use stayforge_core::{AggregateId, ExpectedVersion, PropertyId};
use std::sync::Arc;

/// How an event store operation can fail.
///
/// These are adapter failures, kept apart from [`stayforge_core::DomainError`]:
/// the domain decides whether a booking is allowed, the store decides whether
/// that decision can still be recorded.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// The stream moved past the expected version. A losing concurrent
    /// reservation surfaces as this.
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    /// A batch or load tried to reach across the property boundary.
    #[error("property isolation violation: {0}")]
    PropertyIsolation(String),

    /// An append targeted an existing stream of a different aggregate type.
    #[error("aggregate type mismatch: {0}")]
    AggregateTypeMismatch(String),

    /// The batch itself was unusable: empty, unserializable, mixed streams.
    #[error("invalid append: {0}")]
    InvalidAppend(String),

    /// The backing store failed (connection, SQL, pool exhaustion).
    #[error("storage error: {0}")]
    Storage(String),
}

/// A domain event serialized and framed for append, before the store has
/// assigned it a position.
///
/// Aggregates emit typed events; the dispatcher turns each into one of
/// these via [`UncommittedEvent::from_typed`], capturing the name, schema
/// version and business timestamp alongside the JSON payload so the event
/// can be rehydrated later without the producing type in scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub property_id: PropertyId,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl UncommittedEvent {
    /// Frame a typed domain event for append.
    pub fn from_typed<E>(
        property_id: PropertyId,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event_id: Uuid,
        event: &E,
    ) -> Result<Self, EventStoreError>
    where
        E: stayforge_events::Event + Serialize,
    {
        let payload = serde_json::to_value(event).map_err(|e| {
            EventStoreError::InvalidAppend(format!(
                "could not serialize {}: {e}",
                event.event_type()
            ))
        })?;

        Ok(Self {
            event_id,
            property_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }
}

/// An event as persisted, with its assigned position in the stream.
///
/// This is what [`EventStore::append`] hands back and what replays return.
/// Projections checkpoint on `sequence_number`, and the dispatcher publishes
/// each stored event to the bus via [`StoredEvent::to_envelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub property_id: PropertyId,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    /// 1-based position within the aggregate stream.
    pub sequence_number: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl StoredEvent {
    /// The stream version this event left behind.
    pub fn stream_version(&self) -> u64 {
        self.sequence_number
    }

    /// Reframe for publication on the event bus.
    pub fn to_envelope(&self) -> stayforge_events::EventEnvelope<JsonValue> {
        stayforge_events::EventEnvelope::new(
            self.event_id,
            self.property_id,
            self.aggregate_id,
            self.aggregate_type.clone(),
            self.sequence_number,
            self.payload.clone(),
        )
    }
}

/// Append-only, property-scoped event store.
///
/// Implementations must keep four promises, in every backend:
///
/// - a batch appends atomically or not at all (a walk-in check-in commits
///   its stay claim and the room status flip as one batch)
/// - the expected version is checked against the stream before any write
/// - sequence numbers continue from the current version with no gaps
/// - nothing ever crosses the property boundary
pub trait EventStore: Send + Sync {
    /// Append a batch to a single aggregate stream.
    ///
    /// All events in the batch must share one `(property_id, aggregate_id,
    /// aggregate_type)`. Returns the stored events with their assigned
    /// sequence numbers.
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Load a full stream in order. An unknown stream is an empty vec, not
    /// an error; rehydration treats it as a brand-new aggregate.
    fn load_stream(
        &self,
        property_id: PropertyId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;
}

/// Stores are shared behind `Arc`; forward so callers stay generic.
impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).append(events, expected_version)
    }

    fn load_stream(
        &self,
        property_id: PropertyId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_stream(property_id, aggregate_id)
    }
}
