use std::collections::HashMap;
use std::sync::RwLock;

use stayforge_core::{AggregateId, ExpectedVersion, PropertyId};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// Streams nested under their property, so property isolation is a matter
/// of which map you can reach rather than a filter that could be forgotten.
type Streams = HashMap<PropertyId, HashMap<AggregateId, Vec<StoredEvent>>>;

/// In-memory append-only event store.
///
/// The default backend for tests and single-node deployments. Each append
/// holds the write lock across the version check and the insert, so
/// concurrent reservations against the same room stream serialize here.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<Streams>,
}

fn poisoned() -> EventStoreError {
    EventStoreError::Storage("event store lock poisoned".to_string())
}

fn version_of(stream: &[StoredEvent]) -> u64 {
    stream.last().map_or(0, |e| e.sequence_number)
}

/// Check that a batch targets exactly one stream and return its identity.
fn batch_identity(
    events: &[UncommittedEvent],
) -> Result<(PropertyId, AggregateId, &str), EventStoreError> {
    let first = &events[0];

    for event in &events[1..] {
        if event.property_id != first.property_id {
            return Err(EventStoreError::PropertyIsolation(
                "batch spans more than one property".to_string(),
            ));
        }
        if event.aggregate_id != first.aggregate_id {
            return Err(EventStoreError::InvalidAppend(
                "batch spans more than one aggregate".to_string(),
            ));
        }
        if event.aggregate_type != first.aggregate_type {
            return Err(EventStoreError::AggregateTypeMismatch(
                "batch mixes aggregate types".to_string(),
            ));
        }
    }

    Ok((first.property_id, first.aggregate_id, &first.aggregate_type))
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot every stored event for a property, in stream order.
    ///
    /// Backs the in-memory [`EventQuery`](super::query::EventQuery)
    /// implementation and projection rebuilds in tests.
    pub fn all_events(&self, property_id: PropertyId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self.streams.read().map_err(|_| poisoned())?;

        let mut events: Vec<StoredEvent> = streams
            .get(&property_id)
            .into_iter()
            .flat_map(|by_aggregate| by_aggregate.values().flatten().cloned())
            .collect();
        events.sort_by_key(|e| (*e.aggregate_id.as_uuid().as_bytes(), e.sequence_number));

        Ok(events)
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        let (property_id, aggregate_id, aggregate_type) = batch_identity(&events)?;
        let aggregate_type = aggregate_type.to_string();

        let mut streams = self.streams.write().map_err(|_| poisoned())?;
        let stream = streams
            .entry(property_id)
            .or_default()
            .entry(aggregate_id)
            .or_default();

        let current = version_of(stream);
        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        // A stream never changes aggregate type after its first event.
        if let Some(existing) = stream.first() {
            if existing.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "stream holds '{}', append carried '{}'",
                    existing.aggregate_type, aggregate_type
                )));
            }
        }

        let committed: Vec<StoredEvent> = events
            .into_iter()
            .enumerate()
            .map(|(offset, e)| StoredEvent {
                event_id: e.event_id,
                property_id: e.property_id,
                aggregate_id: e.aggregate_id,
                aggregate_type: e.aggregate_type,
                sequence_number: current + 1 + offset as u64,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            })
            .collect();

        stream.extend(committed.iter().cloned());

        Ok(committed)
    }

    fn load_stream(
        &self,
        property_id: PropertyId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self.streams.read().map_err(|_| poisoned())?;

        Ok(streams
            .get(&property_id)
            .and_then(|by_aggregate| by_aggregate.get(&aggregate_id))
            .cloned()
            .unwrap_or_default())
    }
}
