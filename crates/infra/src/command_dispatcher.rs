//! Command execution pipeline for event-sourced aggregates.
//!
//! Every write in the platform funnels through [`CommandDispatcher::dispatch`]:
//! load the aggregate's stream, rehydrate state, let the aggregate decide,
//! append the decided events at the loaded version, publish what committed.
//! The append step is where two racing reservations on the same room are
//! settled. Both writers rehydrate from the same stream version and both
//! produce events, but the store's version check admits exactly one; the
//! loser gets [`DispatchError::Concurrency`] and nothing is written.
//!
//! The dispatcher performs no IO of its own. It composes an [`EventStore`]
//! and an [`EventBus`], so the in-memory pair drives the test suites and the
//! Postgres store slots in for real deployments without touching domain code.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use stayforge_core::{Aggregate, AggregateId, DomainError, ExpectedVersion, PropertyId};
use stayforge_events::{EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Another command committed to this stream first.
    #[error("concurrent update: {0}")]
    Concurrency(String),

    /// The pipeline touched data outside the request's property.
    #[error("property isolation violation: {0}")]
    PropertyIsolation(String),

    /// The aggregate rejected the command's input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The aggregate rejected the command against its current state.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// The aggregate does not exist.
    #[error("not found")]
    NotFound,

    /// A stored payload no longer matches the aggregate's event type.
    #[error("could not rehydrate event: {0}")]
    Deserialize(String),

    /// The event store failed for a reason other than concurrency/isolation.
    #[error("event store: {0}")]
    Store(#[source] EventStoreError),

    /// Publication failed after a successful append. The events are durable;
    /// consumers resync from the store.
    #[error("publish failed: {0}")]
    Publish(String),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match &value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg.clone()),
            EventStoreError::PropertyIsolation(msg) => {
                DispatchError::PropertyIsolation(msg.clone())
            }
            _ => DispatchError::Store(value),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::Conflict(msg) => DispatchError::Concurrency(msg),
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
        }
    }
}

/// Orchestrates load, rehydrate, decide, append and publish for one command.
///
/// All events a command decides go into a single append, so a walk-in's
/// stay claim and room status flip can never half-commit. Publication
/// happens only after the append succeeds; a publish failure leaves the
/// store as the source of truth rather than unwinding the write.
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Run one command against one aggregate instance.
    ///
    /// `make_aggregate` builds the blank aggregate the stream is folded
    /// into, typically something like `Room::empty(id)`; the dispatcher
    /// stays ignorant of concrete aggregate constructors.
    ///
    /// Returns the committed events with their assigned sequence numbers. A
    /// command that decides nothing returns `Ok(vec![])` without touching
    /// the store. A concurrent writer surfaces as
    /// [`DispatchError::Concurrency`]; callers re-dispatch, which reloads
    /// the stream and re-checks the command against the winner's events.
    pub fn dispatch<A>(
        &self,
        property_id: PropertyId,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        command: A::Command,
        make_aggregate: impl FnOnce(PropertyId, AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: stayforge_events::Event + Serialize + DeserializeOwned,
    {
        let history = self.store.load_stream(property_id, aggregate_id)?;

        let mut aggregate = make_aggregate(property_id, aggregate_id);
        let loaded_version = rehydrate::<A>(&mut aggregate, property_id, aggregate_id, &history)?;

        let decided = aggregate.handle(&command).map_err(DispatchError::from)?;
        if decided.is_empty() {
            return Ok(vec![]);
        }

        let aggregate_type = aggregate_type.into();
        let mut uncommitted = Vec::with_capacity(decided.len());
        for event in &decided {
            uncommitted.push(UncommittedEvent::from_typed(
                property_id,
                aggregate_id,
                aggregate_type.clone(),
                Uuid::now_v7(),
                event,
            )?);
        }

        let committed = self
            .store
            .append(uncommitted, ExpectedVersion::Exact(loaded_version))?;

        debug!(
            aggregate_type = %aggregate_type,
            aggregate_id = %aggregate_id,
            committed = committed.len(),
            "command committed"
        );

        for stored in &committed {
            self.bus
                .publish(stored.to_envelope())
                .map_err(|e| DispatchError::Publish(format!("{e:?}")))?;
        }

        Ok(committed)
    }
}

/// Fold a loaded stream into a blank aggregate, returning the stream
/// version the fold ended on.
///
/// Walks the stream once: each event must belong to the requested property
/// and aggregate and must carry the next contiguous sequence number. The
/// stores uphold both already; checking again here means a defective
/// backend fails loudly instead of rehydrating garbage state.
fn rehydrate<A>(
    aggregate: &mut A,
    property_id: PropertyId,
    aggregate_id: AggregateId,
    history: &[StoredEvent],
) -> Result<u64, DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    let mut version = 0u64;

    for stored in history {
        if stored.property_id != property_id || stored.aggregate_id != aggregate_id {
            return Err(DispatchError::PropertyIsolation(
                "loaded stream crossed its property or aggregate boundary".to_string(),
            ));
        }
        if stored.sequence_number != version + 1 {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(
                format!(
                    "stream out of order: expected sequence {}, found {}",
                    version + 1,
                    stored.sequence_number
                ),
            )));
        }

        let event: A::Event = serde_json::from_value(stored.payload.clone())
            .map_err(|e| DispatchError::Deserialize(format!("{}: {e}", stored.event_type)))?;
        aggregate.apply(&event);
        version = stored.sequence_number;
    }

    Ok(version)
}
