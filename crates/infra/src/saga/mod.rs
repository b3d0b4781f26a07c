//! Saga infrastructure: persistence, command execution, and the runner.
//!
//! Saga instances are ordinary event streams. Each instance is keyed by a
//! deterministic aggregate id derived from its correlation id, with the saga
//! type as the stream's aggregate type, so the event store's property scoping
//! and optimistic concurrency apply to saga state like any other stream.

pub mod payment_confirmation;

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use stayforge_core::{AggregateId, PropertyId};
use stayforge_events::{EventEnvelope, Saga, SagaAction};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

pub use payment_confirmation::PaymentConfirmationSaga;

/// Repository for persisting saga events via the event store.
pub struct SagaRepository<S: Saga, E: EventStore> {
    event_store: E,
    _phantom: std::marker::PhantomData<S>,
}

impl<S: Saga, E: EventStore> SagaRepository<S, E> {
    pub fn new(event_store: E) -> Self {
        Self {
            event_store,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Load saga event history for a saga instance.
    pub fn load(
        &self,
        property_id: PropertyId,
        saga_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        self.event_store.load_stream(property_id, saga_id)
    }

    /// Append a saga event (Emit action).
    pub fn append_emit(
        &self,
        property_id: PropertyId,
        saga_id: AggregateId,
        event_type: &str,
        payload: JsonValue,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let uncommitted = UncommittedEvent {
            event_id: uuid::Uuid::now_v7(),
            property_id,
            aggregate_id: saga_id,
            aggregate_type: S::saga_type().to_string(),
            event_type: event_type.to_string(),
            event_version: 1,
            occurred_at: chrono::Utc::now(),
            payload,
        };
        self.event_store
            .append(vec![uncommitted], stayforge_core::ExpectedVersion::Any)
    }
}

/// Command executor trait for saga actions.
///
/// Implementations resolve the target aggregate from the command payload and
/// dispatch through the regular command pipeline.
pub trait CommandExecutor: Send + Sync {
    type Error: std::fmt::Debug;

    fn execute(
        &self,
        property_id: PropertyId,
        aggregate_type: &str,
        command_type: &str,
        payload: &JsonValue,
    ) -> Result<(), Self::Error>;
}

/// Saga runner error.
#[derive(Debug, thiserror::Error)]
pub enum SagaRunnerError {
    #[error("saga store error: {0}")]
    Store(#[from] EventStoreError),
    #[error("failed to deserialize saga event: {0}")]
    Deserialize(String),
    #[error("saga command failed: {0}")]
    Command(String),
}

/// Drives a saga: correlates incoming envelopes, rehydrates instance state,
/// reacts, and executes the resulting actions.
pub struct SagaRunner<S: Saga, E: EventStore, X: CommandExecutor> {
    repository: SagaRepository<S, E>,
    executor: X,
}

impl<S: Saga, E: EventStore, X: CommandExecutor> SagaRunner<S, E, X> {
    pub fn new(event_store: E, executor: X) -> Self {
        Self {
            repository: SagaRepository::new(event_store),
            executor,
        }
    }

    /// Feed one published envelope through the saga.
    ///
    /// Envelopes that do not correlate to an instance are ignored. A failed
    /// command action records a `saga_failed` event on the instance before the
    /// error is returned, so the instance lands in its failed state rather
    /// than retrying forever.
    pub fn handle_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), SagaRunnerError> {
        let Some(correlation) = S::correlate(envelope) else {
            return Ok(());
        };

        let property_id = envelope.property_id();
        let saga_id = S::saga_id(property_id, &correlation);

        let history = self.repository.load(property_id, saga_id)?;
        let mut state = S::initial_state(property_id, &correlation);
        for stored in &history {
            let ev = rehydrate_saga_event::<S>(stored)?;
            S::apply(&mut state, &ev);
        }

        let actions = S::react(&state, property_id, &correlation, envelope);
        if actions.is_empty() {
            return Ok(());
        }

        debug!(
            saga_type = S::saga_type(),
            saga_id = %saga_id,
            actions = actions.len(),
            "saga reacting"
        );

        for action in actions {
            match action {
                SagaAction::Emit {
                    event_type,
                    payload,
                } => {
                    self.repository
                        .append_emit(property_id, saga_id, &event_type, payload)?;
                }
                SagaAction::Command {
                    aggregate_type,
                    command_type,
                    payload,
                } => {
                    if let Err(err) =
                        self.executor
                            .execute(property_id, &aggregate_type, &command_type, &payload)
                    {
                        let reason = format!("{command_type}: {err:?}");
                        warn!(
                            saga_type = S::saga_type(),
                            saga_id = %saga_id,
                            error = %reason,
                            "saga command failed"
                        );
                        self.repository.append_emit(
                            property_id,
                            saga_id,
                            "saga_failed",
                            serde_json::json!({ "reason": reason }),
                        )?;
                        return Err(SagaRunnerError::Command(reason));
                    }
                }
                SagaAction::Complete => {
                    self.repository.append_emit(
                        property_id,
                        saga_id,
                        "saga_completed",
                        serde_json::json!({}),
                    )?;
                }
            }
        }

        Ok(())
    }
}

/// Rebuild a typed saga event from its stored form.
///
/// `append_emit` stores the serde tag as the row's event_type and the variant
/// fields as the payload; folding the tag back in restores the tagged value.
fn rehydrate_saga_event<S: Saga>(stored: &StoredEvent) -> Result<S::SagaEvent, SagaRunnerError> {
    let mut value = stored.payload.clone();
    match value.as_object_mut() {
        Some(obj) => {
            obj.insert(
                "type".to_string(),
                JsonValue::String(stored.event_type.clone()),
            );
        }
        None => {
            value = serde_json::json!({ "type": stored.event_type });
        }
    }
    serde_json::from_value(value).map_err(|e| {
        SagaRunnerError::Deserialize(format!("{} (event_type={})", e, stored.event_type))
    })
}
