//! Process-manager contract for multi-aggregate workflows.
//!
//! A saga watches the event feed and drives follow-up work that no single
//! aggregate owns. The canonical example here is payment confirmation: a
//! payment succeeding should move the linked booking to confirmed, but the
//! payment aggregate cannot reach into the booking's stream. The saga
//! correlates the two and issues the command instead.
//!
//! Sagas hold no hidden state. Their own progress is persisted as events in
//! the ordinary event store, under a deterministic aggregate id derived from
//! the correlation id, so a restart rebuilds every in-flight instance the
//! same way aggregates are rehydrated. The runner in the infra crate owns
//! loading, applying and dispatching; this module only defines the contract.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as JsonValue;

use stayforge_core::{AggregateId, PropertyId};

use crate::EventEnvelope;

/// What a saga wants done in response to an incoming domain event.
///
/// Actions must be safe to deliver more than once; the bus is at-least-once
/// and the runner does not deduplicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SagaAction {
    /// Record progress by appending a saga event to this instance's stream.
    Emit {
        event_type: String,
        payload: JsonValue,
    },
    /// Dispatch a command to another aggregate.
    Command {
        aggregate_type: String,
        command_type: String,
        payload: JsonValue,
    },
    /// This instance is finished; the runner appends a terminal event.
    Complete,
}

/// A saga definition: correlation, state machine and reactions.
///
/// All methods are associated functions. A saga carries no instance data of
/// its own; state lives in `Self::State` and is rebuilt from stored saga
/// events before every reaction.
pub trait Saga: Send + Sync + 'static {
    /// Explicit state machine for one instance. Serialized when persisted,
    /// `Default` is the never-seen-anything starting point.
    type State: Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Events this saga appends about itself.
    type SagaEvent: Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Key that groups related domain events into one instance, for example
    /// the booking id shared by a payment and its stay.
    type CorrelationId: Clone + Send + Sync + 'static;

    /// Stable identifier, used as the stream's aggregate_type
    /// (for example "saga.payment_confirmation").
    fn saga_type() -> &'static str;

    /// Pull a correlation id out of a domain event. `None` means the event
    /// is not this saga's business and the runner moves on.
    fn correlate(envelope: &EventEnvelope<JsonValue>) -> Option<Self::CorrelationId>;

    /// Deterministic stream id for the instance. Must be stable per
    /// (property, correlation) so replays find the same stream.
    fn saga_id(property_id: PropertyId, correlation: &Self::CorrelationId) -> AggregateId;

    /// State for an instance that has no stored events yet.
    fn initial_state(_property_id: PropertyId, _correlation: &Self::CorrelationId) -> Self::State {
        Self::State::default()
    }

    /// Fold one stored saga event into the state.
    fn apply(state: &mut Self::State, event: &Self::SagaEvent);

    /// Decide what to do about an incoming domain event, given the rebuilt
    /// state. Returning an empty vec means the event changes nothing.
    fn react(
        state: &Self::State,
        property_id: PropertyId,
        correlation: &Self::CorrelationId,
        incoming: &EventEnvelope<JsonValue>,
    ) -> Vec<SagaAction>;
}
