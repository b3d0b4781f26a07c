//! Payment → booking confirmation saga.
//!
//! Orchestrates the flow:
//! 1. Payment succeeds for a booking → request the stay transition to confirmed
//! 2. Stay transitioned to confirmed → complete saga
//!
//! A failed transition (for example the booking was cancelled while the
//! payment settled) records the failure on the saga instance; the payment
//! itself is untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use stayforge_core::{AggregateId, PropertyId};
use stayforge_events::{EventEnvelope, Saga, SagaAction};
use stayforge_lodging::BookingId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentConfirmationState {
    #[default]
    WaitingForPayment,
    Confirming {
        payment_id: String,
    },
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentConfirmationEvent {
    PaymentSucceededReceived { payment_id: String },
    ConfirmationRequested,
    BookingConfirmedReceived,
    SagaCompleted,
    SagaFailed { reason: String },
}

pub struct PaymentConfirmationSaga;

/// Pull a booking id out of an external-tagged event payload.
fn booking_id_in(payload: &JsonValue, variant: &str) -> Option<BookingId> {
    let id_str = payload.as_object()?.get(variant)?.get("booking_id")?.as_str()?;
    let uuid = uuid::Uuid::parse_str(id_str).ok()?;
    Some(BookingId::new(AggregateId::from_uuid(uuid)))
}

impl Saga for PaymentConfirmationSaga {
    type State = PaymentConfirmationState;
    type SagaEvent = PaymentConfirmationEvent;
    type CorrelationId = BookingId;

    fn saga_type() -> &'static str {
        "saga.payment_confirmation"
    }

    fn correlate(envelope: &EventEnvelope<JsonValue>) -> Option<Self::CorrelationId> {
        match envelope.aggregate_type() {
            "payments.payment" => booking_id_in(envelope.payload(), "PaymentSucceeded"),
            "lodging.room" => booking_id_in(envelope.payload(), "StayTransitioned"),
            _ => None,
        }
    }

    fn saga_id(_property_id: PropertyId, correlation: &Self::CorrelationId) -> AggregateId {
        // The booking id doubles as the saga instance id. Booking ids are
        // minted fresh at reserve time, so this stream cannot collide with a
        // room's or a payment's.
        correlation.0
    }

    fn apply(state: &mut Self::State, event: &Self::SagaEvent) {
        match event {
            PaymentConfirmationEvent::PaymentSucceededReceived { payment_id } => {
                *state = PaymentConfirmationState::Confirming {
                    payment_id: payment_id.clone(),
                };
            }
            PaymentConfirmationEvent::ConfirmationRequested => {
                // No state change; waiting for the stay transition
            }
            PaymentConfirmationEvent::BookingConfirmedReceived => {
                *state = PaymentConfirmationState::Completed;
            }
            PaymentConfirmationEvent::SagaCompleted => {
                *state = PaymentConfirmationState::Completed;
            }
            PaymentConfirmationEvent::SagaFailed { .. } => {
                *state = PaymentConfirmationState::Failed;
            }
        }
    }

    fn react(
        state: &Self::State,
        _property_id: PropertyId,
        correlation: &Self::CorrelationId,
        incoming: &EventEnvelope<JsonValue>,
    ) -> Vec<SagaAction> {
        match state {
            PaymentConfirmationState::WaitingForPayment => {
                if incoming.aggregate_type() != "payments.payment" {
                    return vec![];
                }
                let Some(evt) = incoming.payload().get("PaymentSucceeded") else {
                    return vec![];
                };
                let payment_id = evt
                    .get("payment_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();

                vec![
                    SagaAction::Emit {
                        event_type: "payment_succeeded_received".to_string(),
                        payload: serde_json::json!({ "payment_id": payment_id }),
                    },
                    SagaAction::Emit {
                        event_type: "confirmation_requested".to_string(),
                        payload: serde_json::json!({}),
                    },
                    SagaAction::Command {
                        aggregate_type: "lodging.room".to_string(),
                        command_type: "TransitionStay".to_string(),
                        payload: serde_json::json!({
                            "booking_id": correlation.0,
                            "to_status": "confirmed",
                        }),
                    },
                ]
            }
            PaymentConfirmationState::Confirming { .. } => {
                if incoming.aggregate_type() != "lodging.room" {
                    return vec![];
                }
                let Some(evt) = incoming.payload().get("StayTransitioned") else {
                    return vec![];
                };
                if evt.get("to_status").and_then(|v| v.as_str()) != Some("confirmed") {
                    return vec![];
                }

                vec![
                    SagaAction::Emit {
                        event_type: "booking_confirmed_received".to_string(),
                        payload: serde_json::json!({}),
                    },
                    SagaAction::Complete,
                ]
            }
            PaymentConfirmationState::Completed | PaymentConfirmationState::Failed => vec![],
        }
    }
}
