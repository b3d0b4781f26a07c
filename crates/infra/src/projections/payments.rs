//! Payments ledger projection.
//!
//! Flat per-property ledger of recorded payments and their settlement status,
//! linked back to the booking or dining order they settle.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use stayforge_core::PropertyId;
use stayforge_dining::DiningOrderId;
use stayforge_events::EventEnvelope;
use stayforge_lodging::BookingId;
use stayforge_payments::{PaymentEvent, PaymentId, PaymentMethod, PaymentStatus};

use super::cursor_store::{CursorCheck, ProjectionCursorStore, StreamCursors};
use super::ProjectionError;
use crate::read_model::PropertyStore;

/// Queryable payment record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReadModel {
    pub payment_id: PaymentId,
    pub amount: u64,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub booking_id: Option<BookingId>,
    pub order_id: Option<DiningOrderId>,
    pub status: PaymentStatus,
}

/// Payments projection over `payments.payment` streams.
pub struct PaymentsProjection<S>
where
    S: PropertyStore<PaymentId, PaymentReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> PaymentsProjection<S>
where
    S: PropertyStore<PaymentId, PaymentReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new("payments.ledger"),
        }
    }

    pub fn with_persistent_cursors(
        self,
        cursor_store: Arc<dyn ProjectionCursorStore>,
        projection_name: impl Into<String>,
    ) -> Self {
        Self {
            store: self.store,
            cursors: StreamCursors::with_persistent(projection_name, cursor_store),
        }
    }

    pub fn get(&self, property_id: PropertyId, payment_id: &PaymentId) -> Option<PaymentReadModel> {
        self.store.get(property_id, payment_id)
    }

    pub fn list(&self, property_id: PropertyId) -> Vec<PaymentReadModel> {
        self.store.list(property_id)
    }

    /// Apply a published envelope into the projection.
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != "payments.payment" {
            return Ok(());
        }

        let property_id = envelope.property_id();
        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        if let CursorCheck::Skip = self.cursors.check(property_id, aggregate_id, seq)? {
            return Ok(());
        }

        let ev: PaymentEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(format!("payment event: {e}")))?;

        let (event_property, payment_id) = match &ev {
            PaymentEvent::PaymentRecorded(e) => (e.property_id, e.payment_id),
            PaymentEvent::PaymentSucceeded(e) => (e.property_id, e.payment_id),
            PaymentEvent::PaymentFailed(e) => (e.property_id, e.payment_id),
        };

        if event_property != property_id {
            return Err(ProjectionError::PropertyIsolation(
                "event property_id does not match envelope property_id".to_string(),
            ));
        }
        if payment_id.0 != aggregate_id {
            return Err(ProjectionError::PropertyIsolation(
                "event payment_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match ev {
            PaymentEvent::PaymentRecorded(e) => {
                self.store.upsert(
                    property_id,
                    e.payment_id,
                    PaymentReadModel {
                        payment_id: e.payment_id,
                        amount: e.amount,
                        method: e.method,
                        reference: e.reference,
                        booking_id: e.booking_id,
                        order_id: e.order_id,
                        status: PaymentStatus::Pending,
                    },
                );
            }
            PaymentEvent::PaymentSucceeded(e) => {
                if let Some(mut rm) = self.store.get(property_id, &e.payment_id) {
                    rm.status = PaymentStatus::Succeeded;
                    self.store.upsert(property_id, e.payment_id, rm);
                }
            }
            PaymentEvent::PaymentFailed(e) => {
                if let Some(mut rm) = self.store.get(property_id, &e.payment_id) {
                    rm.status = PaymentStatus::Failed;
                    self.store.upsert(property_id, e.payment_id, rm);
                }
            }
        }

        self.cursors.advance(property_id, aggregate_id, seq);
        Ok(())
    }

    /// Rebuild the read model from scratch by replaying envelopes.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), ProjectionError> {
        let mut envs: Vec<_> = envelopes.into_iter().collect();

        for property in super::distinct_properties(&envs) {
            self.store.clear_property(property);
            self.cursors.clear(property);
        }

        super::sort_for_replay(&mut envs);

        for env in &envs {
            self.apply_envelope(env)?;
        }
        Ok(())
    }
}
