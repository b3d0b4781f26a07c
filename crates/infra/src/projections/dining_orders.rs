//! Dining orders projection.
//!
//! Queryable view of room-service and restaurant orders with their committed
//! line snapshots and lifecycle status.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use stayforge_core::PropertyId;
use stayforge_dining::{DiningOrderEvent, DiningOrderId, DiningOrderStatus};
use stayforge_events::EventEnvelope;
use stayforge_guests::GuestId;
use stayforge_lodging::RoomId;
use stayforge_menu::MenuItemId;

use super::cursor_store::{CursorCheck, ProjectionCursorStore, StreamCursors};
use super::ProjectionError;
use crate::read_model::PropertyStore;

/// One committed order line (immutable price snapshot).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLineView {
    pub line_no: u32,
    pub menu_item_id: MenuItemId,
    pub quantity: i64,
    pub unit_price: u64,
}

/// Queryable dining order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiningOrderReadModel {
    pub order_id: DiningOrderId,
    pub guest_id: Option<GuestId>,
    pub room_id: Option<RoomId>,
    pub status: DiningOrderStatus,
    pub lines: Vec<OrderLineView>,
    pub total_amount: u64,
}

/// Dining orders projection over `dining.order` streams.
pub struct DiningOrdersProjection<S>
where
    S: PropertyStore<DiningOrderId, DiningOrderReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> DiningOrdersProjection<S>
where
    S: PropertyStore<DiningOrderId, DiningOrderReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new("dining.orders"),
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

    pub fn get(
        &self,
        property_id: PropertyId,
        order_id: &DiningOrderId,
    ) -> Option<DiningOrderReadModel> {
        self.store.get(property_id, order_id)
    }

    pub fn list(&self, property_id: PropertyId) -> Vec<DiningOrderReadModel> {
        self.store.list(property_id)
    }

    /// Apply a published envelope into the projection.
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != "dining.order" {
            return Ok(());
        }

        let property_id = envelope.property_id();
        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        if let CursorCheck::Skip = self.cursors.check(property_id, aggregate_id, seq)? {
            return Ok(());
        }

        let ev: DiningOrderEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(format!("dining order event: {e}")))?;

        let (event_property, order_id) = match &ev {
            DiningOrderEvent::OrderOpened(e) => (e.property_id, e.order_id),
            DiningOrderEvent::OrderCompleted(e) => (e.property_id, e.order_id),
            DiningOrderEvent::OrderCancelled(e) => (e.property_id, e.order_id),
        };

        if event_property != property_id {
            return Err(ProjectionError::PropertyIsolation(
                "event property_id does not match envelope property_id".to_string(),
            ));
        }
        if order_id.0 != aggregate_id {
            return Err(ProjectionError::PropertyIsolation(
                "event order_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match ev {
            DiningOrderEvent::OrderOpened(e) => {
                self.store.upsert(
                    property_id,
                    e.order_id,
                    DiningOrderReadModel {
                        order_id: e.order_id,
                        guest_id: e.guest_id,
                        room_id: e.room_id,
                        status: DiningOrderStatus::Pending,
                        lines: e
                            .lines
                            .into_iter()
                            .map(|l| OrderLineView {
                                line_no: l.line_no,
                                menu_item_id: l.menu_item_id,
                                quantity: l.quantity,
                                unit_price: l.unit_price,
                            })
                            .collect(),
                        total_amount: e.total_amount,
                    },
                );
            }
            DiningOrderEvent::OrderCompleted(e) => {
                if let Some(mut rm) = self.store.get(property_id, &e.order_id) {
                    rm.status = DiningOrderStatus::Completed;
                    self.store.upsert(property_id, e.order_id, rm);
                }
            }
            DiningOrderEvent::OrderCancelled(e) => {
                if let Some(mut rm) = self.store.get(property_id, &e.order_id) {
                    rm.status = DiningOrderStatus::Cancelled;
                    self.store.upsert(property_id, e.order_id, rm);
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
