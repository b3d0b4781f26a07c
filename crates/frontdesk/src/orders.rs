//! Dining order intake.
//!
//! The desk prices every requested line from the live menu, then opens the
//! order in a single commit. The aggregate re-checks shape (a guest or a
//! room, at least one line, positive quantities) so a malformed request
//! never half-commits.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value as JsonValue;

use stayforge_core::{AggregateId, PropertyId};
use stayforge_dining::{
    CancelOrder, CompleteOrder, DiningOrder, DiningOrderCommand, DiningOrderEvent, DiningOrderId,
    DiningOrderStatus, NewOrderLine, OpenOrder, OrderLine,
};
use stayforge_events::{EventBus, EventEnvelope};
use stayforge_guests::GuestId;
use stayforge_infra::command_dispatcher::{CommandDispatcher, DispatchError};
use stayforge_infra::event_store::{EventStore, StoredEvent};
use stayforge_infra::projections::menu_items::{MenuItemReadModel, MenuItemsProjection};
use stayforge_infra::read_model::PropertyStore;
use stayforge_lodging::RoomId;
use stayforge_menu::MenuItemId;

use crate::error::FrontdeskError;

/// One requested line: the caller names the item, the desk prices it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLineRequest {
    pub menu_item_id: MenuItemId,
    pub quantity: i64,
}

/// A dining order as submitted from the floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOrderRequest {
    pub guest_id: Option<GuestId>,
    pub room_id: Option<RoomId>,
    pub lines: Vec<OrderLineRequest>,
}

/// What actually committed: priced lines and the order total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReceipt {
    pub order_id: DiningOrderId,
    pub guest_id: Option<GuestId>,
    pub room_id: Option<RoomId>,
    pub lines: Vec<OrderLine>,
    pub total_amount: u64,
    pub status: DiningOrderStatus,
}

pub struct OrderDesk<S, B, MS>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    MS: PropertyStore<MenuItemId, MenuItemReadModel>,
{
    dispatcher: Arc<CommandDispatcher<S, B>>,
    menu: Arc<MenuItemsProjection<MS>>,
}

impl<S, B, MS> OrderDesk<S, B, MS>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    MS: PropertyStore<MenuItemId, MenuItemReadModel>,
{
    pub fn new(
        dispatcher: Arc<CommandDispatcher<S, B>>,
        menu: Arc<MenuItemsProjection<MS>>,
    ) -> Self {
        Self { dispatcher, menu }
    }

    /// Open an order, snapshotting each line's unit price from the menu.
    ///
    /// Every named item must exist and be available; otherwise the whole
    /// order is rejected and nothing is written. Later menu changes do not
    /// touch the committed lines.
    pub fn open_order(
        &self,
        property_id: PropertyId,
        request: OpenOrderRequest,
    ) -> Result<OrderReceipt, FrontdeskError> {
        let mut lines = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let item = self.menu.get(property_id, &line.menu_item_id).ok_or_else(|| {
                FrontdeskError::NotFound(format!("menu item {} not found", line.menu_item_id))
            })?;
            if !item.available {
                return Err(FrontdeskError::Validation(format!(
                    "menu item '{}' is not available",
                    item.name
                )));
            }
            lines.push(NewOrderLine {
                menu_item_id: line.menu_item_id,
                quantity: line.quantity,
                unit_price: item.price,
            });
        }

        let order_id = DiningOrderId::new(AggregateId::new());
        let command = DiningOrderCommand::OpenOrder(OpenOrder {
            property_id,
            order_id,
            guest_id: request.guest_id,
            room_id: request.room_id,
            lines,
            occurred_at: Utc::now(),
        });
        let stored = self.dispatcher.dispatch(
            property_id,
            order_id.0,
            "dining.order",
            command,
            |_, id| DiningOrder::empty(DiningOrderId::new(id)),
        )?;

        receipt_from_opened(&stored)
    }

    /// Move a pending order to completed or cancelled.
    pub fn transition_order(
        &self,
        property_id: PropertyId,
        order_id: DiningOrderId,
        target: DiningOrderStatus,
    ) -> Result<DiningOrderStatus, FrontdeskError> {
        let command = match target {
            DiningOrderStatus::Completed => DiningOrderCommand::CompleteOrder(CompleteOrder {
                property_id,
                order_id,
                occurred_at: Utc::now(),
            }),
            DiningOrderStatus::Cancelled => DiningOrderCommand::CancelOrder(CancelOrder {
                property_id,
                order_id,
                occurred_at: Utc::now(),
            }),
            DiningOrderStatus::Pending => {
                return Err(FrontdeskError::Validation(
                    "an order cannot return to pending".to_string(),
                ));
            }
        };

        self.dispatcher
            .dispatch(property_id, order_id.0, "dining.order", command, |_, id| {
                DiningOrder::empty(DiningOrderId::new(id))
            })
            .map_err(|err| match err {
                DispatchError::NotFound => {
                    FrontdeskError::NotFound("order not found".to_string())
                }
                other => other.into(),
            })?;
        Ok(target)
    }
}

fn receipt_from_opened(stored: &[StoredEvent]) -> Result<OrderReceipt, FrontdeskError> {
    let first = stored.first().ok_or_else(|| {
        FrontdeskError::Internal("order commit produced no events".to_string())
    })?;
    let event: DiningOrderEvent = serde_json::from_value(first.payload.clone())
        .map_err(|e| FrontdeskError::Internal(format!("stored order event failed to decode: {e}")))?;
    match event {
        DiningOrderEvent::OrderOpened(opened) => Ok(OrderReceipt {
            order_id: opened.order_id,
            guest_id: opened.guest_id,
            room_id: opened.room_id,
            lines: opened.lines,
            total_amount: opened.total_amount,
            status: DiningOrderStatus::Pending,
        }),
        other => Err(FrontdeskError::Internal(format!(
            "unexpected first order event: {other:?}"
        ))),
    }
}
