use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stayforge_core::{Aggregate, AggregateRoot, AggregateId, DomainError, PropertyId};
use stayforge_events::Event;
use stayforge_guests::GuestId;
use stayforge_lodging::RoomId;
use stayforge_menu::MenuItemId;

/// Dining order identifier (property-scoped via `property_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiningOrderId(pub AggregateId);

impl DiningOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for DiningOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Dining order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiningOrderStatus {
    Pending,
    Completed,
    Cancelled,
}

impl DiningOrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DiningOrderStatus::Completed | DiningOrderStatus::Cancelled)
    }
}

/// Order line as submitted by the caller: menu item, quantity, and the unit
/// price the order desk read from the catalog when building the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderLine {
    pub menu_item_id: MenuItemId,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
}

/// Committed order line: a numbered, immutable price snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub line_no: u32,
    pub menu_item_id: MenuItemId,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
}

/// Aggregate root: DiningOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiningOrder {
    id: DiningOrderId,
    property_id: Option<PropertyId>,
    guest_id: Option<GuestId>,
    room_id: Option<RoomId>,
    status: DiningOrderStatus,
    lines: Vec<OrderLine>,
    total_amount: u64,
    version: u64,
    created: bool,
}

impl DiningOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: DiningOrderId) -> Self {
        Self {
            id,
            property_id: None,
            guest_id: None,
            room_id: None,
            status: DiningOrderStatus::Pending,
            lines: Vec::new(),
            total_amount: 0,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> DiningOrderId {
        self.id
    }

    pub fn property_id(&self) -> Option<PropertyId> {
        self.property_id
    }

    pub fn guest_id(&self) -> Option<GuestId> {
        self.guest_id
    }

    pub fn room_id(&self) -> Option<RoomId> {
        self.room_id
    }

    pub fn status(&self) -> DiningOrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn total_amount(&self) -> u64 {
        self.total_amount
    }
}

impl AggregateRoot for DiningOrder {
    type Id = DiningOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenOrder — create the order with all its lines in one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub property_id: PropertyId,
    pub order_id: DiningOrderId,
    pub guest_id: Option<GuestId>,
    pub room_id: Option<RoomId>,
    pub lines: Vec<NewOrderLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CompleteOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteOrder {
    pub property_id: PropertyId,
    pub order_id: DiningOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub property_id: PropertyId,
    pub order_id: DiningOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiningOrderCommand {
    OpenOrder(OpenOrder),
    CompleteOrder(CompleteOrder),
    CancelOrder(CancelOrder),
}

/// Event: OrderOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderOpened {
    pub property_id: PropertyId,
    pub order_id: DiningOrderId,
    pub guest_id: Option<GuestId>,
    pub room_id: Option<RoomId>,
    pub lines: Vec<OrderLine>,
    pub total_amount: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderCompleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCompleted {
    pub property_id: PropertyId,
    pub order_id: DiningOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub property_id: PropertyId,
    pub order_id: DiningOrderId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiningOrderEvent {
    OrderOpened(OrderOpened),
    OrderCompleted(OrderCompleted),
    OrderCancelled(OrderCancelled),
}

impl Event for DiningOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DiningOrderEvent::OrderOpened(_) => "dining.order.opened",
            DiningOrderEvent::OrderCompleted(_) => "dining.order.completed",
            DiningOrderEvent::OrderCancelled(_) => "dining.order.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DiningOrderEvent::OrderOpened(e) => e.occurred_at,
            DiningOrderEvent::OrderCompleted(e) => e.occurred_at,
            DiningOrderEvent::OrderCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for DiningOrder {
    type Command = DiningOrderCommand;
    type Event = DiningOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            DiningOrderEvent::OrderOpened(e) => {
                self.id = e.order_id;
                self.property_id = Some(e.property_id);
                self.guest_id = e.guest_id;
                self.room_id = e.room_id;
                self.status = DiningOrderStatus::Pending;
                self.lines = e.lines.clone();
                self.total_amount = e.total_amount;
                self.created = true;
            }
            DiningOrderEvent::OrderCompleted(_) => {
                self.status = DiningOrderStatus::Completed;
            }
            DiningOrderEvent::OrderCancelled(_) => {
                self.status = DiningOrderStatus::Cancelled;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            DiningOrderCommand::OpenOrder(cmd) => self.handle_open(cmd),
            DiningOrderCommand::CompleteOrder(cmd) => self.handle_complete(cmd),
            DiningOrderCommand::CancelOrder(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl DiningOrder {
    fn ensure_property(&self, property_id: PropertyId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.property_id != Some(property_id) {
            return Err(DomainError::invariant("property mismatch"));
        }
        Ok(())
    }

    fn ensure_order_id(&self, order_id: DiningOrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_open(&self, cmd: &OpenOrder) -> Result<Vec<DiningOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("order already exists"));
        }

        if cmd.guest_id.is_none() && cmd.room_id.is_none() {
            return Err(DomainError::validation(
                "order must reference a guest or a room",
            ));
        }

        if cmd.lines.is_empty() {
            return Err(DomainError::validation(
                "order must contain at least one line",
            ));
        }

        let mut lines = Vec::with_capacity(cmd.lines.len());
        let mut total_amount: u64 = 0;
        for (idx, line) in cmd.lines.iter().enumerate() {
            if line.quantity <= 0 {
                return Err(DomainError::validation("quantity must be positive"));
            }
            if line.unit_price == 0 {
                return Err(DomainError::validation("unit_price must be positive"));
            }

            let line_total = line
                .unit_price
                .checked_mul(line.quantity as u64)
                .ok_or_else(|| DomainError::validation("line total overflows minor units"))?;
            total_amount = total_amount
                .checked_add(line_total)
                .ok_or_else(|| DomainError::validation("order total overflows minor units"))?;

            lines.push(OrderLine {
                line_no: (idx as u32) + 1,
                menu_item_id: line.menu_item_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
            });
        }

        Ok(vec![DiningOrderEvent::OrderOpened(OrderOpened {
            property_id: cmd.property_id,
            order_id: cmd.order_id,
            guest_id: cmd.guest_id,
            room_id: cmd.room_id,
            lines,
            total_amount,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_complete(
        &self,
        cmd: &CompleteOrder,
    ) -> Result<Vec<DiningOrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_property(cmd.property_id)?;
        self.ensure_order_id(cmd.order_id)?;

        if self.status != DiningOrderStatus::Pending {
            return Err(DomainError::invariant(
                "only pending orders can be completed",
            ));
        }

        Ok(vec![DiningOrderEvent::OrderCompleted(OrderCompleted {
            property_id: cmd.property_id,
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelOrder) -> Result<Vec<DiningOrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_property(cmd.property_id)?;
        self.ensure_order_id(cmd.order_id)?;

        if self.status != DiningOrderStatus::Pending {
            return Err(DomainError::invariant(
                "only pending orders can be cancelled",
            ));
        }

        Ok(vec![DiningOrderEvent::OrderCancelled(OrderCancelled {
            property_id: cmd.property_id,
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
