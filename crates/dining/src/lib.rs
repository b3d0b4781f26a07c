//! `stayforge-dining` — room-service and restaurant orders.
//!
//! An order is opened complete: every line arrives with a unit price the
//! order desk snapshotted from the menu at that instant, and the whole
//! order commits or nothing does. Later menu price changes never touch a
//! committed order.

pub mod order;

pub use order::{
    CancelOrder, CompleteOrder, DiningOrder, DiningOrderCommand, DiningOrderEvent, DiningOrderId,
    DiningOrderStatus, NewOrderLine, OpenOrder, OrderCancelled, OrderCompleted, OrderLine,
    OrderOpened,
};
