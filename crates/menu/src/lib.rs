//! `stayforge-menu` — the food and drink catalog.
//!
//! Menu items carry the live price and availability flag that the order
//! desk snapshots into order lines. Orders never read this aggregate after
//! creation; price changes here affect future orders only.

pub mod item;

pub use item::{
    AddMenuItem, ChangeItemPrice, ItemAvailabilityChanged, ItemDetailsUpdated, ItemPriceChanged,
    MenuItem, MenuItemAdded, MenuItemCommand, MenuItemEvent, MenuItemId, SetItemAvailability,
    UpdateItemDetails,
};
