use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stayforge_core::{Aggregate, AggregateRoot, AggregateId, DomainError, PropertyId};
use stayforge_events::Event;

/// Menu item identifier (property-scoped via `property_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MenuItemId(pub AggregateId);

impl MenuItemId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for MenuItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: MenuItem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    id: MenuItemId,
    property_id: Option<PropertyId>,
    name: String,
    category: String,
    /// Price in smallest currency unit (e.g., cents).
    price: u64,
    available: bool,
    description: Option<String>,
    version: u64,
    created: bool,
}

impl MenuItem {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: MenuItemId) -> Self {
        Self {
            id,
            property_id: None,
            name: String::new(),
            category: String::new(),
            price: 0,
            available: false,
            description: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> MenuItemId {
        self.id
    }

    pub fn property_id(&self) -> Option<PropertyId> {
        self.property_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn price(&self) -> u64 {
        self.price
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether the item can currently be put on an order.
    pub fn is_available(&self) -> bool {
        self.available
    }
}

impl AggregateRoot for MenuItem {
    type Id = MenuItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: AddMenuItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddMenuItem {
    pub property_id: PropertyId,
    pub item_id: MenuItemId,
    pub name: String,
    pub category: String,
    pub price: u64,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeItemPrice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeItemPrice {
    pub property_id: PropertyId,
    pub item_id: MenuItemId,
    pub price: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetItemAvailability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetItemAvailability {
    pub property_id: PropertyId,
    pub item_id: MenuItemId,
    pub available: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateItemDetails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateItemDetails {
    pub property_id: PropertyId,
    pub item_id: MenuItemId,
    /// Optional new name (if None, keep existing).
    pub name: Option<String>,
    /// Optional new category (if None, keep existing).
    pub category: Option<String>,
    /// Optional new description (if None, keep existing).
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MenuItemCommand {
    AddMenuItem(AddMenuItem),
    ChangeItemPrice(ChangeItemPrice),
    SetItemAvailability(SetItemAvailability),
    UpdateItemDetails(UpdateItemDetails),
}

/// Event: MenuItemAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemAdded {
    pub property_id: PropertyId,
    pub item_id: MenuItemId,
    pub name: String,
    pub category: String,
    pub price: u64,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemPriceChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPriceChanged {
    pub property_id: PropertyId,
    pub item_id: MenuItemId,
    pub price: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemAvailabilityChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAvailabilityChanged {
    pub property_id: PropertyId,
    pub item_id: MenuItemId,
    pub available: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ItemDetailsUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetailsUpdated {
    pub property_id: PropertyId,
    pub item_id: MenuItemId,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MenuItemEvent {
    MenuItemAdded(MenuItemAdded),
    ItemPriceChanged(ItemPriceChanged),
    ItemAvailabilityChanged(ItemAvailabilityChanged),
    ItemDetailsUpdated(ItemDetailsUpdated),
}

impl Event for MenuItemEvent {
    fn event_type(&self) -> &'static str {
        match self {
            MenuItemEvent::MenuItemAdded(_) => "menu.item.added",
            MenuItemEvent::ItemPriceChanged(_) => "menu.item.price_changed",
            MenuItemEvent::ItemAvailabilityChanged(_) => "menu.item.availability_changed",
            MenuItemEvent::ItemDetailsUpdated(_) => "menu.item.details_updated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            MenuItemEvent::MenuItemAdded(e) => e.occurred_at,
            MenuItemEvent::ItemPriceChanged(e) => e.occurred_at,
            MenuItemEvent::ItemAvailabilityChanged(e) => e.occurred_at,
            MenuItemEvent::ItemDetailsUpdated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for MenuItem {
    type Command = MenuItemCommand;
    type Event = MenuItemEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            MenuItemEvent::MenuItemAdded(e) => {
                self.id = e.item_id;
                self.property_id = Some(e.property_id);
                self.name = e.name.clone();
                self.category = e.category.clone();
                self.price = e.price;
                // New items join the menu sellable until kitchen says otherwise.
                self.available = true;
                self.description = e.description.clone();
                self.created = true;
            }
            MenuItemEvent::ItemPriceChanged(e) => {
                self.price = e.price;
            }
            MenuItemEvent::ItemAvailabilityChanged(e) => {
                self.available = e.available;
            }
            MenuItemEvent::ItemDetailsUpdated(e) => {
                self.name = e.name.clone();
                self.category = e.category.clone();
                self.description = e.description.clone();
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            MenuItemCommand::AddMenuItem(cmd) => self.handle_add(cmd),
            MenuItemCommand::ChangeItemPrice(cmd) => self.handle_change_price(cmd),
            MenuItemCommand::SetItemAvailability(cmd) => self.handle_set_availability(cmd),
            MenuItemCommand::UpdateItemDetails(cmd) => self.handle_update_details(cmd),
        }
    }
}

impl MenuItem {
    fn ensure_property(&self, property_id: PropertyId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.property_id != Some(property_id) {
            return Err(DomainError::invariant("property mismatch"));
        }
        Ok(())
    }

    fn ensure_item_id(&self, item_id: MenuItemId) -> Result<(), DomainError> {
        if self.id != item_id {
            return Err(DomainError::invariant("item_id mismatch"));
        }
        Ok(())
    }

    fn handle_add(&self, cmd: &AddMenuItem) -> Result<Vec<MenuItemEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("menu item already exists"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("item name cannot be empty"));
        }

        if cmd.category.trim().is_empty() {
            return Err(DomainError::validation("item category cannot be empty"));
        }

        if cmd.price == 0 {
            return Err(DomainError::validation("item price must be positive"));
        }

        Ok(vec![MenuItemEvent::MenuItemAdded(MenuItemAdded {
            property_id: cmd.property_id,
            item_id: cmd.item_id,
            name: cmd.name.clone(),
            category: cmd.category.clone(),
            price: cmd.price,
            description: cmd.description.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_price(
        &self,
        cmd: &ChangeItemPrice,
    ) -> Result<Vec<MenuItemEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_property(cmd.property_id)?;
        self.ensure_item_id(cmd.item_id)?;

        if cmd.price == 0 {
            return Err(DomainError::validation("item price must be positive"));
        }

        // Committed order lines hold snapshots; this affects future orders only.
        Ok(vec![MenuItemEvent::ItemPriceChanged(ItemPriceChanged {
            property_id: cmd.property_id,
            item_id: cmd.item_id,
            price: cmd.price,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_availability(
        &self,
        cmd: &SetItemAvailability,
    ) -> Result<Vec<MenuItemEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_property(cmd.property_id)?;
        self.ensure_item_id(cmd.item_id)?;

        if self.available == cmd.available {
            return Err(DomainError::conflict(if cmd.available {
                "item is already available"
            } else {
                "item is already unavailable"
            }));
        }

        Ok(vec![MenuItemEvent::ItemAvailabilityChanged(
            ItemAvailabilityChanged {
                property_id: cmd.property_id,
                item_id: cmd.item_id,
                available: cmd.available,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_update_details(
        &self,
        cmd: &UpdateItemDetails,
    ) -> Result<Vec<MenuItemEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_property(cmd.property_id)?;
        self.ensure_item_id(cmd.item_id)?;

        let name = cmd.name.clone().unwrap_or_else(|| self.name.clone());
        if name.trim().is_empty() {
            return Err(DomainError::validation("item name cannot be empty"));
        }

        let category = cmd.category.clone().unwrap_or_else(|| self.category.clone());
        if category.trim().is_empty() {
            return Err(DomainError::validation("item category cannot be empty"));
        }

        let description = cmd.description.clone().or_else(|| self.description.clone());

        Ok(vec![MenuItemEvent::ItemDetailsUpdated(ItemDetailsUpdated {
            property_id: cmd.property_id,
            item_id: cmd.item_id,
            name,
            category,
            description,
            occurred_at: cmd.occurred_at,
        })])
    }
}
