//! Menu catalog projection.
//!
//! The order desk prices new orders from this catalog: item lookups, the
//! availability flag, and the unit price that gets snapshotted into order
//! lines all come from here.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use stayforge_core::PropertyId;
use stayforge_events::EventEnvelope;
use stayforge_menu::{MenuItemEvent, MenuItemId};

use super::cursor_store::{CursorCheck, ProjectionCursorStore, StreamCursors};
use super::ProjectionError;
use crate::read_model::PropertyStore;

/// Queryable menu catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItemReadModel {
    pub item_id: MenuItemId,
    pub name: String,
    pub category: String,
    /// Price in smallest currency unit (e.g., cents).
    pub price: u64,
    pub available: bool,
    pub description: Option<String>,
}

/// Menu catalog projection over `menu.item` streams.
pub struct MenuItemsProjection<S>
where
    S: PropertyStore<MenuItemId, MenuItemReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> MenuItemsProjection<S>
where
    S: PropertyStore<MenuItemId, MenuItemReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new("menu.items"),
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

    pub fn get(&self, property_id: PropertyId, item_id: &MenuItemId) -> Option<MenuItemReadModel> {
        self.store.get(property_id, item_id)
    }

    pub fn list(&self, property_id: PropertyId) -> Vec<MenuItemReadModel> {
        self.store.list(property_id)
    }

    /// Apply a published envelope into the projection.
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != "menu.item" {
            return Ok(());
        }

        let property_id = envelope.property_id();
        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        if let CursorCheck::Skip = self.cursors.check(property_id, aggregate_id, seq)? {
            return Ok(());
        }

        let ev: MenuItemEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(format!("menu item event: {e}")))?;

        let (event_property, item_id) = match &ev {
            MenuItemEvent::MenuItemAdded(e) => (e.property_id, e.item_id),
            MenuItemEvent::ItemPriceChanged(e) => (e.property_id, e.item_id),
            MenuItemEvent::ItemAvailabilityChanged(e) => (e.property_id, e.item_id),
            MenuItemEvent::ItemDetailsUpdated(e) => (e.property_id, e.item_id),
        };

        if event_property != property_id {
            return Err(ProjectionError::PropertyIsolation(
                "event property_id does not match envelope property_id".to_string(),
            ));
        }
        if item_id.0 != aggregate_id {
            return Err(ProjectionError::PropertyIsolation(
                "event item_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match ev {
            MenuItemEvent::MenuItemAdded(e) => {
                self.store.upsert(
                    property_id,
                    e.item_id,
                    MenuItemReadModel {
                        item_id: e.item_id,
                        name: e.name,
                        category: e.category,
                        price: e.price,
                        available: true,
                        description: e.description,
                    },
                );
            }
            MenuItemEvent::ItemPriceChanged(e) => {
                if let Some(mut rm) = self.store.get(property_id, &e.item_id) {
                    rm.price = e.price;
                    self.store.upsert(property_id, e.item_id, rm);
                }
            }
            MenuItemEvent::ItemAvailabilityChanged(e) => {
                if let Some(mut rm) = self.store.get(property_id, &e.item_id) {
                    rm.available = e.available;
                    self.store.upsert(property_id, e.item_id, rm);
                }
            }
            MenuItemEvent::ItemDetailsUpdated(e) => {
                if let Some(mut rm) = self.store.get(property_id, &e.item_id) {
                    rm.name = e.name;
                    rm.category = e.category;
                    rm.description = e.description;
                    self.store.upsert(property_id, e.item_id, rm);
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
