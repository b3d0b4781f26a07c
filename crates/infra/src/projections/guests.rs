//! Guest directory projection.
//!
//! Flattens guest records into a searchable directory. The front desk's
//! find-or-register flow scans this directory for an exact contact match
//! before minting a new guest.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use stayforge_core::PropertyId;
use stayforge_events::EventEnvelope;
use stayforge_guests::{GuestEvent, GuestId};

use super::cursor_store::{CursorCheck, ProjectionCursorStore, StreamCursors};
use super::ProjectionError;
use crate::read_model::PropertyStore;

/// Queryable guest directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestReadModel {
    pub guest_id: GuestId,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

/// Guest directory projection over `guests.guest` streams.
pub struct GuestsProjection<S>
where
    S: PropertyStore<GuestId, GuestReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> GuestsProjection<S>
where
    S: PropertyStore<GuestId, GuestReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new("guests.directory"),
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

    pub fn get(&self, property_id: PropertyId, guest_id: &GuestId) -> Option<GuestReadModel> {
        self.store.get(property_id, guest_id)
    }

    pub fn list(&self, property_id: PropertyId) -> Vec<GuestReadModel> {
        self.store.list(property_id)
    }

    /// Apply a published envelope into the projection.
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != "guests.guest" {
            return Ok(());
        }

        let property_id = envelope.property_id();
        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        if let CursorCheck::Skip = self.cursors.check(property_id, aggregate_id, seq)? {
            return Ok(());
        }

        let ev: GuestEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(format!("guest event: {e}")))?;

        let (event_property, guest_id) = match &ev {
            GuestEvent::GuestRegistered(e) => (e.property_id, e.guest_id),
            GuestEvent::GuestContactUpdated(e) => (e.property_id, e.guest_id),
        };

        if event_property != property_id {
            return Err(ProjectionError::PropertyIsolation(
                "event property_id does not match envelope property_id".to_string(),
            ));
        }
        if guest_id.0 != aggregate_id {
            return Err(ProjectionError::PropertyIsolation(
                "event guest_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match ev {
            GuestEvent::GuestRegistered(e) => {
                self.store.upsert(
                    property_id,
                    e.guest_id,
                    GuestReadModel {
                        guest_id: e.guest_id,
                        full_name: e.full_name,
                        email: e.contact.email,
                        phone: e.contact.phone,
                        notes: e.notes,
                    },
                );
            }
            GuestEvent::GuestContactUpdated(e) => {
                let mut rm = self
                    .store
                    .get(property_id, &e.guest_id)
                    .unwrap_or(GuestReadModel {
                        guest_id: e.guest_id,
                        full_name: String::new(),
                        email: None,
                        phone: None,
                        notes: None,
                    });
                rm.full_name = e.full_name;
                rm.email = e.contact.email;
                rm.phone = e.contact.phone;
                self.store.upsert(property_id, e.guest_id, rm);
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
