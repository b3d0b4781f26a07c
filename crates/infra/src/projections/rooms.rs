//! Room catalog projection.
//!
//! Maintains the queryable room catalog: number, type, current nightly rate,
//! operational status, amenities and images. Availability search starts from
//! this catalog (in room-number order) and consults the occupancy projection
//! for the ledger side.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use stayforge_core::PropertyId;
use stayforge_events::EventEnvelope;
use stayforge_lodging::{RoomEvent, RoomId, RoomStatus};

use super::cursor_store::{CursorCheck, ProjectionCursorStore, StreamCursors};
use super::ProjectionError;
use crate::read_model::PropertyStore;

/// Queryable room catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomReadModel {
    pub room_id: RoomId,
    pub room_number: String,
    pub room_type: String,
    pub nightly_rate: u64,
    pub status: RoomStatus,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
}

/// Room catalog projection over `lodging.room` streams.
pub struct RoomsProjection<S>
where
    S: PropertyStore<RoomId, RoomReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> RoomsProjection<S>
where
    S: PropertyStore<RoomId, RoomReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new("lodging.rooms"),
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

    pub fn get(&self, property_id: PropertyId, room_id: &RoomId) -> Option<RoomReadModel> {
        self.store.get(property_id, room_id)
    }

    pub fn list(&self, property_id: PropertyId) -> Vec<RoomReadModel> {
        self.store.list(property_id)
    }

    /// Apply a published envelope into the projection.
    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != "lodging.room" {
            return Ok(());
        }

        let property_id = envelope.property_id();
        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        if let CursorCheck::Skip = self.cursors.check(property_id, aggregate_id, seq)? {
            return Ok(());
        }

        let ev: RoomEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(format!("room event: {e}")))?;

        let (event_property, room_id) = match &ev {
            RoomEvent::RoomRegistered(e) => (e.property_id, e.room_id),
            RoomEvent::RoomDetailsUpdated(e) => (e.property_id, e.room_id),
            RoomEvent::NightlyRateChanged(e) => (e.property_id, e.room_id),
            RoomEvent::RoomStatusChanged(e) => (e.property_id, e.room_id),
            RoomEvent::StayReserved(e) => (e.property_id, e.room_id),
            RoomEvent::StayTransitioned(e) => (e.property_id, e.room_id),
        };

        if event_property != property_id {
            return Err(ProjectionError::PropertyIsolation(
                "event property_id does not match envelope property_id".to_string(),
            ));
        }
        if room_id.0 != aggregate_id {
            return Err(ProjectionError::PropertyIsolation(
                "event room_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match ev {
            RoomEvent::RoomRegistered(e) => {
                self.store.upsert(
                    property_id,
                    e.room_id,
                    RoomReadModel {
                        room_id: e.room_id,
                        room_number: e.room_number,
                        room_type: e.room_type,
                        nightly_rate: e.nightly_rate,
                        status: RoomStatus::Available,
                        amenities: e.amenities,
                        images: e.images,
                    },
                );
            }
            RoomEvent::RoomDetailsUpdated(e) => {
                let mut rm = self
                    .store
                    .get(property_id, &e.room_id)
                    .unwrap_or(RoomReadModel {
                        room_id: e.room_id,
                        room_number: String::new(),
                        room_type: String::new(),
                        nightly_rate: 0,
                        status: RoomStatus::Available,
                        amenities: vec![],
                        images: vec![],
                    });
                rm.room_type = e.room_type;
                rm.amenities = e.amenities;
                rm.images = e.images;
                self.store.upsert(property_id, e.room_id, rm);
            }
            RoomEvent::NightlyRateChanged(e) => {
                if let Some(mut rm) = self.store.get(property_id, &e.room_id) {
                    rm.nightly_rate = e.nightly_rate;
                    self.store.upsert(property_id, e.room_id, rm);
                }
            }
            RoomEvent::RoomStatusChanged(e) => {
                if let Some(mut rm) = self.store.get(property_id, &e.room_id) {
                    rm.status = e.status;
                    self.store.upsert(property_id, e.room_id, rm);
                }
            }
            // Stay events belong to the occupancy and bookings projections;
            // the cursor still advances so later catalog events are not
            // mistaken for gaps.
            RoomEvent::StayReserved(_) | RoomEvent::StayTransitioned(_) => {}
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
