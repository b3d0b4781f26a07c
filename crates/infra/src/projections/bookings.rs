//! Bookings projection.
//!
//! Re-keys stay claims out of room streams into a booking-id index. Stays
//! live inside their room's stream, so looking one up by booking id would
//! otherwise mean scanning every room; this read model gives the front desk
//! (and the payment confirmation flow) a direct path from a booking id to
//! its room, guest, period and price snapshot.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value as JsonValue;

use stayforge_core::PropertyId;
use stayforge_events::EventEnvelope;
use stayforge_guests::GuestId;
use stayforge_lodging::{BookingId, BookingStatus, RoomEvent, RoomId};

use super::cursor_store::{CursorCheck, ProjectionCursorStore, StreamCursors};
use super::ProjectionError;
use crate::read_model::PropertyStore;

/// One booking, keyed by its own id rather than its room's stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingReadModel {
    pub booking_id: BookingId,
    pub room_id: RoomId,
    pub guest_id: GuestId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub status: BookingStatus,
    /// Rate snapshot the total was computed from, in minor units.
    pub nightly_rate: u64,
    pub nights: u32,
    pub total_amount: u64,
}

/// Booking index projection over `lodging.room` streams.
pub struct BookingsProjection<S>
where
    S: PropertyStore<BookingId, BookingReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> BookingsProjection<S>
where
    S: PropertyStore<BookingId, BookingReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new("lodging.bookings"),
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

    pub fn get(&self, property_id: PropertyId, booking_id: &BookingId) -> Option<BookingReadModel> {
        self.store.get(property_id, booking_id)
    }

    pub fn list(&self, property_id: PropertyId) -> Vec<BookingReadModel> {
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

        // The stream is the room's, so the aggregate cross-check is against
        // the event's room_id; booking ids are the read model's key, not the
        // stream's.
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
            RoomEvent::StayReserved(e) => {
                self.store.upsert(
                    property_id,
                    e.booking_id,
                    BookingReadModel {
                        booking_id: e.booking_id,
                        room_id: e.room_id,
                        guest_id: e.guest_id,
                        check_in: e.period.check_in(),
                        check_out: e.period.check_out(),
                        status: e.status,
                        nightly_rate: e.nightly_rate,
                        nights: e.nights,
                        total_amount: e.total_amount,
                    },
                );
            }
            RoomEvent::StayTransitioned(e) => {
                if let Some(mut rm) = self.store.get(property_id, &e.booking_id) {
                    rm.status = e.to_status;
                    self.store.upsert(property_id, e.booking_id, rm);
                }
            }
            // Catalog events carry no booking data; the cursor still advances
            // so later stay events are not mistaken for gaps.
            RoomEvent::RoomRegistered(_)
            | RoomEvent::RoomDetailsUpdated(_)
            | RoomEvent::NightlyRateChanged(_)
            | RoomEvent::RoomStatusChanged(_) => {}
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
