//! Room occupancy projection.
//!
//! Mirrors each room's stay ledger into a read model the availability search
//! can scan without rehydrating aggregates. The answer it gives is advisory;
//! the reservation commit re-checks the ledger inside the aggregate before
//! anything is written.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use stayforge_core::PropertyId;
use stayforge_events::EventEnvelope;
use stayforge_lodging::{BookingId, BookingStatus, RoomEvent, RoomId, StayPeriod};

use super::cursor_store::{CursorCheck, ProjectionCursorStore, StreamCursors};
use super::ProjectionError;
use crate::read_model::PropertyStore;

/// One claim in a room's mirrored stay ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StayClaimView {
    pub booking_id: BookingId,
    pub period: StayPeriod,
    pub status: BookingStatus,
}

/// A room's mirrored stay ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyReadModel {
    pub room_id: RoomId,
    pub room_number: String,
    pub claims: Vec<StayClaimView>,
}

impl OccupancyReadModel {
    /// Whether no confirmed or checked-in claim overlaps the period.
    ///
    /// Pending and terminal claims hold no nights and never block.
    pub fn is_free_for(&self, period: &StayPeriod) -> bool {
        !self
            .claims
            .iter()
            .any(|c| c.status.is_active() && c.period.overlaps(period))
    }
}

/// Occupancy projection over `lodging.room` streams.
pub struct RoomOccupancyProjection<S>
where
    S: PropertyStore<RoomId, OccupancyReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> RoomOccupancyProjection<S>
where
    S: PropertyStore<RoomId, OccupancyReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new("lodging.occupancy"),
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

    pub fn get(&self, property_id: PropertyId, room_id: &RoomId) -> Option<OccupancyReadModel> {
        self.store.get(property_id, room_id)
    }

    pub fn list(&self, property_id: PropertyId) -> Vec<OccupancyReadModel> {
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
                    OccupancyReadModel {
                        room_id: e.room_id,
                        room_number: e.room_number,
                        claims: vec![],
                    },
                );
            }
            RoomEvent::StayReserved(e) => {
                let mut rm = self
                    .store
                    .get(property_id, &e.room_id)
                    .unwrap_or(OccupancyReadModel {
                        room_id: e.room_id,
                        room_number: String::new(),
                        claims: vec![],
                    });
                rm.claims.push(StayClaimView {
                    booking_id: e.booking_id,
                    period: e.period,
                    status: e.status,
                });
                self.store.upsert(property_id, e.room_id, rm);
            }
            RoomEvent::StayTransitioned(e) => {
                if let Some(mut rm) = self.store.get(property_id, &e.room_id) {
                    if let Some(claim) =
                        rm.claims.iter_mut().find(|c| c.booking_id == e.booking_id)
                    {
                        claim.status = e.to_status;
                    }
                    self.store.upsert(property_id, e.room_id, rm);
                }
            }
            // Catalog events do not touch the ledger; the cursor still
            // advances so later stay events are not mistaken for gaps.
            RoomEvent::RoomDetailsUpdated(_)
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

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use serde_json::Value as JsonValue;
    use uuid::Uuid;

    use stayforge_core::AggregateId;
    use stayforge_guests::GuestId;
    use stayforge_lodging::{RoomRegistered, StayReserved, StayTransitioned};

    use super::*;
    use crate::read_model::InMemoryPropertyStore;

    fn envelope(
        property_id: PropertyId,
        room_id: RoomId,
        seq: u64,
        ev: &RoomEvent,
    ) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(
            Uuid::now_v7(),
            property_id,
            room_id.0,
            "lodging.room".to_string(),
            seq,
            serde_json::to_value(ev).unwrap(),
        )
    }

    fn period(check_in: &str, check_out: &str) -> StayPeriod {
        StayPeriod::new(
            NaiveDate::parse_from_str(check_in, "%Y-%m-%d").unwrap(),
            NaiveDate::parse_from_str(check_out, "%Y-%m-%d").unwrap(),
        )
        .unwrap()
    }

    fn registered(property_id: PropertyId, room_id: RoomId) -> RoomEvent {
        RoomEvent::RoomRegistered(RoomRegistered {
            property_id,
            room_id,
            room_number: "204".to_string(),
            room_type: "double".to_string(),
            nightly_rate: 20_000,
            amenities: vec![],
            images: vec![],
            occurred_at: Utc::now(),
        })
    }

    fn reserved(
        property_id: PropertyId,
        room_id: RoomId,
        booking_id: BookingId,
        p: StayPeriod,
        status: BookingStatus,
    ) -> RoomEvent {
        RoomEvent::StayReserved(StayReserved {
            property_id,
            room_id,
            booking_id,
            guest_id: GuestId::new(AggregateId::new()),
            period: p,
            status,
            nightly_rate: 20_000,
            nights: p.nights(),
            total_amount: 20_000 * u64::from(p.nights()),
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn confirmed_claim_blocks_the_overlapping_window() {
        let property = PropertyId::new();
        let room = RoomId::new(AggregateId::new());
        let booking = BookingId::new(AggregateId::new());
        let projection = RoomOccupancyProjection::new(InMemoryPropertyStore::default());

        projection
            .apply_envelope(&envelope(property, room, 1, &registered(property, room)))
            .unwrap();
        projection
            .apply_envelope(&envelope(
                property,
                room,
                2,
                &reserved(
                    property,
                    room,
                    booking,
                    period("2026-01-01", "2026-01-03"),
                    BookingStatus::Confirmed,
                ),
            ))
            .unwrap();

        let rm = projection.get(property, &room).unwrap();
        assert!(!rm.is_free_for(&period("2026-01-02", "2026-01-04")));
        // Back-to-back stay: check-out day equals check-in day.
        assert!(rm.is_free_for(&period("2026-01-03", "2026-01-05")));
    }

    #[test]
    fn pending_claim_does_not_block() {
        let property = PropertyId::new();
        let room = RoomId::new(AggregateId::new());
        let booking = BookingId::new(AggregateId::new());
        let projection = RoomOccupancyProjection::new(InMemoryPropertyStore::default());

        projection
            .apply_envelope(&envelope(property, room, 1, &registered(property, room)))
            .unwrap();
        projection
            .apply_envelope(&envelope(
                property,
                room,
                2,
                &reserved(
                    property,
                    room,
                    booking,
                    period("2026-01-01", "2026-01-03"),
                    BookingStatus::Pending,
                ),
            ))
            .unwrap();

        let rm = projection.get(property, &room).unwrap();
        assert!(rm.is_free_for(&period("2026-01-01", "2026-01-03")));
    }

    #[test]
    fn cancellation_releases_the_window() {
        let property = PropertyId::new();
        let room = RoomId::new(AggregateId::new());
        let booking = BookingId::new(AggregateId::new());
        let projection = RoomOccupancyProjection::new(InMemoryPropertyStore::default());

        projection
            .apply_envelope(&envelope(property, room, 1, &registered(property, room)))
            .unwrap();
        projection
            .apply_envelope(&envelope(
                property,
                room,
                2,
                &reserved(
                    property,
                    room,
                    booking,
                    period("2026-01-01", "2026-01-03"),
                    BookingStatus::Confirmed,
                ),
            ))
            .unwrap();
        projection
            .apply_envelope(&envelope(
                property,
                room,
                3,
                &RoomEvent::StayTransitioned(StayTransitioned {
                    property_id: property,
                    room_id: room,
                    booking_id: booking,
                    from_status: BookingStatus::Confirmed,
                    to_status: BookingStatus::Cancelled,
                    occurred_at: Utc::now(),
                }),
            ))
            .unwrap();

        let rm = projection.get(property, &room).unwrap();
        assert!(rm.is_free_for(&period("2026-01-01", "2026-01-03")));
    }

    #[test]
    fn rebuild_replays_out_of_order_envelopes() {
        let property = PropertyId::new();
        let room = RoomId::new(AggregateId::new());
        let booking = BookingId::new(AggregateId::new());
        let projection = RoomOccupancyProjection::new(InMemoryPropertyStore::default());

        let envs = vec![
            envelope(
                property,
                room,
                2,
                &reserved(
                    property,
                    room,
                    booking,
                    period("2026-02-10", "2026-02-12"),
                    BookingStatus::Confirmed,
                ),
            ),
            envelope(property, room, 1, &registered(property, room)),
        ];

        projection.rebuild_from_scratch(envs).unwrap();

        let rm = projection.get(property, &room).unwrap();
        assert_eq!(rm.claims.len(), 1);
        assert!(!rm.is_free_for(&period("2026-02-11", "2026-02-13")));
    }
}
