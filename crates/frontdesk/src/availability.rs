//! Availability search over the room catalog.

use std::sync::Arc;

use serde::Serialize;

use stayforge_core::PropertyId;
use stayforge_infra::projections::room_occupancy::{OccupancyReadModel, RoomOccupancyProjection};
use stayforge_infra::projections::rooms::{RoomReadModel, RoomsProjection};
use stayforge_infra::read_model::PropertyStore;
use stayforge_lodging::{RoomId, RoomStatus, StayPeriod};

/// One bookable room in an availability result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub room_number: String,
    pub room_type: String,
    pub nightly_rate: u64,
    pub status: RoomStatus,
    pub amenities: Vec<String>,
}

impl From<RoomReadModel> for RoomSummary {
    fn from(value: RoomReadModel) -> Self {
        Self {
            room_id: value.room_id,
            room_number: value.room_number,
            room_type: value.room_type,
            nightly_rate: value.nightly_rate,
            status: value.status,
            amenities: value.amenities,
        }
    }
}

/// Advisory availability search.
///
/// The answer is computed from read models and can go stale the moment it
/// is returned; the reservation commit re-checks the same overlap rule
/// inside the room aggregate before anything is written.
pub struct AvailabilityChecker<RS, OS>
where
    RS: PropertyStore<RoomId, RoomReadModel>,
    OS: PropertyStore<RoomId, OccupancyReadModel>,
{
    rooms: Arc<RoomsProjection<RS>>,
    occupancy: Arc<RoomOccupancyProjection<OS>>,
}

impl<RS, OS> AvailabilityChecker<RS, OS>
where
    RS: PropertyStore<RoomId, RoomReadModel>,
    OS: PropertyStore<RoomId, OccupancyReadModel>,
{
    pub fn new(
        rooms: Arc<RoomsProjection<RS>>,
        occupancy: Arc<RoomOccupancyProjection<OS>>,
    ) -> Self {
        Self { rooms, occupancy }
    }

    /// Rooms free for every night of `period`, in catalog order (by room
    /// number).
    ///
    /// A room is free when no confirmed or checked-in claim overlaps the
    /// period. Pending holds and terminal claims do not block. A stay
    /// ending on the period's first day does not collide: checkout day
    /// equals check-in day on a turnover.
    pub fn find_available(
        &self,
        property_id: PropertyId,
        period: &StayPeriod,
    ) -> Vec<RoomSummary> {
        let mut rooms = self.rooms.list(property_id);
        rooms.sort_by(|a, b| a.room_number.cmp(&b.room_number));
        rooms
            .into_iter()
            .filter(|room| {
                self.occupancy
                    .get(property_id, &room.room_id)
                    .map(|occ| occ.is_free_for(period))
                    .unwrap_or(true)
            })
            .map(RoomSummary::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{NaiveDate, Utc};
    use serde_json::Value as JsonValue;
    use uuid::Uuid;

    use stayforge_core::AggregateId;
    use stayforge_events::EventEnvelope;
    use stayforge_guests::GuestId;
    use stayforge_infra::read_model::InMemoryPropertyStore;
    use stayforge_lodging::{
        nights_between, stay_total, BookingId, BookingStatus, RoomEvent, RoomRegistered,
        StayReserved, StayTransitioned,
    };

    fn envelope(
        property_id: PropertyId,
        room_id: RoomId,
        seq: u64,
        event: &RoomEvent,
    ) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(
            Uuid::now_v7(),
            property_id,
            room_id.0,
            "lodging.room".to_string(),
            seq,
            serde_json::to_value(event).unwrap(),
        )
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn period(from: &str, to: &str) -> StayPeriod {
        StayPeriod::new(date(from), date(to)).unwrap()
    }

    fn registered(property_id: PropertyId, room_id: RoomId, number: &str) -> RoomEvent {
        RoomEvent::RoomRegistered(RoomRegistered {
            property_id,
            room_id,
            room_number: number.to_string(),
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
            nights: nights_between(&p),
            total_amount: stay_total(20_000, &p).unwrap(),
            occurred_at: Utc::now(),
        })
    }

    fn setup() -> (
        AvailabilityChecker<
            Arc<InMemoryPropertyStore<RoomId, RoomReadModel>>,
            Arc<InMemoryPropertyStore<RoomId, OccupancyReadModel>>,
        >,
        Arc<RoomsProjection<Arc<InMemoryPropertyStore<RoomId, RoomReadModel>>>>,
        Arc<RoomOccupancyProjection<Arc<InMemoryPropertyStore<RoomId, OccupancyReadModel>>>>,
    ) {
        let rooms = Arc::new(RoomsProjection::new(Arc::new(InMemoryPropertyStore::new())));
        let occupancy = Arc::new(RoomOccupancyProjection::new(Arc::new(
            InMemoryPropertyStore::new(),
        )));
        let checker = AvailabilityChecker::new(rooms.clone(), occupancy.clone());
        (checker, rooms, occupancy)
    }

    fn apply(
        rooms: &RoomsProjection<Arc<InMemoryPropertyStore<RoomId, RoomReadModel>>>,
        occupancy: &RoomOccupancyProjection<Arc<InMemoryPropertyStore<RoomId, OccupancyReadModel>>>,
        env: &EventEnvelope<JsonValue>,
    ) {
        rooms.apply_envelope(env).unwrap();
        occupancy.apply_envelope(env).unwrap();
    }

    #[test]
    fn confirmed_claim_hides_the_room_for_overlapping_windows_only() {
        let (checker, rooms, occupancy) = setup();
        let property_id = PropertyId::new();
        let room_id = RoomId::new(AggregateId::new());
        let booking_id = BookingId::new(AggregateId::new());

        apply(
            &rooms,
            &occupancy,
            &envelope(property_id, room_id, 1, &registered(property_id, room_id, "204")),
        );
        apply(
            &rooms,
            &occupancy,
            &envelope(
                property_id,
                room_id,
                2,
                &reserved(
                    property_id,
                    room_id,
                    booking_id,
                    period("2026-02-10", "2026-02-15"),
                    BookingStatus::Pending,
                ),
            ),
        );
        apply(
            &rooms,
            &occupancy,
            &envelope(
                property_id,
                room_id,
                3,
                &RoomEvent::StayTransitioned(StayTransitioned {
                    property_id,
                    room_id,
                    booking_id,
                    from_status: BookingStatus::Pending,
                    to_status: BookingStatus::Confirmed,
                    occurred_at: Utc::now(),
                }),
            ),
        );

        // Inside the confirmed stay: hidden.
        let inside = checker.find_available(property_id, &period("2026-02-12", "2026-02-13"));
        assert!(inside.is_empty());

        // Starting on the checkout day: free again.
        let after = checker.find_available(property_id, &period("2026-02-15", "2026-02-20"));
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].room_number, "204");
    }

    #[test]
    fn pending_hold_does_not_hide_the_room() {
        let (checker, rooms, occupancy) = setup();
        let property_id = PropertyId::new();
        let room_id = RoomId::new(AggregateId::new());

        apply(
            &rooms,
            &occupancy,
            &envelope(property_id, room_id, 1, &registered(property_id, room_id, "118")),
        );
        apply(
            &rooms,
            &occupancy,
            &envelope(
                property_id,
                room_id,
                2,
                &reserved(
                    property_id,
                    room_id,
                    BookingId::new(AggregateId::new()),
                    period("2026-02-10", "2026-02-15"),
                    BookingStatus::Pending,
                ),
            ),
        );

        let found = checker.find_available(property_id, &period("2026-02-12", "2026-02-13"));
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn results_come_back_in_catalog_order() {
        let (checker, rooms, occupancy) = setup();
        let property_id = PropertyId::new();

        for number in ["310", "101", "204"] {
            let room_id = RoomId::new(AggregateId::new());
            apply(
                &rooms,
                &occupancy,
                &envelope(property_id, room_id, 1, &registered(property_id, room_id, number)),
            );
        }

        let found = checker.find_available(property_id, &period("2026-02-01", "2026-02-02"));
        let numbers: Vec<&str> = found.iter().map(|r| r.room_number.as_str()).collect();
        assert_eq!(numbers, vec!["101", "204", "310"]);
    }
}
