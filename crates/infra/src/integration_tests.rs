//! Integration tests for the full event-sourced pipeline.
//!
//! Tests: Command → EventStore → EventBus → Projection → ReadModel,
//! plus the payment confirmation saga driven off the same bus.
//!
//! Verifies:
//! - Reservations produce events that land in the booking and occupancy read models
//! - A room admits exactly one of several racing walk-ins
//! - Back-to-back stays sharing a turnover date both commit
//! - Overlapping pending holds are settled by whichever activates first
//! - A successful payment drives its booking to confirmed end to end

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, Utc};

    use stayforge_core::{AggregateId, PropertyId};
    use stayforge_events::{EventBus, EventEnvelope, InMemoryEventBus};
    use stayforge_guests::GuestId;
    use stayforge_lodging::{
        BookingId, BookingStatus, RegisterRoom, ReserveStay, Room, RoomCommand, RoomId,
        RoomStatus, StayPeriod, TransitionStay,
    };
    use stayforge_payments::{
        MarkPaymentSucceeded, Payment, PaymentCommand, PaymentId, PaymentMethod, RecordPayment,
    };

    use crate::command_dispatcher::{CommandDispatcher, DispatchError};
    use crate::event_store::{EventStore, InMemoryEventStore, StoredEvent};
    use crate::projections::bookings::{BookingReadModel, BookingsProjection};
    use crate::projections::room_occupancy::{OccupancyReadModel, RoomOccupancyProjection};
    use crate::projections::rooms::{RoomReadModel, RoomsProjection};
    use crate::read_model::InMemoryPropertyStore;
    use crate::saga::{CommandExecutor, PaymentConfirmationSaga, SagaRunner};

    type JsonEnvelope = EventEnvelope<serde_json::Value>;
    type SharedBus = Arc<InMemoryEventBus<JsonEnvelope>>;
    type SharedStore = Arc<InMemoryEventStore>;
    type Dispatcher = CommandDispatcher<SharedStore, SharedBus>;
    type Bookings = BookingsProjection<Arc<InMemoryPropertyStore<BookingId, BookingReadModel>>>;
    type Occupancy =
        RoomOccupancyProjection<Arc<InMemoryPropertyStore<RoomId, OccupancyReadModel>>>;
    type Rooms = RoomsProjection<Arc<InMemoryPropertyStore<RoomId, RoomReadModel>>>;

    struct Harness {
        dispatcher: Arc<Dispatcher>,
        store: SharedStore,
        bus: SharedBus,
        bookings: Arc<Bookings>,
        occupancy: Arc<Occupancy>,
        rooms: Arc<Rooms>,
    }

    fn setup() -> Harness {
        let store: SharedStore = Arc::new(InMemoryEventStore::new());
        let bus: SharedBus = Arc::new(InMemoryEventBus::new());
        let dispatcher = Arc::new(CommandDispatcher::new(store.clone(), bus.clone()));

        let bookings = Arc::new(BookingsProjection::new(Arc::new(InMemoryPropertyStore::new())));
        let occupancy = Arc::new(RoomOccupancyProjection::new(Arc::new(
            InMemoryPropertyStore::new(),
        )));
        let rooms = Arc::new(RoomsProjection::new(Arc::new(InMemoryPropertyStore::new())));

        // Subscribe to the bus BEFORE any events are published
        let bookings_sub = bookings.clone();
        let occupancy_sub = occupancy.clone();
        let rooms_sub = rooms.clone();
        let bus_sub = bus.clone();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<()>();
        std::thread::spawn(move || {
            let sub = bus_sub.subscribe();
            let _ = ready_tx.send(());
            loop {
                match sub.recv() {
                    Ok(env) => {
                        if let Err(e) = bookings_sub.apply_envelope(&env) {
                            eprintln!("bookings projection failed: {e:?}");
                        }
                        if let Err(e) = occupancy_sub.apply_envelope(&env) {
                            eprintln!("occupancy projection failed: {e:?}");
                        }
                        if let Err(e) = rooms_sub.apply_envelope(&env) {
                            eprintln!("rooms projection failed: {e:?}");
                        }
                    }
                    Err(_) => break,
                }
            }
        });
        // Ensure the subscriber is ready before returning (prevents missing early events).
        let _ = ready_rx.recv_timeout(std::time::Duration::from_secs(1));

        Harness {
            dispatcher,
            store,
            bus,
            bookings,
            occupancy,
            rooms,
        }
    }

    /// Helper: wait a short time for the subscriber thread to drain the bus.
    fn wait_for_processing() {
        std::thread::sleep(std::time::Duration::from_millis(50));
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn period(from: &str, to: &str) -> StayPeriod {
        StayPeriod::new(date(from), date(to)).unwrap()
    }

    fn register_room(
        h: &Harness,
        property_id: PropertyId,
        number: &str,
        nightly_rate: u64,
    ) -> RoomId {
        let room_id = RoomId::new(AggregateId::new());
        let cmd = RegisterRoom {
            property_id,
            room_id,
            room_number: number.to_string(),
            room_type: "double".to_string(),
            nightly_rate,
            amenities: vec!["wifi".to_string()],
            images: vec![],
            occurred_at: Utc::now(),
        };
        h.dispatcher
            .dispatch(
                property_id,
                room_id.0,
                "lodging.room",
                RoomCommand::RegisterRoom(cmd),
                |_, id| Room::empty(RoomId::new(id)),
            )
            .expect("room registration should succeed");
        room_id
    }

    fn reserve(
        h: &Harness,
        property_id: PropertyId,
        room_id: RoomId,
        booking_id: BookingId,
        period: StayPeriod,
        immediate_check_in: bool,
    ) -> Result<Vec<StoredEvent>, DispatchError> {
        let cmd = ReserveStay {
            property_id,
            room_id,
            booking_id,
            guest_id: GuestId::new(AggregateId::new()),
            period,
            immediate_check_in,
            occurred_at: Utc::now(),
        };
        h.dispatcher.dispatch(
            property_id,
            room_id.0,
            "lodging.room",
            RoomCommand::ReserveStay(cmd),
            |_, id| Room::empty(RoomId::new(id)),
        )
    }

    fn transition(
        h: &Harness,
        property_id: PropertyId,
        room_id: RoomId,
        booking_id: BookingId,
        target_status: BookingStatus,
    ) -> Result<Vec<StoredEvent>, DispatchError> {
        let cmd = TransitionStay {
            property_id,
            room_id,
            booking_id,
            target_status,
            occurred_at: Utc::now(),
        };
        h.dispatcher.dispatch(
            property_id,
            room_id.0,
            "lodging.room",
            RoomCommand::TransitionStay(cmd),
            |_, id| Room::empty(RoomId::new(id)),
        )
    }

    #[test]
    fn reservation_flows_into_booking_and_occupancy_read_models() {
        let h = setup();
        let property_id = PropertyId::new();
        let room_id = register_room(&h, property_id, "204", 20_000);
        let booking_id = BookingId::new(AggregateId::new());

        let stored = reserve(
            &h,
            property_id,
            room_id,
            booking_id,
            period("2026-03-01", "2026-03-03"),
            false,
        )
        .expect("reservation should commit");
        assert_eq!(stored.len(), 1);

        wait_for_processing();

        let booking = h
            .bookings
            .get(property_id, &booking_id)
            .expect("booking read model row");
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.room_id, room_id);
        assert_eq!(booking.nights, 2);
        assert_eq!(booking.nightly_rate, 20_000);
        assert_eq!(booking.total_amount, 40_000);

        let occ = h
            .occupancy
            .get(property_id, &room_id)
            .expect("occupancy read model row");
        assert_eq!(occ.claims.len(), 1);
        // A pending hold does not own the nights yet.
        assert!(occ.is_free_for(&period("2026-03-01", "2026-03-03")));
    }

    #[test]
    fn walk_in_reserves_and_occupies_in_a_single_commit() {
        let h = setup();
        let property_id = PropertyId::new();
        let room_id = register_room(&h, property_id, "101", 15_000);
        let booking_id = BookingId::new(AggregateId::new());

        let stored = reserve(
            &h,
            property_id,
            room_id,
            booking_id,
            period("2026-05-01", "2026-05-02"),
            true,
        )
        .expect("walk-in should commit");
        // StayReserved plus RoomStatusChanged, appended as one batch.
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].sequence_number + 1, stored[1].sequence_number);

        wait_for_processing();

        let booking = h.bookings.get(property_id, &booking_id).unwrap();
        assert_eq!(booking.status, BookingStatus::CheckedIn);

        let room = h.rooms.get(property_id, &room_id).unwrap();
        assert_eq!(room.status, RoomStatus::Occupied);

        let occ = h.occupancy.get(property_id, &room_id).unwrap();
        assert!(!occ.is_free_for(&period("2026-05-01", "2026-05-02")));
    }

    #[test]
    fn racing_walk_ins_admit_exactly_one() {
        let h = setup();
        let property_id = PropertyId::new();
        let room_id = register_room(&h, property_id, "309", 18_000);
        let window = period("2026-04-01", "2026-04-04");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let dispatcher = h.dispatcher.clone();
            handles.push(std::thread::spawn(move || {
                let cmd = ReserveStay {
                    property_id,
                    room_id,
                    booking_id: BookingId::new(AggregateId::new()),
                    guest_id: GuestId::new(AggregateId::new()),
                    period: window,
                    immediate_check_in: true,
                    occurred_at: Utc::now(),
                };
                dispatcher.dispatch(
                    property_id,
                    room_id.0,
                    "lodging.room",
                    RoomCommand::ReserveStay(cmd),
                    |_, id| Room::empty(RoomId::new(id)),
                )
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|t| t.join().unwrap()).collect();
        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1, "exactly one racing walk-in should commit");
        for result in &results {
            if result.is_ok() {
                continue;
            }
            // Losers fail either the version check or the overlap re-check;
            // both surface as a conflict.
            assert!(
                matches!(result, Err(DispatchError::Concurrency(_))),
                "unexpected loser error: {result:?}"
            );
        }

        wait_for_processing();

        let occ = h.occupancy.get(property_id, &room_id).unwrap();
        let active = occ.claims.iter().filter(|c| c.status.is_active()).count();
        assert_eq!(active, 1);
    }

    #[test]
    fn back_to_back_stays_share_a_turnover_date() {
        let h = setup();
        let property_id = PropertyId::new();
        let room_id = register_room(&h, property_id, "212", 12_000);

        let first = reserve(
            &h,
            property_id,
            room_id,
            BookingId::new(AggregateId::new()),
            period("2026-01-01", "2026-01-02"),
            true,
        );
        assert!(first.is_ok(), "first stay should commit: {first:?}");

        // Checkout day equals the next check-in day; half-open periods do not collide.
        let second = reserve(
            &h,
            property_id,
            room_id,
            BookingId::new(AggregateId::new()),
            period("2026-01-02", "2026-01-03"),
            true,
        );
        assert!(second.is_ok(), "turnover-day stay should commit: {second:?}");

        let overlapping = reserve(
            &h,
            property_id,
            room_id,
            BookingId::new(AggregateId::new()),
            period("2026-01-01", "2026-01-03"),
            true,
        );
        assert!(
            matches!(overlapping, Err(DispatchError::Concurrency(_))),
            "spanning stay should conflict: {overlapping:?}"
        );
    }

    #[test]
    fn overlapping_pending_holds_settle_on_first_activation() {
        let h = setup();
        let property_id = PropertyId::new();
        let room_id = register_room(&h, property_id, "118", 20_000);
        let first_hold = BookingId::new(AggregateId::new());
        let second_hold = BookingId::new(AggregateId::new());
        let window = period("2026-06-10", "2026-06-12");

        reserve(&h, property_id, room_id, first_hold, window, false).expect("first hold");
        reserve(&h, property_id, room_id, second_hold, window, false).expect("second hold");

        transition(&h, property_id, room_id, first_hold, BookingStatus::Confirmed)
            .expect("first activation should win the window");

        let denied = transition(&h, property_id, room_id, second_hold, BookingStatus::Confirmed);
        assert!(
            matches!(denied, Err(DispatchError::Concurrency(_))),
            "second activation should conflict: {denied:?}"
        );

        wait_for_processing();

        let winner = h.bookings.get(property_id, &first_hold).unwrap();
        assert_eq!(winner.status, BookingStatus::Confirmed);
        let loser = h.bookings.get(property_id, &second_hold).unwrap();
        assert_eq!(loser.status, BookingStatus::Pending);
    }

    #[test]
    fn read_models_stay_scoped_to_their_property() {
        let h = setup();
        let property_a = PropertyId::new();
        let property_b = PropertyId::new();
        let room_id = register_room(&h, property_a, "501", 25_000);
        let booking_id = BookingId::new(AggregateId::new());

        reserve(
            &h,
            property_a,
            room_id,
            booking_id,
            period("2026-07-01", "2026-07-02"),
            false,
        )
        .expect("reservation should commit");

        wait_for_processing();

        assert!(h.bookings.get(property_a, &booking_id).is_some());
        assert!(h.bookings.get(property_b, &booking_id).is_none());
        assert!(h.occupancy.get(property_b, &room_id).is_none());
    }

    /// Saga-side command executor: resolves the booking's room through the
    /// bookings read model and dispatches the transition like any caller.
    struct ConfirmViaDispatcher {
        dispatcher: Arc<Dispatcher>,
        bookings: Arc<Bookings>,
    }

    impl CommandExecutor for ConfirmViaDispatcher {
        type Error = String;

        fn execute(
            &self,
            property_id: PropertyId,
            aggregate_type: &str,
            command_type: &str,
            payload: &serde_json::Value,
        ) -> Result<(), String> {
            if aggregate_type != "lodging.room" || command_type != "TransitionStay" {
                return Err(format!(
                    "unexpected saga command {aggregate_type}/{command_type}"
                ));
            }
            let booking_id = payload
                .get("booking_id")
                .and_then(|v| v.as_str())
                .and_then(|raw| uuid::Uuid::parse_str(raw).ok())
                .map(|id| BookingId::new(AggregateId::from_uuid(id)))
                .ok_or_else(|| "saga command carried no booking_id".to_string())?;
            let booking = self
                .bookings
                .get(property_id, &booking_id)
                .ok_or_else(|| format!("booking {booking_id:?} not in read model"))?;
            let cmd = TransitionStay {
                property_id,
                room_id: booking.room_id,
                booking_id,
                target_status: BookingStatus::Confirmed,
                occurred_at: Utc::now(),
            };
            self.dispatcher
                .dispatch(
                    property_id,
                    booking.room_id.0,
                    "lodging.room",
                    RoomCommand::TransitionStay(cmd),
                    |_, id| Room::empty(RoomId::new(id)),
                )
                .map(|_| ())
                .map_err(|e| format!("{e:?}"))
        }
    }

    #[test]
    fn payment_success_drives_the_booking_to_confirmed() {
        let h = setup();

        let runner = Arc::new(SagaRunner::<PaymentConfirmationSaga, _, _>::new(
            h.store.clone(),
            ConfirmViaDispatcher {
                dispatcher: h.dispatcher.clone(),
                bookings: h.bookings.clone(),
            },
        ));
        let runner_sub = runner.clone();
        let bus_sub = h.bus.clone();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<()>();
        std::thread::spawn(move || {
            let sub = bus_sub.subscribe();
            let _ = ready_tx.send(());
            while let Ok(env) = sub.recv() {
                if let Err(e) = runner_sub.handle_envelope(&env) {
                    eprintln!("saga runner failed: {e:?}");
                }
            }
        });
        let _ = ready_rx.recv_timeout(std::time::Duration::from_secs(1));

        let property_id = PropertyId::new();
        let room_id = register_room(&h, property_id, "407", 20_000);
        let booking_id = BookingId::new(AggregateId::new());
        reserve(
            &h,
            property_id,
            room_id,
            booking_id,
            period("2026-08-20", "2026-08-22"),
            false,
        )
        .expect("reservation should commit");
        // Let the bookings read model catch up; the saga resolves rooms through it.
        wait_for_processing();

        let payment_id = PaymentId::new(AggregateId::new());
        let record = RecordPayment {
            property_id,
            payment_id,
            amount: 40_000,
            method: PaymentMethod::Card,
            reference: Some("txn-81530".to_string()),
            booking_id: Some(booking_id),
            order_id: None,
            occurred_at: Utc::now(),
        };
        h.dispatcher
            .dispatch(
                property_id,
                payment_id.0,
                "payments.payment",
                PaymentCommand::RecordPayment(record),
                |_, id| Payment::empty(PaymentId::new(id)),
            )
            .expect("payment should record");
        h.dispatcher
            .dispatch(
                property_id,
                payment_id.0,
                "payments.payment",
                PaymentCommand::MarkPaymentSucceeded(MarkPaymentSucceeded {
                    property_id,
                    payment_id,
                    occurred_at: Utc::now(),
                }),
                |_, id| Payment::empty(PaymentId::new(id)),
            )
            .expect("payment should settle");

        // Payment success → saga command → stay transition → projections.
        wait_for_processing();
        wait_for_processing();

        let booking = h.bookings.get(property_id, &booking_id).unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);

        // The saga instance stream records the whole exchange.
        let saga_stream = h.store.load_stream(property_id, booking_id.0).unwrap();
        let kinds: Vec<&str> = saga_stream.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(
            kinds,
            vec![
                "payment_succeeded_received",
                "confirmation_requested",
                "booking_confirmed_received",
                "saga_completed",
            ]
        );
    }
}
