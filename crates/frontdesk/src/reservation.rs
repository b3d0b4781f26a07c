//! The reservation desk: room registration, stay reservation, lifecycle
//! transitions, and the confirmation notices that follow them.
//!
//! Correctness against double-booking comes from the room aggregate's
//! overlap re-check plus the event store's version check. The desk adds a
//! per-room mutex on top so concurrent requests for one room serialize
//! instead of burning optimistic retries; requests for different rooms
//! never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::warn;

use stayforge_core::{AggregateId, PropertyId};
use stayforge_events::{EventBus, EventEnvelope};
use stayforge_guests::{ContactDetails, GuestId};
use stayforge_infra::command_dispatcher::{CommandDispatcher, DispatchError};
use stayforge_infra::event_store::{EventStore, StoredEvent};
use stayforge_infra::jobs::{Job, JobKind, JobStore};
use stayforge_infra::projections::bookings::{BookingReadModel, BookingsProjection};
use stayforge_infra::projections::guests::GuestReadModel;
use stayforge_infra::projections::rooms::{RoomReadModel, RoomsProjection};
use stayforge_infra::read_model::PropertyStore;
use stayforge_lodging::{
    BookingId, BookingStatus, RegisterRoom, ReserveStay, Room, RoomCommand, RoomEvent, RoomId,
    StayPeriod, TransitionStay,
};

use crate::directory::GuestDirectory;
use crate::error::FrontdeskError;
use crate::notify::ConfirmationNotice;

/// New catalog entry for the property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterRoomRequest {
    pub room_number: String,
    pub room_type: String,
    /// Rate in smallest currency unit (e.g., cents).
    pub nightly_rate: u64,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
}

/// Who the stay is for: an existing record, or details to register on the
/// spot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuestRef {
    Existing(GuestId),
    New {
        full_name: String,
        contact: ContactDetails,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveStayRequest {
    pub room_id: RoomId,
    pub guest: GuestRef,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    /// Walk-in flow: the stay starts checked-in and the room goes occupied
    /// in the same commit.
    pub walk_in: bool,
}

/// What the commit actually wrote: the price is fixed here and never
/// recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingReceipt {
    pub booking_id: BookingId,
    pub room_id: RoomId,
    pub room_number: String,
    pub guest_id: GuestId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: u32,
    /// Rate snapshot in smallest currency unit (e.g., cents).
    pub nightly_rate: u64,
    pub total_amount: u64,
    pub status: BookingStatus,
}

/// One mutex per room, created on first use.
struct RoomLocks {
    inner: Mutex<HashMap<(PropertyId, RoomId), Arc<Mutex<()>>>>,
}

impl RoomLocks {
    fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    fn for_room(&self, property_id: PropertyId, room_id: RoomId) -> Arc<Mutex<()>> {
        self.inner
            .lock()
            .unwrap()
            .entry((property_id, room_id))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

pub struct ReservationDesk<S, B, RS, BS, GS>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    RS: PropertyStore<RoomId, RoomReadModel>,
    BS: PropertyStore<BookingId, BookingReadModel>,
    GS: PropertyStore<GuestId, GuestReadModel>,
{
    dispatcher: Arc<CommandDispatcher<S, B>>,
    rooms: Arc<RoomsProjection<RS>>,
    bookings: Arc<BookingsProjection<BS>>,
    directory: Arc<GuestDirectory<S, B, GS>>,
    jobs: Arc<dyn JobStore>,
    locks: RoomLocks,
}

impl<S, B, RS, BS, GS> ReservationDesk<S, B, RS, BS, GS>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    RS: PropertyStore<RoomId, RoomReadModel>,
    BS: PropertyStore<BookingId, BookingReadModel>,
    GS: PropertyStore<GuestId, GuestReadModel>,
{
    pub fn new(
        dispatcher: Arc<CommandDispatcher<S, B>>,
        rooms: Arc<RoomsProjection<RS>>,
        bookings: Arc<BookingsProjection<BS>>,
        directory: Arc<GuestDirectory<S, B, GS>>,
        jobs: Arc<dyn JobStore>,
    ) -> Self {
        Self {
            dispatcher,
            rooms,
            bookings,
            directory,
            jobs,
            locks: RoomLocks::new(),
        }
    }

    /// Add a room to the catalog. Room numbers are unique per property,
    /// checked against the catalog read model.
    pub fn register_room(
        &self,
        property_id: PropertyId,
        request: RegisterRoomRequest,
    ) -> Result<RoomId, FrontdeskError> {
        let number = request.room_number.trim();
        if self
            .rooms
            .list(property_id)
            .iter()
            .any(|r| r.room_number == number)
        {
            return Err(FrontdeskError::Conflict(format!(
                "room number '{number}' already exists"
            )));
        }

        let room_id = RoomId::new(AggregateId::new());
        let command = RoomCommand::RegisterRoom(RegisterRoom {
            property_id,
            room_id,
            room_number: number.to_string(),
            room_type: request.room_type,
            nightly_rate: request.nightly_rate,
            amenities: request.amenities,
            images: request.images,
            occurred_at: Utc::now(),
        });
        self.dispatcher
            .dispatch(property_id, room_id.0, "lodging.room", command, |_, id| {
                Room::empty(RoomId::new(id))
            })?;
        Ok(room_id)
    }

    /// Reserve a stay.
    ///
    /// Resolves the guest, then commits the claim against the room stream.
    /// The room aggregate re-checks every confirmed and checked-in claim
    /// for overlap before the append, so a stale availability answer can
    /// reject here but never double-book. On success a confirmation notice
    /// is queued; a queueing failure is logged and the booking stands.
    pub fn reserve(
        &self,
        property_id: PropertyId,
        request: ReserveStayRequest,
    ) -> Result<BookingReceipt, FrontdeskError> {
        let period = StayPeriod::new(request.check_in, request.check_out)?;
        let room = self
            .rooms
            .get(property_id, &request.room_id)
            .ok_or_else(|| FrontdeskError::NotFound("room not found".to_string()))?;
        let (guest_id, guest_name) = self.resolve_guest(property_id, &request.guest)?;

        let booking_id = BookingId::new(AggregateId::new());
        let command = RoomCommand::ReserveStay(ReserveStay {
            property_id,
            room_id: request.room_id,
            booking_id,
            guest_id,
            period,
            immediate_check_in: request.walk_in,
            occurred_at: Utc::now(),
        });

        let lock = self.locks.for_room(property_id, request.room_id);
        let stored = {
            let _guard = lock.lock().unwrap();
            self.dispatcher
                .dispatch(
                    property_id,
                    request.room_id.0,
                    "lodging.room",
                    command,
                    |_, id| Room::empty(RoomId::new(id)),
                )
                .map_err(|err| match err {
                    DispatchError::NotFound => {
                        FrontdeskError::NotFound("room not found".to_string())
                    }
                    other => other.into(),
                })?
        };

        let receipt = receipt_from_reserved(&stored, room.room_number)?;
        self.enqueue_notice(
            "notify.booking_confirmation",
            &notice_for(property_id, &receipt, guest_name),
        );
        Ok(receipt)
    }

    /// Move a booking along its lifecycle.
    ///
    /// Transitions into confirmed or checked-in re-validate the claim
    /// against the room's committed stays, so an overlapping hold loses
    /// here with a conflict. A cancellation queues a cancellation notice.
    pub fn transition(
        &self,
        property_id: PropertyId,
        booking_id: BookingId,
        target_status: BookingStatus,
    ) -> Result<BookingReceipt, FrontdeskError> {
        let row = self
            .bookings
            .get(property_id, &booking_id)
            .ok_or_else(|| FrontdeskError::NotFound("booking not found".to_string()))?;

        let command = RoomCommand::TransitionStay(TransitionStay {
            property_id,
            room_id: row.room_id,
            booking_id,
            target_status,
            occurred_at: Utc::now(),
        });

        // Only activating transitions contend with reservations for the room.
        let lock = target_status
            .is_active()
            .then(|| self.locks.for_room(property_id, row.room_id));
        {
            let _guard = lock.as_ref().map(|l| l.lock().unwrap());
            self.dispatcher
                .dispatch(property_id, row.room_id.0, "lodging.room", command, |_, id| {
                    Room::empty(RoomId::new(id))
                })
                .map_err(|err| match err {
                    DispatchError::NotFound => {
                        FrontdeskError::NotFound("booking not found".to_string())
                    }
                    other => other.into(),
                })?;
        }

        let room_number = self
            .rooms
            .get(property_id, &row.room_id)
            .map(|r| r.room_number)
            .unwrap_or_default();
        let receipt = BookingReceipt {
            booking_id,
            room_id: row.room_id,
            room_number,
            guest_id: row.guest_id,
            check_in: row.check_in,
            check_out: row.check_out,
            nights: row.nights,
            nightly_rate: row.nightly_rate,
            total_amount: row.total_amount,
            status: target_status,
        };

        if target_status == BookingStatus::Cancelled {
            let guest_name = self
                .directory
                .get(property_id, &row.guest_id)
                .map(|g| g.full_name)
                .unwrap_or_else(|| "guest".to_string());
            self.enqueue_notice(
                "notify.stay_cancelled",
                &notice_for(property_id, &receipt, guest_name),
            );
        }
        Ok(receipt)
    }

    fn resolve_guest(
        &self,
        property_id: PropertyId,
        guest: &GuestRef,
    ) -> Result<(GuestId, String), FrontdeskError> {
        match guest {
            GuestRef::Existing(guest_id) => {
                let record = self
                    .directory
                    .get(property_id, guest_id)
                    .ok_or_else(|| FrontdeskError::NotFound("guest not found".to_string()))?;
                Ok((*guest_id, record.full_name))
            }
            GuestRef::New { full_name, contact } => {
                let guest_id = self
                    .directory
                    .find_or_register(property_id, full_name, contact)?;
                Ok((guest_id, full_name.clone()))
            }
        }
    }

    /// Queue a guest notice. Failures are logged and swallowed: delivery
    /// never decides the fate of a committed booking.
    fn enqueue_notice(&self, notice_type: &str, notice: &ConfirmationNotice) {
        let payload = match serde_json::to_value(notice) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(
                    booking_id = %notice.booking_id.0,
                    error = %err,
                    "failed to serialize guest notice"
                );
                return;
            }
        };
        let job = Job::new(
            notice.property_id,
            JobKind::guest_notification(notice_type),
            payload,
        );
        if let Err(err) = self.jobs.enqueue(job) {
            warn!(
                booking_id = %notice.booking_id.0,
                error = %err,
                "failed to enqueue guest notice"
            );
        }
    }
}

fn notice_for(
    property_id: PropertyId,
    receipt: &BookingReceipt,
    guest_name: String,
) -> ConfirmationNotice {
    ConfirmationNotice {
        property_id,
        booking_id: receipt.booking_id,
        guest_name,
        room_number: receipt.room_number.clone(),
        check_in: receipt.check_in,
        check_out: receipt.check_out,
        nights: receipt.nights,
        total_amount: receipt.total_amount,
        status: receipt.status,
    }
}

fn receipt_from_reserved(
    stored: &[StoredEvent],
    room_number: String,
) -> Result<BookingReceipt, FrontdeskError> {
    let first = stored.first().ok_or_else(|| {
        FrontdeskError::Internal("reservation commit produced no events".to_string())
    })?;
    let event: RoomEvent = serde_json::from_value(first.payload.clone()).map_err(|e| {
        FrontdeskError::Internal(format!("stored reservation event failed to decode: {e}"))
    })?;
    match event {
        RoomEvent::StayReserved(reserved) => Ok(BookingReceipt {
            booking_id: reserved.booking_id,
            room_id: reserved.room_id,
            room_number,
            guest_id: reserved.guest_id,
            check_in: reserved.period.check_in(),
            check_out: reserved.period.check_out(),
            nights: reserved.nights,
            nightly_rate: reserved.nightly_rate,
            total_amount: reserved.total_amount,
            status: reserved.status,
        }),
        other => Err(FrontdeskError::Internal(format!(
            "unexpected first reservation event: {other:?}"
        ))),
    }
}
