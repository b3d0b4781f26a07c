//! `stayforge-lodging` — rooms and the reservation consistency engine.
//!
//! The `Room` aggregate owns both the room's catalog attributes (number,
//! type, nightly rate, housekeeping status) and its ledger of stay claims.
//! Keeping the ledger inside the aggregate makes the no-overlap guarantee a
//! single-aggregate invariant: every reservation attempt for a room is a
//! command against that room's stream, so optimistic concurrency on the
//! stream linearizes competing writes per room while leaving different
//! rooms free to commit in parallel.

pub mod pricing;
pub mod room;
pub mod stay;

pub use pricing::{nights_between, stay_total};
pub use room::{
    ChangeNightlyRate, ChangeRoomStatus, NightlyRateChanged, RegisterRoom, ReserveStay, Room,
    RoomCommand, RoomDetailsUpdated, RoomEvent, RoomId, RoomRegistered, RoomStatus,
    RoomStatusChanged, StayClaim, StayReserved, StayTransitioned, TransitionStay,
    UpdateRoomDetails,
};
pub use stay::{BookingId, BookingStatus, StayPeriod};
