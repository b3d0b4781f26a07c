//! `stayforge-frontdesk` — the operations staff perform against the platform.
//!
//! Availability search, the reservation desk, dining order intake and the
//! guest directory, all transport-independent: each service works over the
//! command dispatcher and read-model projections and knows nothing about
//! HTTP. The API crate wires these into handlers.

pub mod availability;
pub mod directory;
pub mod error;
pub mod notify;
pub mod orders;
pub mod reservation;

pub use availability::{AvailabilityChecker, RoomSummary};
pub use directory::GuestDirectory;
pub use error::FrontdeskError;
pub use notify::{ConfirmationNotice, LoggingNotifier, Notifier, NotifyError};
pub use orders::{OpenOrderRequest, OrderDesk, OrderLineRequest, OrderReceipt};
pub use reservation::{
    BookingReceipt, GuestRef, RegisterRoomRequest, ReservationDesk, ReserveStayRequest,
};
