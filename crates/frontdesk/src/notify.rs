//! Confirmation notices and their delivery seam.
//!
//! Delivery is decoupled from the reservation commit: the desk enqueues a
//! background job carrying the notice, the job executor hands it to a
//! `Notifier`, and a failed delivery retries and eventually dead-letters
//! without ever touching the booking.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stayforge_core::PropertyId;
use stayforge_lodging::{BookingId, BookingStatus};

/// Notice rendered for the guest channel. Rides as the job payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationNotice {
    pub property_id: PropertyId,
    pub booking_id: BookingId,
    pub guest_name: String,
    pub room_number: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: u32,
    pub total_amount: u64,
    pub status: BookingStatus,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification channel unavailable: {0}")]
    Unavailable(String),
    #[error("notice rejected: {0}")]
    Rejected(String),
}

/// Delivery channel for guest notices. Implementations run on the job
/// executor thread and must not assume the booking still exists.
pub trait Notifier: Send + Sync {
    fn deliver(&self, notice: &ConfirmationNotice) -> Result<(), NotifyError>;
}

/// Default channel: writes the notice to the log. Stands in for outbound
/// email or SMS, which an external system delivers.
#[derive(Debug, Default)]
pub struct LoggingNotifier;

impl Notifier for LoggingNotifier {
    fn deliver(&self, notice: &ConfirmationNotice) -> Result<(), NotifyError> {
        tracing::info!(
            booking_id = %notice.booking_id.0,
            guest = %notice.guest_name,
            room_number = %notice.room_number,
            check_in = %notice.check_in,
            check_out = %notice.check_out,
            nights = notice.nights,
            total_amount = notice.total_amount,
            "confirmation notice"
        );
        Ok(())
    }
}
