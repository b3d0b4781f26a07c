//! `stayforge-payments` — payment records.
//!
//! Payments are bookkeeping: they link money received to a booking or an
//! order and track settlement, but they sit outside the reservation
//! engine's concurrency-critical path. A successful booking payment is
//! picked up downstream to confirm the stay.

pub mod payment;

pub use payment::{
    MarkPaymentFailed, MarkPaymentSucceeded, Payment, PaymentCommand, PaymentEvent, PaymentFailed,
    PaymentId, PaymentMethod, PaymentRecorded, PaymentStatus, PaymentSucceeded, RecordPayment,
};
