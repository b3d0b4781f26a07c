//! `stayforge-guests` — guest registry domain.
//!
//! Guests are deliberately loose records: contact details are not unique, and a
//! guest may be registered per booking attempt. The reservation engine references
//! guests by identity only.

pub mod guest;

pub use guest::{
    ContactDetails, Guest, GuestCommand, GuestContactUpdated, GuestEvent, GuestId,
    GuestRegistered, RegisterGuest, UpdateGuestContact,
};
