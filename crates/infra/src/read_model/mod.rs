//! Property-isolated read model storage abstractions.

pub mod postgres;
pub mod property_store;

pub use postgres::PostgresBookingStore;
pub use property_store::{InMemoryPropertyStore, PropertyStore};
