//! Event store: append-only, property-scoped streams with optimistic
//! concurrency.
//!
//! Each room, guest, menu item, dining order and payment lives in its own
//! stream keyed by `(PropertyId, AggregateId)`. Reservation races on a room
//! resolve at the stream head: the compare-and-swap on the stream version lets
//! exactly one of two concurrent appends commit.

pub mod in_memory;
pub mod postgres;
pub mod query;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use query::{EventFilter, EventQuery, EventQueryResult, Pagination};
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
