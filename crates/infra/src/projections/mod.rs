//! Projection implementations (read model builders).
//!
//! Projections consume domain events and build query-optimized read models.
//! All projections are:
//! - **Rebuildable**: Can be reconstructed from the event stream
//! - **Property-isolated**: Data is partitioned by property
//! - **Idempotent**: Safe for at-least-once delivery
//!
//! Every projection follows the same pipeline: gate on the aggregate type,
//! check the per-stream cursor, deserialize the payload, cross-check the
//! event's own property/aggregate ids against the envelope, mutate the read
//! model, advance the cursor. The cursor bookkeeping lives in
//! [`cursor_store::StreamCursors`]; the per-domain mutation logic lives in
//! each projection module.

pub mod cursor_store;

// Read model builders
pub mod bookings;
pub mod dining_orders;
pub mod guests;
pub mod menu_items;
pub mod payments;
pub mod room_occupancy;
pub mod rooms;

use serde_json::Value as JsonValue;
use thiserror::Error;

use stayforge_core::PropertyId;
use stayforge_events::EventEnvelope;

pub use cursor_store::{
    CursorCheck, InMemoryCursorStore, PostgresCursorStore, ProjectionCursorStore, StreamCursors,
};

pub use bookings::{BookingReadModel, BookingsProjection};
pub use dining_orders::{DiningOrderReadModel, DiningOrdersProjection, OrderLineView};
pub use guests::{GuestReadModel, GuestsProjection};
pub use menu_items::{MenuItemReadModel, MenuItemsProjection};
pub use payments::{PaymentReadModel, PaymentsProjection};
pub use room_occupancy::{OccupancyReadModel, RoomOccupancyProjection, StayClaimView};
pub use rooms::{RoomReadModel, RoomsProjection};

/// Errors shared by all projections.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("failed to deserialize event payload: {0}")]
    Deserialize(String),

    #[error("property isolation violation: {0}")]
    PropertyIsolation(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

/// Deterministic replay order for rebuilds: property, aggregate, sequence.
pub(crate) fn sort_for_replay(envelopes: &mut [EventEnvelope<JsonValue>]) {
    envelopes.sort_by_key(|e| {
        (
            *e.property_id().as_uuid().as_bytes(),
            *e.aggregate_id().as_uuid().as_bytes(),
            e.sequence_number(),
        )
    });
}

/// Distinct properties present in a replay batch, in stable order.
pub(crate) fn distinct_properties(envelopes: &[EventEnvelope<JsonValue>]) -> Vec<PropertyId> {
    let mut properties: Vec<_> = envelopes.iter().map(|e| e.property_id()).collect();
    properties.sort_by_key(|p| *p.as_uuid().as_bytes());
    properties.dedup();
    properties
}
