//! Event query interface for reporting and inspection.
//!
//! Read-only, property-scoped, paginated queries over the event store. This is
//! the feed behind the reporting/events API: reservation history, payment
//! trails, projection debugging.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stayforge_core::{AggregateId, PropertyId};

use crate::event_store::{EventStoreError, InMemoryEventStore, StoredEvent};

/// Page size when the caller names none.
const DEFAULT_LIMIT: u32 = 50;
/// Upper bound on a single page regardless of what the caller asks for.
const MAX_LIMIT: u32 = 1000;

/// One page window into a result set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    /// 0-based row offset.
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    /// Build from raw query parameters, clamping the limit to [`MAX_LIMIT`].
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

/// What to keep when scanning a property's events. Every field is optional;
/// unset fields match everything. The time bounds are inclusive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    pub aggregate_id: Option<AggregateId>,
    /// For example `lodging.room`.
    pub aggregate_type: Option<String>,
    /// For example `lodging.room.stay_reserved`.
    pub event_type: Option<String>,
    pub occurred_after: Option<DateTime<Utc>>,
    pub occurred_before: Option<DateTime<Utc>>,
}

impl EventFilter {
    fn matches(&self, event: &StoredEvent) -> bool {
        self.aggregate_id
            .map_or(true, |id| event.aggregate_id == id)
            && self
                .aggregate_type
                .as_deref()
                .map_or(true, |t| event.aggregate_type == t)
            && self
                .event_type
                .as_deref()
                .map_or(true, |t| event.event_type == t)
            && self
                .occurred_after
                .map_or(true, |after| event.occurred_at >= after)
            && self
                .occurred_before
                .map_or(true, |before| event.occurred_at <= before)
    }
}

/// One page of query results plus enough bookkeeping for the caller to ask
/// for the next page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventQueryResult {
    pub events: Vec<StoredEvent>,
    /// Matches across all pages, not just this one.
    pub total: u64,
    /// The window this page was cut with.
    pub pagination: Pagination,
    pub has_more: bool,
}

/// Async query interface for event inspection.
///
/// All queries are property-scoped and paginated by default. Both the
/// in-memory and Postgres stores implement this, so the reporting API works
/// the same in either deployment mode.
#[async_trait::async_trait]
pub trait EventQuery: Send + Sync {
    /// Scan a property's events, newest first; ties within the same instant
    /// keep stream order.
    async fn query_events(
        &self,
        property_id: PropertyId,
        filter: EventFilter,
        pagination: Pagination,
    ) -> Result<EventQueryResult, EventStoreError>;

    /// One aggregate's events through the same paginated window.
    ///
    /// Note the occurred_at DESC ordering; for replay-order streams use
    /// `load_stream` instead.
    async fn get_aggregate_events(
        &self,
        property_id: PropertyId,
        aggregate_id: AggregateId,
        pagination: Option<Pagination>,
    ) -> Result<EventQueryResult, EventStoreError> {
        let filter = EventFilter {
            aggregate_id: Some(aggregate_id),
            ..Default::default()
        };
        self.query_events(property_id, filter, pagination.unwrap_or_default())
            .await
    }

    /// A single event, or `None` when it does not exist under this property.
    async fn get_event_by_id(
        &self,
        property_id: PropertyId,
        event_id: uuid::Uuid,
    ) -> Result<Option<StoredEvent>, EventStoreError>;
}

#[async_trait::async_trait]
impl EventQuery for InMemoryEventStore {
    async fn query_events(
        &self,
        property_id: PropertyId,
        filter: EventFilter,
        pagination: Pagination,
    ) -> Result<EventQueryResult, EventStoreError> {
        let mut events: Vec<StoredEvent> = self
            .all_events(property_id)?
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect();

        // Match the Postgres query ordering: newest first, stable within a stream.
        events.sort_by(|a, b| {
            b.occurred_at
                .cmp(&a.occurred_at)
                .then(a.sequence_number.cmp(&b.sequence_number))
        });

        let total = events.len() as u64;
        let events: Vec<StoredEvent> = events
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .collect();
        let has_more = total > (pagination.offset + pagination.limit) as u64;

        Ok(EventQueryResult {
            events,
            total,
            pagination,
            has_more,
        })
    }

    async fn get_event_by_id(
        &self,
        property_id: PropertyId,
        event_id: uuid::Uuid,
    ) -> Result<Option<StoredEvent>, EventStoreError> {
        Ok(self
            .all_events(property_id)?
            .into_iter()
            .find(|e| e.event_id == event_id))
    }
}
