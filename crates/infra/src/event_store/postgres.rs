//! Postgres-backed event store.
//!
//! The durable backend for real deployments. It keeps the same promises as
//! the in-memory store, enforced by the schema instead of a process lock:
//! property isolation because every statement carries `property_id` in its
//! WHERE clause, append-only because nothing here ever issues UPDATE or
//! DELETE, and optimistic concurrency through the unique index on
//! `(property_id, aggregate_id, sequence_number)`.
//!
//! Appends run read-check-insert inside one transaction. When another
//! writer commits between the version read and the insert, the unique index
//! rejects the insert and the failure maps to
//! [`EventStoreError::Concurrency`], the same shape a stale in-memory
//! append produces. Remaining database failures map by SQLSTATE: unique
//! violations to `Concurrency`, foreign key and check violations to
//! `InvalidAppend`, everything else to `Storage`.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;
use tracing::{instrument, Span};

use stayforge_core::{AggregateId, ExpectedVersion, PropertyId};

use super::query::{EventFilter, EventQuery, EventQueryResult, Pagination};
use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

/// Columns every SELECT in this module reads, in [`decode_event`] order.
const EVENT_COLUMNS: &str = "event_id, property_id, aggregate_id, aggregate_type, \
     sequence_number, event_type, event_version, occurred_at, payload";

/// Postgres-backed append-only event store.
///
/// Cloning is cheap; all clones share one connection pool.
#[derive(Debug, Clone)]
pub struct PostgresEventStore {
    pool: Arc<PgPool>,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the events table and its indexes if missing.
    ///
    /// Runs once at startup in persistent mode and is a no-op afterwards.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), EventStoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                event_id UUID PRIMARY KEY,
                property_id UUID NOT NULL,
                aggregate_id UUID NOT NULL,
                aggregate_type TEXT NOT NULL,
                sequence_number BIGINT NOT NULL CHECK (sequence_number > 0),
                event_type TEXT NOT NULL,
                event_version INT NOT NULL,
                occurred_at TIMESTAMPTZ NOT NULL,
                payload JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (property_id, aggregate_id, sequence_number)
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("ensure_schema", e))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_events_property_occurred \
             ON events (property_id, occurred_at DESC)",
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("ensure_schema", e))?;

        Ok(())
    }

    /// Load a full stream in sequence order. Unknown streams come back empty.
    #[instrument(
        skip(self),
        fields(
            property_id = %property_id.as_uuid(),
            aggregate_id = %aggregate_id.as_uuid(),
            event_count = tracing::field::Empty
        ),
        err
    )]
    pub async fn load_stream_async(
        &self,
        property_id: PropertyId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             WHERE property_id = $1 AND aggregate_id = $2 \
             ORDER BY sequence_number"
        );

        let rows = sqlx::query(&sql)
            .bind(property_id.as_uuid())
            .bind(aggregate_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_stream", e))?;

        let events = decode_rows(&rows)?;
        Span::current().record("event_count", events.len());
        Ok(events)
    }

    /// Append a batch to one stream under optimistic concurrency.
    #[instrument(
        skip(self, events),
        fields(
            property_id = %property_id.as_uuid(),
            aggregate_id = %aggregate_id.as_uuid(),
            event_count = events.len(),
            expected_version = ?expected_version,
            committed_events = tracing::field::Empty
        ),
        err
    )]
    pub async fn append_events(
        &self,
        property_id: PropertyId,
        aggregate_id: AggregateId,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        for event in &events {
            if event.property_id != property_id {
                return Err(EventStoreError::PropertyIsolation(
                    "batch spans more than one property".to_string(),
                ));
            }
            if event.aggregate_id != aggregate_id {
                return Err(EventStoreError::InvalidAppend(
                    "batch spans more than one aggregate".to_string(),
                ));
            }
        }
        let aggregate_type = events[0].aggregate_type.clone();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        let (current, existing_type) = stream_head(&mut tx, property_id, aggregate_id).await?;

        if let Some(existing) = existing_type.filter(|t| *t != aggregate_type) {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(EventStoreError::AggregateTypeMismatch(format!(
                "stream holds '{existing}', append carried '{aggregate_type}'"
            )));
        }

        if !expected_version.matches(current) {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(EventStoreError::Concurrency(format!(
                "optimistic concurrency check failed: expected {expected_version:?}, found {current}"
            )));
        }

        let mut stored = Vec::with_capacity(events.len());
        for (offset, event) in events.into_iter().enumerate() {
            let sequence = current + 1 + offset as u64;
            insert_event(&mut tx, &event, sequence).await?;

            stored.push(StoredEvent {
                event_id: event.event_id,
                property_id: event.property_id,
                aggregate_id: event.aggregate_id,
                aggregate_type: event.aggregate_type,
                sequence_number: sequence,
                event_type: event.event_type,
                event_version: event.event_version,
                occurred_at: event.occurred_at,
                payload: event.payload,
            });
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;

        Span::current().record("committed_events", stored.len());
        Ok(stored)
    }
}

/// Current version and aggregate type of a stream; `(0, None)` when absent.
async fn stream_head(
    tx: &mut Transaction<'_, Postgres>,
    property_id: PropertyId,
    aggregate_id: AggregateId,
) -> Result<(u64, Option<String>), EventStoreError> {
    let (version, aggregate_type): (i64, Option<String>) = sqlx::query_as(
        "SELECT COALESCE(MAX(sequence_number), 0), MAX(aggregate_type) \
         FROM events WHERE property_id = $1 AND aggregate_id = $2",
    )
    .bind(property_id.as_uuid())
    .bind(aggregate_id.as_uuid())
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("stream_head", e))?;

    Ok((version as u64, aggregate_type))
}

async fn insert_event(
    tx: &mut Transaction<'_, Postgres>,
    event: &UncommittedEvent,
    sequence: u64,
) -> Result<(), EventStoreError> {
    sqlx::query(
        "INSERT INTO events (event_id, property_id, aggregate_id, aggregate_type, \
         sequence_number, event_type, event_version, occurred_at, payload) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(event.event_id)
    .bind(event.property_id.as_uuid())
    .bind(event.aggregate_id.as_uuid())
    .bind(&event.aggregate_type)
    .bind(sequence as i64)
    .bind(&event.event_type)
    .bind(event.event_version as i32)
    .bind(event.occurred_at)
    .bind(&event.payload)
    .execute(&mut **tx)
    .await
    .map(|_| ())
    .map_err(|e| {
        // A unique violation here means another transaction got in between
        // our version read and this insert.
        if is_unique_violation(&e) {
            EventStoreError::Concurrency(format!(
                "concurrent append: sequence {sequence} already taken"
            ))
        } else {
            map_sqlx_error("insert_event", e)
        }
    })
}

/// Rebuild a [`StoredEvent`] from a row selected with [`EVENT_COLUMNS`].
fn decode_event(row: &PgRow) -> Result<StoredEvent, sqlx::Error> {
    let sequence_number: i64 = row.try_get("sequence_number")?;
    let event_version: i32 = row.try_get("event_version")?;

    Ok(StoredEvent {
        event_id: row.try_get("event_id")?,
        property_id: PropertyId::from_uuid(row.try_get("property_id")?),
        aggregate_id: AggregateId::from_uuid(row.try_get("aggregate_id")?),
        aggregate_type: row.try_get("aggregate_type")?,
        sequence_number: sequence_number as u64,
        event_type: row.try_get("event_type")?,
        event_version: event_version as u32,
        occurred_at: row.try_get("occurred_at")?,
        payload: row.try_get("payload")?,
    })
}

fn decode_rows(rows: &[PgRow]) -> Result<Vec<StoredEvent>, EventStoreError> {
    rows.iter()
        .map(decode_event)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| EventStoreError::Storage(format!("decode event row: {e}")))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> EventStoreError {
    match &err {
        sqlx::Error::Database(db) => {
            let msg = format!("{operation}: {}", db.message());
            match db.code().as_deref() {
                Some(UNIQUE_VIOLATION) => EventStoreError::Concurrency(msg),
                Some(FOREIGN_KEY_VIOLATION) | Some(CHECK_VIOLATION) => {
                    EventStoreError::InvalidAppend(msg)
                }
                _ => EventStoreError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            EventStoreError::Storage(format!("{operation}: connection pool closed"))
        }
        other => EventStoreError::Storage(format!("{operation}: {other}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION))
}

/// The blocking [`EventStore`] methods bridge onto the pool through the
/// ambient tokio runtime. They are only ever called from worker threads the
/// API binary spawns inside that runtime.
fn runtime_handle() -> Result<tokio::runtime::Handle, EventStoreError> {
    tokio::runtime::Handle::try_current().map_err(|_| {
        EventStoreError::Storage(
            "PostgresEventStore must be driven from inside a tokio runtime".to_string(),
        )
    })
}

impl EventStore for PostgresEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        let property_id = events[0].property_id;
        let aggregate_id = events[0].aggregate_id;

        runtime_handle()?
            .block_on(self.append_events(property_id, aggregate_id, events, expected_version))
    }

    fn load_stream(
        &self,
        property_id: PropertyId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        runtime_handle()?.block_on(self.load_stream_async(property_id, aggregate_id))
    }
}

/// Optional filters are written `$n IS NULL OR column = $n`, so one
/// parameterized statement covers every combination the events API allows.
const EVENT_FILTER: &str = "property_id = $1 \
     AND ($2::uuid IS NULL OR aggregate_id = $2) \
     AND ($3::text IS NULL OR aggregate_type = $3) \
     AND ($4::text IS NULL OR event_type = $4) \
     AND ($5::timestamptz IS NULL OR occurred_at >= $5) \
     AND ($6::timestamptz IS NULL OR occurred_at <= $6)";

#[async_trait::async_trait]
impl EventQuery for PostgresEventStore {
    async fn query_events(
        &self,
        property_id: PropertyId,
        filter: EventFilter,
        pagination: Pagination,
    ) -> Result<EventQueryResult, EventStoreError> {
        let aggregate_id = filter.aggregate_id.map(|id| *id.as_uuid());
        let aggregate_type = filter.aggregate_type.as_deref();
        let event_type = filter.event_type.as_deref();

        let count_sql = format!("SELECT COUNT(*) FROM events WHERE {EVENT_FILTER}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(property_id.as_uuid())
            .bind(aggregate_id)
            .bind(aggregate_type)
            .bind(event_type)
            .bind(filter.occurred_after)
            .bind(filter.occurred_before)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_events", e))?;

        let page_sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE {EVENT_FILTER} \
             ORDER BY occurred_at DESC, sequence_number \
             LIMIT $7 OFFSET $8"
        );
        let rows = sqlx::query(&page_sql)
            .bind(property_id.as_uuid())
            .bind(aggregate_id)
            .bind(aggregate_type)
            .bind(event_type)
            .bind(filter.occurred_after)
            .bind(filter.occurred_before)
            .bind(pagination.limit as i64)
            .bind(pagination.offset as i64)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("query_events", e))?;

        let events = decode_rows(&rows)?;
        let has_more = total > (pagination.offset + pagination.limit) as i64;

        Ok(EventQueryResult {
            events,
            total: total as u64,
            pagination,
            has_more,
        })
    }

    async fn get_event_by_id(
        &self,
        property_id: PropertyId,
        event_id: uuid::Uuid,
    ) -> Result<Option<StoredEvent>, EventStoreError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             WHERE property_id = $1 AND event_id = $2"
        );

        let row = sqlx::query(&sql)
            .bind(property_id.as_uuid())
            .bind(event_id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_event_by_id", e))?;

        row.as_ref()
            .map(decode_event)
            .transpose()
            .map_err(|e| EventStoreError::Storage(format!("decode event row: {e}")))
    }
}
