//! Projection cursor/offset persistence.
//!
//! This module provides persistence for projection cursors (checkpoints) that
//! track the last processed sequence_number per (property, aggregate) stream.
//! This enables:
//! - Idempotent projections (replays <= cursor are ignored)
//! - Resume after crash (projections can continue from last offset)
//! - Deterministic rebuilds (clear offsets and replay from scratch)

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use sqlx::{PgPool, Row};
use stayforge_core::{AggregateId, PropertyId};

use super::ProjectionError;

/// Projection cursor store for persisting offsets.
pub trait ProjectionCursorStore: Send + Sync {
    /// Get the last processed sequence_number for a (property, aggregate, projection) stream.
    fn get_cursor(
        &self,
        property_id: PropertyId,
        aggregate_id: AggregateId,
        projection_name: &str,
    ) -> Option<u64>;

    /// Update the cursor to a new sequence_number.
    fn update_cursor(
        &self,
        property_id: PropertyId,
        aggregate_id: AggregateId,
        projection_name: &str,
        sequence_number: u64,
    );

    /// Clear all cursors for a property + projection (for rebuilds).
    fn clear_cursors(&self, property_id: PropertyId, projection_name: &str);
}

/// No-op cursor store: cursors live only in the projection's memory.
pub struct InMemoryCursorStore;

impl ProjectionCursorStore for InMemoryCursorStore {
    fn get_cursor(
        &self,
        _property_id: PropertyId,
        _aggregate_id: AggregateId,
        _projection_name: &str,
    ) -> Option<u64> {
        None
    }

    fn update_cursor(
        &self,
        _property_id: PropertyId,
        _aggregate_id: AggregateId,
        _projection_name: &str,
        _sequence_number: u64,
    ) {
    }

    fn clear_cursors(&self, _property_id: PropertyId, _projection_name: &str) {}
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct CursorKey {
    property_id: PropertyId,
    aggregate_id: AggregateId,
}

/// Outcome of a cursor check for an incoming envelope.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CursorCheck {
    /// The envelope is the next event for its stream; apply it.
    Apply,
    /// Duplicate or replay at or below the cursor; safe to ignore.
    Skip,
}

/// Per-stream cursor bookkeeping shared by every projection.
///
/// Tracks the last applied sequence number per (property, aggregate) stream,
/// optionally mirrored to a `ProjectionCursorStore` so a projection can resume
/// after restart instead of replaying from scratch. When a persistent store is
/// attached, reads go to it; writes land in both.
pub struct StreamCursors {
    cursors: RwLock<HashMap<CursorKey, u64>>,
    cursor_store: Option<Arc<dyn ProjectionCursorStore>>,
    projection_name: String,
}

impl StreamCursors {
    pub fn new(projection_name: impl Into<String>) -> Self {
        Self {
            cursors: RwLock::new(HashMap::new()),
            cursor_store: None,
            projection_name: projection_name.into(),
        }
    }

    pub fn with_persistent(
        projection_name: impl Into<String>,
        cursor_store: Arc<dyn ProjectionCursorStore>,
    ) -> Self {
        Self {
            cursors: RwLock::new(HashMap::new()),
            cursor_store: Some(cursor_store),
            projection_name: projection_name.into(),
        }
    }

    pub fn projection_name(&self) -> &str {
        &self.projection_name
    }

    fn last(&self, property_id: PropertyId, aggregate_id: AggregateId) -> u64 {
        if let Some(ref cursor_store) = self.cursor_store {
            cursor_store
                .get_cursor(property_id, aggregate_id, &self.projection_name)
                .unwrap_or(0)
        } else {
            match self.cursors.read() {
                Ok(cursors) => *cursors
                    .get(&CursorKey {
                        property_id,
                        aggregate_id,
                    })
                    .unwrap_or(&0),
                Err(_) => 0,
            }
        }
    }

    /// Decide whether an envelope at `seq` should be applied, skipped, or
    /// rejected.
    ///
    /// The first event on a fresh stream may carry any positive sequence
    /// (a projection can attach mid-stream after a rebuild); after that,
    /// strictly monotonic increments are enforced.
    pub fn check(
        &self,
        property_id: PropertyId,
        aggregate_id: AggregateId,
        seq: u64,
    ) -> Result<CursorCheck, ProjectionError> {
        let last = self.last(property_id, aggregate_id);

        if seq == 0 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }
        if seq <= last {
            return Ok(CursorCheck::Skip);
        }
        if seq != last + 1 && last != 0 {
            return Err(ProjectionError::NonMonotonicSequence { last, found: seq });
        }

        Ok(CursorCheck::Apply)
    }

    /// Advance the cursor after a successful apply.
    pub fn advance(&self, property_id: PropertyId, aggregate_id: AggregateId, seq: u64) {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.insert(
                CursorKey {
                    property_id,
                    aggregate_id,
                },
                seq,
            );
        }
        if let Some(ref cursor_store) = self.cursor_store {
            cursor_store.update_cursor(property_id, aggregate_id, &self.projection_name, seq);
        }
    }

    /// Drop all cursors for a property (rebuild support).
    pub fn clear(&self, property_id: PropertyId) {
        if let Ok(mut cursors) = self.cursors.write() {
            cursors.retain(|k, _| k.property_id != property_id);
        }
        if let Some(ref cursor_store) = self.cursor_store {
            cursor_store.clear_cursors(property_id, &self.projection_name);
        }
    }
}

/// Postgres-backed projection cursor store.
pub struct PostgresCursorStore {
    pool: Arc<PgPool>,
}

impl PostgresCursorStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the projection_offsets table if missing. Called once at startup
    /// in persistent mode.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS projection_offsets (
                property_id UUID NOT NULL,
                aggregate_id UUID NOT NULL,
                projection_name TEXT NOT NULL,
                last_sequence_number BIGINT NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (property_id, aggregate_id, projection_name)
            )
            "#,
        )
        .execute(&*self.pool)
        .await?;
        Ok(())
    }
}

impl ProjectionCursorStore for PostgresCursorStore {
    fn get_cursor(
        &self,
        property_id: PropertyId,
        aggregate_id: AggregateId,
        projection_name: &str,
    ) -> Option<u64> {
        let handle = tokio::runtime::Handle::try_current().ok()?;
        let pool = self.pool.clone();
        let property_uuid = property_id.as_uuid();
        let aggregate_uuid = aggregate_id.as_uuid();
        let projection_name = projection_name.to_string();

        handle.block_on(async {
            match sqlx::query(
                r#"
                SELECT last_sequence_number
                FROM projection_offsets
                WHERE property_id = $1 AND aggregate_id = $2 AND projection_name = $3
                "#,
            )
            .bind(property_uuid)
            .bind(aggregate_uuid)
            .bind(&projection_name)
            .fetch_optional(&*pool)
            .await
            {
                Ok(Some(row)) => match row.try_get::<i64, _>("last_sequence_number") {
                    Ok(seq) => Some(seq as u64),
                    Err(_) => None,
                },
                Ok(None) => None,
                Err(_) => None,
            }
        })
    }

    fn update_cursor(
        &self,
        property_id: PropertyId,
        aggregate_id: AggregateId,
        projection_name: &str,
        sequence_number: u64,
    ) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => return,
        };

        let pool = self.pool.clone();
        let property_uuid = property_id.as_uuid();
        let aggregate_uuid = aggregate_id.as_uuid();
        let projection_name = projection_name.to_string();

        let _ = handle.block_on(async {
            let _ = sqlx::query(
                r#"
                INSERT INTO projection_offsets (
                    property_id,
                    aggregate_id,
                    projection_name,
                    last_sequence_number
                )
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (property_id, aggregate_id, projection_name)
                DO UPDATE SET
                    last_sequence_number = EXCLUDED.last_sequence_number,
                    updated_at = NOW()
                "#,
            )
            .bind(property_uuid)
            .bind(aggregate_uuid)
            .bind(&projection_name)
            .bind(sequence_number as i64)
            .execute(&*pool)
            .await;
        });
    }

    fn clear_cursors(&self, property_id: PropertyId, projection_name: &str) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => return,
        };

        let pool = self.pool.clone();
        let property_uuid = property_id.as_uuid();
        let projection_name = projection_name.to_string();

        let _ = handle.block_on(async {
            let _ = sqlx::query(
                "DELETE FROM projection_offsets WHERE property_id = $1 AND projection_name = $2",
            )
            .bind(property_uuid)
            .bind(&projection_name)
            .execute(&*pool)
            .await;
        });
    }
}
