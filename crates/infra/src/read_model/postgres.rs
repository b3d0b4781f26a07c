//! Postgres-backed read model storage.
//!
//! Persistent booking read models in PostgreSQL, implementing the
//! `PropertyStore` trait for property-isolated key/value storage. Read models
//! are disposable: `clear_property()` plus a projection rebuild restores the
//! table from the event streams.

use std::sync::Arc;
use tracing::Span;

use sqlx::{postgres::PgRow, PgPool, Row};
use stayforge_core::{AggregateId, PropertyId};
use stayforge_lodging::{BookingId, BookingStatus, RoomId};

use crate::projections::bookings::BookingReadModel;
use stayforge_guests::GuestId;

use super::PropertyStore;

/// Postgres-backed store for `BookingReadModel`, mapped to the `bookings` table.
///
/// Every query includes `property_id` in the WHERE clause or as part of the
/// primary key, so cross-property access is structurally impossible. The
/// `PropertyStore` trait is synchronous; operations bridge into async via the
/// ambient tokio runtime, matching how the Postgres event store does it.
pub struct PostgresBookingStore {
    pool: Arc<PgPool>,
}

impl PostgresBookingStore {
    /// Create a new PostgresBookingStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the bookings table if missing. Called once at startup in
    /// persistent mode.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bookings (
                property_id UUID NOT NULL,
                booking_id UUID NOT NULL,
                room_id UUID NOT NULL,
                guest_id UUID NOT NULL,
                check_in DATE NOT NULL,
                check_out DATE NOT NULL,
                status TEXT NOT NULL,
                nightly_rate BIGINT NOT NULL,
                nights INT NOT NULL,
                total_amount BIGINT NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (property_id, booking_id)
            )
            "#,
        )
        .execute(&*self.pool)
        .await?;
        Ok(())
    }
}

/// Booking statuses are stored as their wire names ("checked-in", not
/// "CheckedIn") so the column stays greppable alongside API payloads.
fn status_to_text(status: BookingStatus) -> Option<String> {
    match serde_json::to_value(status).ok()? {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    }
}

fn status_from_text(text: &str) -> Option<BookingStatus> {
    serde_json::from_value(serde_json::Value::String(text.to_string())).ok()
}

fn booking_from_row(row: &PgRow) -> Option<BookingReadModel> {
    let status_text: String = row.try_get("status").ok()?;
    Some(BookingReadModel {
        booking_id: BookingId(AggregateId::from_uuid(row.try_get("booking_id").ok()?)),
        room_id: RoomId(AggregateId::from_uuid(row.try_get("room_id").ok()?)),
        guest_id: GuestId(AggregateId::from_uuid(row.try_get("guest_id").ok()?)),
        check_in: row.try_get("check_in").ok()?,
        check_out: row.try_get("check_out").ok()?,
        status: status_from_text(&status_text)?,
        nightly_rate: row.try_get::<i64, _>("nightly_rate").ok()? as u64,
        nights: row.try_get::<i32, _>("nights").ok()? as u32,
        total_amount: row.try_get::<i64, _>("total_amount").ok()? as u64,
    })
}

impl PropertyStore<BookingId, BookingReadModel> for PostgresBookingStore {
    fn get(&self, property_id: PropertyId, key: &BookingId) -> Option<BookingReadModel> {
        let handle = tokio::runtime::Handle::try_current().ok()?;
        let pool = self.pool.clone();
        let property_uuid = property_id.as_uuid();
        let booking_uuid = key.0.as_uuid();

        handle.block_on(async {
            let span = Span::current();
            span.record("operation", "get_booking");

            match sqlx::query(
                r#"
                SELECT
                    booking_id,
                    room_id,
                    guest_id,
                    check_in,
                    check_out,
                    status,
                    nightly_rate,
                    nights,
                    total_amount
                FROM bookings
                WHERE property_id = $1 AND booking_id = $2
                "#,
            )
            .bind(property_uuid)
            .bind(booking_uuid)
            .fetch_optional(&*pool)
            .await
            {
                Ok(Some(row)) => booking_from_row(&row),
                Ok(None) => None,
                Err(_) => None,
            }
        })
    }

    fn upsert(&self, property_id: PropertyId, key: BookingId, value: BookingReadModel) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => return,
        };
        let Some(status_text) = status_to_text(value.status) else {
            return;
        };

        let pool = self.pool.clone();
        let property_uuid = property_id.as_uuid();
        let booking_uuid = key.0.as_uuid();

        let _ = handle.block_on(async {
            let span = Span::current();
            span.record("operation", "upsert_booking");

            let _ = sqlx::query(
                r#"
                INSERT INTO bookings (
                    property_id,
                    booking_id,
                    room_id,
                    guest_id,
                    check_in,
                    check_out,
                    status,
                    nightly_rate,
                    nights,
                    total_amount
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (property_id, booking_id)
                DO UPDATE SET
                    room_id = EXCLUDED.room_id,
                    guest_id = EXCLUDED.guest_id,
                    check_in = EXCLUDED.check_in,
                    check_out = EXCLUDED.check_out,
                    status = EXCLUDED.status,
                    nightly_rate = EXCLUDED.nightly_rate,
                    nights = EXCLUDED.nights,
                    total_amount = EXCLUDED.total_amount,
                    updated_at = NOW()
                "#,
            )
            .bind(property_uuid)
            .bind(booking_uuid)
            .bind(value.room_id.0.as_uuid())
            .bind(value.guest_id.0.as_uuid())
            .bind(value.check_in)
            .bind(value.check_out)
            .bind(&status_text)
            .bind(value.nightly_rate as i64)
            .bind(value.nights as i32)
            .bind(value.total_amount as i64)
            .execute(&*pool)
            .await;
        });
    }

    fn list(&self, property_id: PropertyId) -> Vec<BookingReadModel> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => return vec![],
        };

        let pool = self.pool.clone();
        let property_uuid = property_id.as_uuid();

        handle.block_on(async {
            let span = Span::current();
            span.record("operation", "list_bookings");

            match sqlx::query(
                r#"
                SELECT
                    booking_id,
                    room_id,
                    guest_id,
                    check_in,
                    check_out,
                    status,
                    nightly_rate,
                    nights,
                    total_amount
                FROM bookings
                WHERE property_id = $1
                ORDER BY updated_at DESC
                "#,
            )
            .bind(property_uuid)
            .fetch_all(&*pool)
            .await
            {
                Ok(rows) => rows.iter().filter_map(booking_from_row).collect(),
                Err(_) => vec![],
            }
        })
    }

    fn clear_property(&self, property_id: PropertyId) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => return,
        };

        let pool = self.pool.clone();
        let property_uuid = property_id.as_uuid();

        let _ = handle.block_on(async {
            let span = Span::current();
            span.record("operation", "clear_property_bookings");

            let _ = sqlx::query("DELETE FROM bookings WHERE property_id = $1")
                .bind(property_uuid)
                .execute(&*pool)
                .await;
        });
    }
}
