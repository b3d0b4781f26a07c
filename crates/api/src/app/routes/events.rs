//! Read-only event stream inspection for reporting and audit.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use stayforge_core::AggregateId;
use stayforge_infra::event_store::{EventFilter, EventQueryResult, Pagination, StoredEvent};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PropertyContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_events))
        .route("/aggregates/:id", get(get_aggregate_events))
        .route("/:event_id", get(get_event))
}

/// Filters and paging accepted by the list endpoints. All optional; an empty
/// query returns the newest page of everything the property has recorded.
#[derive(Debug, Deserialize)]
pub struct EventListQuery {
    pub aggregate_id: Option<String>,
    pub aggregate_type: Option<String>,
    pub event_type: Option<String>,
    pub occurred_after: Option<DateTime<Utc>>,
    pub occurred_before: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl EventListQuery {
    fn pagination(&self) -> Pagination {
        Pagination::new(self.limit, self.offset)
    }

    /// Turn the raw query into a store filter. A malformed `aggregate_id`
    /// is a client error, not an empty result.
    fn filter(self) -> Result<EventFilter, Response> {
        let aggregate_id = self
            .aggregate_id
            .as_deref()
            .map(str::parse::<AggregateId>)
            .transpose()
            .map_err(|_| {
                errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_id",
                    "invalid aggregate id filter",
                )
            })?;

        Ok(EventFilter {
            aggregate_id,
            aggregate_type: self.aggregate_type,
            event_type: self.event_type,
            occurred_after: self.occurred_after,
            occurred_before: self.occurred_before,
        })
    }
}

pub async fn list_events(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
    Query(query): Query<EventListQuery>,
) -> Response {
    let pagination = query.pagination();
    let filter = match query.filter() {
        Ok(filter) => filter,
        Err(rejection) => return rejection,
    };

    match services
        .query_events(property.property_id(), filter, pagination)
        .await
    {
        Ok(result) => page_response(&result),
        Err(e) => query_failure(e),
    }
}

pub async fn get_aggregate_events(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
    Path(id): Path<String>,
    Query(query): Query<EventListQuery>,
) -> Response {
    let Ok(aggregate_id) = id.parse::<AggregateId>() else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid aggregate id");
    };

    match services
        .get_aggregate_events(property.property_id(), aggregate_id, Some(query.pagination()))
        .await
    {
        Ok(result) => page_response(&result),
        Err(e) => query_failure(e),
    }
}

pub async fn get_event(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
    Path(id): Path<String>,
) -> Response {
    let Ok(event_id) = id.parse::<uuid::Uuid>() else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid event id");
    };

    match services.get_event_by_id(property.property_id(), event_id).await {
        Ok(Some(event)) => (StatusCode::OK, Json(stored_event_json(&event))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "event not found"),
        Err(e) => query_failure(e),
    }
}

/// Paginated envelope shared by both list endpoints.
fn page_response(result: &EventQueryResult) -> Response {
    let events = result.events.iter().map(stored_event_json).collect::<Vec<_>>();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "events": events,
            "total": result.total,
            "pagination": {
                "limit": result.pagination.limit,
                "offset": result.pagination.offset,
            },
            "has_more": result.has_more,
        })),
    )
        .into_response()
}

fn query_failure(e: impl std::fmt::Display) -> Response {
    errors::json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        format!("event query failed: {e}"),
    )
}

fn stored_event_json(event: &StoredEvent) -> serde_json::Value {
    serde_json::json!({
        "event_id": event.event_id.to_string(),
        "property_id": event.property_id.to_string(),
        "aggregate_id": event.aggregate_id.to_string(),
        "aggregate_type": event.aggregate_type,
        "sequence_number": event.sequence_number,
        "event_type": event.event_type,
        "event_version": event.event_version,
        "occurred_at": event.occurred_at.to_rfc3339(),
        "payload": event.payload,
    })
}
