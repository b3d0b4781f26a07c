use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stayforge_core::AggregateId;
use stayforge_frontdesk::{GuestRef, ReserveStayRequest};
use stayforge_guests::{ContactDetails, GuestId};
use stayforge_lodging::{BookingId, RoomId};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::PropertyContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_booking).get(list_bookings))
        .route("/:id", get(get_booking))
        .route("/:id/transition", post(transition_booking))
}

/// Reserve a stay. The whole check-then-insert runs inside the room's own
/// transaction, so a 201 here means the dates were free at commit time.
pub async fn create_booking(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
    Json(body): Json<dto::CreateBookingRequest>,
) -> axum::response::Response {
    let room_id = match body.room_id.parse::<AggregateId>() {
        Ok(v) => RoomId::new(v),
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid room id")
        }
    };

    let guest = match (body.guest_id, body.guest) {
        (Some(id), None) => match id.parse::<AggregateId>() {
            Ok(v) => GuestRef::Existing(GuestId::new(v)),
            Err(_) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_id",
                    "invalid guest id",
                )
            }
        },
        (None, Some(inline)) => GuestRef::New {
            full_name: inline.full_name,
            contact: ContactDetails {
                email: inline.email,
                phone: inline.phone,
            },
        },
        _ => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "provide exactly one of guest_id or guest",
            )
        }
    };

    let request = ReserveStayRequest {
        room_id,
        guest,
        check_in: body.check_in,
        check_out: body.check_out,
        walk_in: body.immediate_check_in,
    };

    match services.reserve(property.property_id(), request) {
        Ok(receipt) => (
            StatusCode::CREATED,
            Json(dto::booking_receipt_to_json(receipt)),
        )
            .into_response(),
        Err(e) => errors::frontdesk_error_to_response(e),
    }
}

pub async fn list_bookings(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
    Query(query): Query<dto::BookingListQuery>,
) -> axum::response::Response {
    let status_filter = match query.status.as_deref() {
        Some(s) => match errors::parse_booking_status(s) {
            Ok(v) => Some(v),
            Err(resp) => return resp,
        },
        None => None,
    };
    let room_filter = match query.room_id.as_deref() {
        Some(s) => match s.parse::<AggregateId>() {
            Ok(v) => Some(RoomId::new(v)),
            Err(_) => {
                return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid room id")
            }
        },
        None => None,
    };

    let bookings = services.bookings_list(property.property_id());
    let items = bookings
        .into_iter()
        .filter(|b| status_filter.map_or(true, |s| b.status == s))
        .filter(|b| room_filter.map_or(true, |r| b.room_id == r))
        .map(dto::booking_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_booking(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let booking_id = match parse_booking_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.bookings_get(property.property_id(), &booking_id) {
        Some(b) => (StatusCode::OK, Json(dto::booking_to_json(b))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "booking not found"),
    }
}

/// Drive the stay lifecycle. Transitions into `confirmed` or `checked-in`
/// re-validate the room's calendar before committing.
pub async fn transition_booking(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::TransitionRequest>,
) -> axum::response::Response {
    let booking_id = match parse_booking_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let target = match errors::parse_booking_status(&body.status) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.transition_booking(property.property_id(), booking_id, target) {
        Ok(receipt) => (StatusCode::OK, Json(dto::booking_receipt_to_json(receipt))).into_response(),
        Err(e) => errors::frontdesk_error_to_response(e),
    }
}

fn parse_booking_id(id: &str) -> Result<BookingId, axum::response::Response> {
    id.parse::<AggregateId>()
        .map(BookingId::new)
        .map_err(|_| {
            errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid booking id")
        })
}
