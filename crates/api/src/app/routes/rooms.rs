use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use stayforge_core::AggregateId;
use stayforge_frontdesk::RegisterRoomRequest;
use stayforge_lodging::{
    ChangeNightlyRate, ChangeRoomStatus, Room, RoomCommand, RoomId, UpdateRoomDetails,
};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::PropertyContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_room).get(list_rooms))
        .route("/:id", get(get_room).put(update_room))
        .route("/:id/rate", post(change_rate))
        .route("/:id/status", post(change_status))
}

pub async fn register_room(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
    Json(body): Json<dto::CreateRoomRequest>,
) -> axum::response::Response {
    let request = RegisterRoomRequest {
        room_number: body.room_number,
        room_type: body.room_type,
        nightly_rate: body.nightly_rate,
        amenities: body.amenities,
        images: body.images,
    };

    match services.register_room(property.property_id(), request) {
        Ok(room_id) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "id": room_id.0.to_string() })),
        )
            .into_response(),
        Err(e) => errors::frontdesk_error_to_response(e),
    }
}

pub async fn list_rooms(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
) -> axum::response::Response {
    let mut rooms = services.rooms_list(property.property_id());
    rooms.sort_by(|a, b| a.room_number.cmp(&b.room_number));
    let items = rooms.into_iter().map(dto::room_to_json).collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_room(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let room_id = match parse_room_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.rooms_get(property.property_id(), &room_id) {
        Some(rm) => (StatusCode::OK, Json(dto::room_to_json(rm))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "room not found"),
    }
}

pub async fn update_room(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateRoomRequest>,
) -> axum::response::Response {
    let room_id = match parse_room_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = RoomCommand::UpdateRoomDetails(UpdateRoomDetails {
        property_id: property.property_id(),
        room_id,
        room_type: body.room_type,
        amenities: body.amenities,
        images: body.images,
        occurred_at: Utc::now(),
    });

    let committed = match services.dispatch::<Room>(
        property.property_id(),
        room_id.0,
        "lodging.room",
        cmd,
        |_p, aggregate_id| Room::empty(RoomId::new(aggregate_id)),
    ) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "id": room_id.0.to_string(),
            "events_committed": committed.len(),
        })),
    )
        .into_response()
}

pub async fn change_rate(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ChangeRateRequest>,
) -> axum::response::Response {
    let room_id = match parse_room_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = RoomCommand::ChangeNightlyRate(ChangeNightlyRate {
        property_id: property.property_id(),
        room_id,
        nightly_rate: body.nightly_rate,
        occurred_at: Utc::now(),
    });

    let committed = match services.dispatch::<Room>(
        property.property_id(),
        room_id.0,
        "lodging.room",
        cmd,
        |_p, aggregate_id| Room::empty(RoomId::new(aggregate_id)),
    ) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "id": room_id.0.to_string(),
            "events_committed": committed.len(),
        })),
    )
        .into_response()
}

pub async fn change_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ChangeRoomStatusRequest>,
) -> axum::response::Response {
    let room_id = match parse_room_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let status = match errors::parse_room_status(&body.status) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let cmd = RoomCommand::ChangeRoomStatus(ChangeRoomStatus {
        property_id: property.property_id(),
        room_id,
        status,
        occurred_at: Utc::now(),
    });

    let committed = match services.dispatch::<Room>(
        property.property_id(),
        room_id.0,
        "lodging.room",
        cmd,
        |_p, aggregate_id| Room::empty(RoomId::new(aggregate_id)),
    ) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "id": room_id.0.to_string(),
            "events_committed": committed.len(),
        })),
    )
        .into_response()
}

fn parse_room_id(id: &str) -> Result<RoomId, axum::response::Response> {
    id.parse::<AggregateId>()
        .map(RoomId::new)
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid room id"))
}
