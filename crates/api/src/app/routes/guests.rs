use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stayforge_core::AggregateId;
use stayforge_guests::{ContactDetails, GuestId};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::PropertyContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_guest).get(list_guests))
        .route("/:id", get(get_guest))
}

pub async fn register_guest(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
    Json(body): Json<dto::RegisterGuestRequest>,
) -> axum::response::Response {
    let contact = if body.email.is_some() || body.phone.is_some() {
        Some(ContactDetails {
            email: body.email,
            phone: body.phone,
        })
    } else {
        None
    };

    match services.register_guest(property.property_id(), body.full_name, contact, body.notes) {
        Ok(guest_id) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "id": guest_id.0.to_string() })),
        )
            .into_response(),
        Err(e) => errors::frontdesk_error_to_response(e),
    }
}

pub async fn list_guests(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
) -> axum::response::Response {
    let guests = services.guests_list(property.property_id());
    let items = guests
        .into_iter()
        .map(dto::guest_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_guest(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let guest_id = match id.parse::<AggregateId>() {
        Ok(v) => GuestId::new(v),
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid guest id")
        }
    };
    match services.guests_get(property.property_id(), &guest_id) {
        Some(g) => (StatusCode::OK, Json(dto::guest_to_json(g))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "guest not found"),
    }
}
