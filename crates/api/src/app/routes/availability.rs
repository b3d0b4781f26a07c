use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use stayforge_frontdesk::FrontdeskError;
use stayforge_lodging::StayPeriod;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::PropertyContext;

/// Rooms free for the whole `[check_in, check_out)` window, in catalog order.
///
/// The answer is advisory: the reservation desk re-checks the window inside
/// the room's own transaction, so a room listed here can still be lost to a
/// concurrent booking.
pub async fn find_available(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
    Query(query): Query<dto::AvailabilityQuery>,
) -> axum::response::Response {
    let period = match StayPeriod::new(query.check_in, query.check_out) {
        Ok(p) => p,
        Err(e) => return errors::frontdesk_error_to_response(FrontdeskError::from(e)),
    };

    let rooms = services.find_available(property.property_id(), &period);
    let items = rooms
        .into_iter()
        .map(dto::room_summary_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}
