use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stayforge_core::AggregateId;
use stayforge_dining::DiningOrderId;
use stayforge_frontdesk::{OpenOrderRequest, OrderLineRequest};
use stayforge_guests::GuestId;
use stayforge_lodging::RoomId;
use stayforge_menu::MenuItemId;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::PropertyContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id/transition", post(transition_order))
}

/// Open a dining order. Every line is priced from the menu at this instant
/// and the whole order commits or none of it does.
pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
    Json(body): Json<dto::CreateOrderRequest>,
) -> axum::response::Response {
    let guest_id = match body.guest_id.as_deref() {
        Some(s) => match s.parse::<AggregateId>() {
            Ok(v) => Some(GuestId::new(v)),
            Err(_) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_id",
                    "invalid guest id",
                )
            }
        },
        None => None,
    };
    let room_id = match body.room_id.as_deref() {
        Some(s) => match s.parse::<AggregateId>() {
            Ok(v) => Some(RoomId::new(v)),
            Err(_) => {
                return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid room id")
            }
        },
        None => None,
    };

    let mut lines = Vec::with_capacity(body.lines.len());
    for line in body.lines {
        let menu_item_id = match line.menu_item_id.parse::<AggregateId>() {
            Ok(v) => MenuItemId::new(v),
            Err(_) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_id",
                    "invalid menu item id",
                )
            }
        };
        lines.push(OrderLineRequest {
            menu_item_id,
            quantity: line.quantity,
        });
    }

    let request = OpenOrderRequest {
        guest_id,
        room_id,
        lines,
    };

    match services.open_order(property.property_id(), request) {
        Ok(receipt) => (
            StatusCode::CREATED,
            Json(dto::order_receipt_to_json(receipt)),
        )
            .into_response(),
        Err(e) => errors::frontdesk_error_to_response(e),
    }
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
) -> axum::response::Response {
    let items = services
        .orders_list(property.property_id())
        .into_iter()
        .map(dto::order_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.orders_get(property.property_id(), &order_id) {
        Some(o) => (StatusCode::OK, Json(dto::order_to_json(o))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "order not found"),
    }
}

pub async fn transition_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::TransitionRequest>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let target = match errors::parse_order_status(&body.status) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.transition_order(property.property_id(), order_id, target) {
        Ok(status) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "id": order_id.0.to_string(),
                "status": status,
            })),
        )
            .into_response(),
        Err(e) => errors::frontdesk_error_to_response(e),
    }
}

fn parse_order_id(id: &str) -> Result<DiningOrderId, axum::response::Response> {
    id.parse::<AggregateId>()
        .map(DiningOrderId::new)
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"))
}
