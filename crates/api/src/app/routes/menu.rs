use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::Utc;

use stayforge_core::AggregateId;
use stayforge_menu::{
    AddMenuItem, ChangeItemPrice, MenuItem, MenuItemCommand, MenuItemId, SetItemAvailability,
};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::PropertyContext;

pub fn router() -> Router {
    Router::new()
        .route("/items", post(add_item).get(list_items))
        .route("/items/:id/price", post(change_price))
        .route("/items/:id/availability", post(set_availability))
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
    Json(body): Json<dto::AddMenuItemRequest>,
) -> axum::response::Response {
    let item_id = MenuItemId::new(AggregateId::new());
    let cmd = MenuItemCommand::AddMenuItem(AddMenuItem {
        property_id: property.property_id(),
        item_id,
        name: body.name,
        category: body.category,
        price: body.price,
        description: body.description,
        occurred_at: Utc::now(),
    });

    let committed = match services.dispatch::<MenuItem>(
        property.property_id(),
        item_id.0,
        "menu.item",
        cmd,
        |_p, aggregate_id| MenuItem::empty(MenuItemId::new(aggregate_id)),
    ) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": item_id.0.to_string(),
            "events_committed": committed.len(),
        })),
    )
        .into_response()
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
) -> axum::response::Response {
    let items = services
        .menu_list(property.property_id())
        .into_iter()
        .map(dto::menu_item_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn change_price(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ChangeItemPriceRequest>,
) -> axum::response::Response {
    let item_id = match parse_item_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = MenuItemCommand::ChangeItemPrice(ChangeItemPrice {
        property_id: property.property_id(),
        item_id,
        price: body.price,
        occurred_at: Utc::now(),
    });

    let committed = match services.dispatch::<MenuItem>(
        property.property_id(),
        item_id.0,
        "menu.item",
        cmd,
        |_p, aggregate_id| MenuItem::empty(MenuItemId::new(aggregate_id)),
    ) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "id": item_id.0.to_string(),
            "events_committed": committed.len(),
        })),
    )
        .into_response()
}

pub async fn set_availability(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetItemAvailabilityRequest>,
) -> axum::response::Response {
    let item_id = match parse_item_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = MenuItemCommand::SetItemAvailability(SetItemAvailability {
        property_id: property.property_id(),
        item_id,
        available: body.available,
        occurred_at: Utc::now(),
    });

    let committed = match services.dispatch::<MenuItem>(
        property.property_id(),
        item_id.0,
        "menu.item",
        cmd,
        |_p, aggregate_id| MenuItem::empty(MenuItemId::new(aggregate_id)),
    ) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "id": item_id.0.to_string(),
            "events_committed": committed.len(),
        })),
    )
        .into_response()
}

fn parse_item_id(id: &str) -> Result<MenuItemId, axum::response::Response> {
    id.parse::<AggregateId>()
        .map(MenuItemId::new)
        .map_err(|_| {
            errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid menu item id")
        })
}
