use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stayforge_dining::DiningOrderStatus;
use stayforge_frontdesk::FrontdeskError;
use stayforge_infra::command_dispatcher::DispatchError;
use stayforge_lodging::{BookingStatus, RoomStatus};
use stayforge_payments::PaymentMethod;

/// Map a frontdesk error onto the wire taxonomy.
///
/// The four domain codes cover every operation outcome: `validation_error`
/// (400), `not_found` (404), `conflict` (409), `internal_error` (500).
pub fn frontdesk_error_to_response(err: FrontdeskError) -> axum::response::Response {
    let status = match &err {
        FrontdeskError::Validation(_) => StatusCode::BAD_REQUEST,
        FrontdeskError::NotFound(_) => StatusCode::NOT_FOUND,
        FrontdeskError::Conflict(_) => StatusCode::CONFLICT,
        FrontdeskError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let code = err.code();
    json_error(status, code, err.to_string())
}

/// Map a raw dispatch error for routes that talk to the dispatcher directly
/// (catalog maintenance, payments) rather than through a frontdesk service.
pub fn dispatch_error_to_response(err: DispatchError) -> axum::response::Response {
    frontdesk_error_to_response(FrontdeskError::from(err))
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn parse_booking_status(s: &str) -> Result<BookingStatus, axum::response::Response> {
    match s.to_lowercase().as_str() {
        "pending" => Ok(BookingStatus::Pending),
        "confirmed" => Ok(BookingStatus::Confirmed),
        "checked-in" | "checked_in" => Ok(BookingStatus::CheckedIn),
        "completed" => Ok(BookingStatus::Completed),
        "cancelled" => Ok(BookingStatus::Cancelled),
        _ => Err(json_error(
            StatusCode::BAD_REQUEST,
            "invalid_status",
            "status must be one of: pending, confirmed, checked-in, completed, cancelled",
        )),
    }
}

pub fn parse_room_status(s: &str) -> Result<RoomStatus, axum::response::Response> {
    match s.to_lowercase().as_str() {
        "available" => Ok(RoomStatus::Available),
        "occupied" => Ok(RoomStatus::Occupied),
        "maintenance" => Ok(RoomStatus::Maintenance),
        "cleaning" => Ok(RoomStatus::Cleaning),
        "reserved" => Ok(RoomStatus::Reserved),
        _ => Err(json_error(
            StatusCode::BAD_REQUEST,
            "invalid_status",
            "status must be one of: available, occupied, maintenance, cleaning, reserved",
        )),
    }
}

pub fn parse_order_status(s: &str) -> Result<DiningOrderStatus, axum::response::Response> {
    match s.to_lowercase().as_str() {
        "pending" => Ok(DiningOrderStatus::Pending),
        "completed" => Ok(DiningOrderStatus::Completed),
        "cancelled" => Ok(DiningOrderStatus::Cancelled),
        _ => Err(json_error(
            StatusCode::BAD_REQUEST,
            "invalid_status",
            "status must be one of: pending, completed, cancelled",
        )),
    }
}

pub fn parse_payment_method(s: &str) -> Result<PaymentMethod, axum::response::Response> {
    match s.to_lowercase().as_str() {
        "cash" => Ok(PaymentMethod::Cash),
        "card" => Ok(PaymentMethod::Card),
        "transfer" => Ok(PaymentMethod::Transfer),
        _ => Err(json_error(
            StatusCode::BAD_REQUEST,
            "invalid_method",
            "method must be one of: cash, card, transfer",
        )),
    }
}
