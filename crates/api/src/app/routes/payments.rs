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
use stayforge_dining::DiningOrderId;
use stayforge_lodging::BookingId;
use stayforge_payments::{
    MarkPaymentFailed, MarkPaymentSucceeded, Payment, PaymentCommand, PaymentId, RecordPayment,
};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::PropertyContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(record_payment).get(list_payments))
        .route("/:id/status", post(set_payment_status))
}

/// Record a payment against a booking or an order. Settlement is reported
/// separately; a successful booking payment confirms the stay downstream.
pub async fn record_payment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
    Json(body): Json<dto::RecordPaymentRequest>,
) -> axum::response::Response {
    let method = match errors::parse_payment_method(&body.method) {
        Ok(m) => m,
        Err(resp) => return resp,
    };
    let booking_id = match body.booking_id.as_deref() {
        Some(s) => match s.parse::<AggregateId>() {
            Ok(v) => Some(BookingId::new(v)),
            Err(_) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_id",
                    "invalid booking id",
                )
            }
        },
        None => None,
    };
    let order_id = match body.order_id.as_deref() {
        Some(s) => match s.parse::<AggregateId>() {
            Ok(v) => Some(DiningOrderId::new(v)),
            Err(_) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_id",
                    "invalid order id",
                )
            }
        },
        None => None,
    };

    let payment_id = PaymentId::new(AggregateId::new());
    let cmd = PaymentCommand::RecordPayment(RecordPayment {
        property_id: property.property_id(),
        payment_id,
        amount: body.amount,
        method,
        reference: body.reference,
        booking_id,
        order_id,
        occurred_at: Utc::now(),
    });

    let committed = match services.dispatch::<Payment>(
        property.property_id(),
        payment_id.0,
        "payments.payment",
        cmd,
        |_p, aggregate_id| Payment::empty(PaymentId::new(aggregate_id)),
    ) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": payment_id.0.to_string(),
            "events_committed": committed.len(),
        })),
    )
        .into_response()
}

/// Settle a payment. Marking a booking-linked payment `succeeded` kicks off
/// the confirmation flow for the stay.
pub async fn set_payment_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::PaymentStatusRequest>,
) -> axum::response::Response {
    let payment_id = match id.parse::<AggregateId>() {
        Ok(v) => PaymentId::new(v),
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid payment id")
        }
    };

    let cmd = match body.status.to_lowercase().as_str() {
        "succeeded" => PaymentCommand::MarkPaymentSucceeded(MarkPaymentSucceeded {
            property_id: property.property_id(),
            payment_id,
            occurred_at: Utc::now(),
        }),
        "failed" => PaymentCommand::MarkPaymentFailed(MarkPaymentFailed {
            property_id: property.property_id(),
            payment_id,
            reason: body.reason,
            occurred_at: Utc::now(),
        }),
        _ => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_status",
                "status must be one of: succeeded, failed",
            )
        }
    };

    let committed = match services.dispatch::<Payment>(
        property.property_id(),
        payment_id.0,
        "payments.payment",
        cmd,
        |_p, aggregate_id| Payment::empty(PaymentId::new(aggregate_id)),
    ) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "id": payment_id.0.to_string(),
            "events_committed": committed.len(),
        })),
    )
        .into_response()
}

pub async fn list_payments(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
) -> axum::response::Response {
    let items = services
        .payments_list(property.property_id())
        .into_iter()
        .map(dto::payment_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}
