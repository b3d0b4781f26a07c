use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use stayforge_core::{PropertyId, StaffId};

use crate::app::errors::json_error;
use crate::context::{OperatorContext, PropertyContext};

/// Establish the property scope for a request.
///
/// Every domain route requires an `X-Property-Id` header carrying the
/// property's UUID. The gateway in front of this service authenticates the
/// caller and injects the header; this layer only parses it. An optional
/// `X-Staff-Id` identifies the staff member for logs.
pub async fn property_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let property_id = match extract_property(req.headers()) {
        Ok(id) => id,
        Err(response) => return response,
    };

    req.extensions_mut()
        .insert(PropertyContext::new(property_id));

    match extract_operator(req.headers()) {
        Ok(Some(operator)) => {
            req.extensions_mut().insert(operator);
        }
        Ok(None) => {}
        Err(response) => return response,
    }

    next.run(req).await
}

fn extract_property(headers: &HeaderMap) -> Result<PropertyId, Response> {
    let header = headers.get("x-property-id").ok_or_else(|| {
        json_error(
            StatusCode::BAD_REQUEST,
            "missing_property",
            "X-Property-Id header is required",
        )
    })?;

    let header = header.to_str().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_property",
            "X-Property-Id must be a UUID",
        )
    })?;

    let uuid = Uuid::parse_str(header.trim()).map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_property",
            "X-Property-Id must be a UUID",
        )
    })?;

    Ok(PropertyId::from_uuid(uuid))
}

fn extract_operator(headers: &HeaderMap) -> Result<Option<OperatorContext>, Response> {
    let Some(header) = headers.get("x-staff-id") else {
        return Ok(None);
    };

    let staff_id = header
        .to_str()
        .ok()
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .map(StaffId::from_uuid)
        .ok_or_else(|| {
            json_error(
                StatusCode::BAD_REQUEST,
                "invalid_staff",
                "X-Staff-Id must be a UUID",
            )
        })?;

    Ok(Some(OperatorContext::new(staff_id)))
}
