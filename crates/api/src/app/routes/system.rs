//! Liveness, request identity and the realtime feed.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::Extension;
use axum::response::{sse::Event as SseEvent, IntoResponse, Sse};
use axum::Json;
use tokio_stream::Stream;

use crate::app::services::{self, AppServices};
use crate::context::{OperatorContext, PropertyContext};

/// Liveness probe. The only route outside the property middleware.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Echo the property and staff identity a request resolved to. `staff_id`
/// is null when the caller sent no `X-Staff-Id` header.
pub async fn whoami(
    Extension(property): Extension<PropertyContext>,
    operator: Option<Extension<OperatorContext>>,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "property_id": property.property_id().to_string(),
        "staff_id": operator.map(|Extension(op)| op.staff_id().to_string()),
    }))
}

/// Server-sent events feed of this property's activity.
pub async fn stream(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(property): Extension<PropertyContext>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    services::property_sse_stream(services, property.property_id())
}
