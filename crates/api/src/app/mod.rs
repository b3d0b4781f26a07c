//! Application wiring for the HTTP binary.
//!
//! `services.rs` owns infrastructure setup (store, bus, projections,
//! dispatcher, background workers), `routes/` holds one handler file per
//! domain area, `dto.rs` the request shapes and JSON mappers, and
//! `errors.rs` the uniform error body. [`build_app`] glues them into one
//! router.

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Assemble the full router. Everything except the health probe sits behind
/// the property middleware and therefore requires an `X-Property-Id` header.
pub async fn build_app() -> Router {
    let services = Arc::new(services::build_services().await);

    let scoped = routes::router().layer(
        ServiceBuilder::new()
            .layer(Extension(services))
            .layer(axum::middleware::from_fn(middleware::property_middleware)),
    );

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(scoped)
}
