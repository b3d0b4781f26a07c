use axum::{routing::get, Router};

pub mod availability;
pub mod bookings;
pub mod events;
pub mod guests;
pub mod menu;
pub mod orders;
pub mod payments;
pub mod rooms;
pub mod system;

/// Router for all property-scoped endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/stream", get(system::stream))
        .route("/availability", get(availability::find_available))
        .nest("/rooms", rooms::router())
        .nest("/guests", guests::router())
        .nest("/bookings", bookings::router())
        .nest("/menu", menu::router())
        .nest("/orders", orders::router())
        .nest("/payments", payments::router())
        .nest("/events", events::router())
}
