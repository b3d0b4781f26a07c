//! HTTP surface of the platform: router assembly, request context and the
//! mapping between wire shapes and the frontdesk services.

pub mod app;
pub mod context;
pub mod middleware;
