//! `stayforge-infra` — infrastructure for the event-sourced hotel platform.
//!
//! Event store implementations (in-memory and Postgres), the command dispatch
//! pipeline, read-model projections, background jobs and sagas.
//! No business rules live here; those belong to the platform crates.

pub mod command_dispatcher;
pub mod event_store;
pub mod jobs;
pub mod projections;
pub mod read_model;
pub mod saga;

#[cfg(test)]
mod integration_tests;
