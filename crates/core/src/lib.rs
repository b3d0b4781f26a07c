//! Pure domain primitives shared by every stayforge crate.
//!
//! Nothing in here performs IO or knows about storage, transport or the
//! HTTP surface. Identifiers, the aggregate contracts and the domain error
//! model live at this layer so the business crates can depend on them
//! without dragging in infrastructure.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, PropertyId, StaffId};
pub use value_object::ValueObject;
