//! `stayforge-events` — event mechanics shared by all platform modules.
//!
//! Contains the event/envelope contracts, the pub/sub bus abstraction and
//! saga contracts. No business rules live here.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;
pub mod saga;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use saga::{Saga, SagaAction};
