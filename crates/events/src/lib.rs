//! Domain events and their distribution.
//!
//! Domain crates define typed event enums implementing [`Event`]; the
//! infrastructure layer wraps them in an [`EventEnvelope`] and hands them to an
//! [`EventBus`]. Delivery is fire-and-forget from the point of view of the
//! operation that produced the event.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
