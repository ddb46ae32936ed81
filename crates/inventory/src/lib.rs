//! Inventory domain module.
//!
//! This crate contains the business rules for inventory units and their
//! movement audit records, implemented purely as deterministic domain logic
//! (no IO, no HTTP, no storage). Every mutator takes the current time as an
//! argument so callers decide what "now" is.

pub mod condition;
pub mod event;
pub mod movement;
pub mod unit;

pub use condition::{Condition, Status};
pub use event::{
    InventoryEvent, UnitArchived, UnitCreated, UnitMoved, UnitQuantityChanged, UnitRestored,
    UnitStatusChanged, UnitUpdated,
};
pub use movement::{Movement, NewMovement, Placement};
pub use unit::{InventoryUnit, InventoryUnitParts, InventoryUpdate, NewInventoryUnit, UnitDetails};
