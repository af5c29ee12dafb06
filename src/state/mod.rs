//! Per-entity state kept apart from the entities themselves.

mod manager;
mod record;

pub use manager::{StateChange, StateManager};
pub use record::{EntityState, EntityStatePatch, StateRecord};
