//! # Entwine
//!
//! Reactive entity stores for Rust.
//!
//! Entwine keeps a keyed collection of entities together with the things
//! applications derive from it:
//!
//! ## Stores and state
//!
//! - `Store<E, S>` - Keyed entity index with synchronous change notification
//! - `StateManager<E, S>` - Per-entity state records kept apart from the entities
//! - `View<E, R>` - Filtered, sorted and joined projections, recomputed on demand
//!
//! ## Synchronization
//!
//! - `Strategy<E, S>` - Activatable units bound to one or more stores
//! - `LoadingStrategy` - Mirrors a store into an external `SyncTarget`
//! - `diff` - Revision-based reconciliation between a store and a surface
//!
//! ## Primitives
//!
//! - `Signal<T>` - Replay-last reactive value with RAII watchers
//! - `Selector<E>` - At most one active entity, with history
//!
//! Everything here is single-threaded: handles are `Rc`-based and every
//! notification chain completes before the mutating call returns.

pub mod entity;
pub mod error;
pub mod selector;
pub mod signal;
pub mod state;
pub mod store;
pub mod strategy;
pub mod sync;
pub mod view;

// Re-export main types for convenience
pub use entity::{EntityKey, EntityRecord, StoreOptions};
pub use error::{Result, StoreError};
pub use selector::{Selector, SelectorOptions};
pub use signal::{Observable, Signal, WatchGuard};
pub use state::{EntityState, EntityStatePatch, StateChange, StateManager, StateRecord};
pub use store::{Store, StoreId};
pub use strategy::{LoadingOptions, LoadingStrategy, Strategy, StrategyHooks, StrategyKind};
pub use sync::{diff, Diff, Focus, Motion, Revisioned, Surface, SyncTarget};
pub use view::View;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        // Basic smoke test
        let store: Store<(i32, &str)> = Store::new(
            vec![(1, "a"), (2, "b")],
            StoreOptions::new(|entry: &(i32, &'static str)| EntityKey::from(entry.0)),
        );
        assert_eq!(store.count(), 2);
        store.delete(&(1, "a"));
        assert_eq!(store.all().len(), 1);
    }
}
