//! Keyed entity stores.
//!
//! A [`Store`] owns the entity index, the state manager and the two views
//! every consumer builds on: the data view (entities) and the state view
//! (entities joined with their state).

mod store;

pub(crate) use store::WeakStore;
pub use store::{Store, StoreId};
