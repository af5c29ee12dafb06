//! One-way synchronization of store contents into external surfaces.
//!
//! [`diff`] computes the minimal add/remove sets between what a surface
//! holds and what it should hold, using per-element revision tokens to
//! detect stale elements. [`Surface`] applies those sets to a bound
//! [`SyncTarget`].

mod reconcile;
mod surface;

pub use reconcile::{diff, Diff, Revisioned};
pub use surface::{Focus, Motion, Surface, SyncTarget};
