//! Replay-last reactive values.
//!
//! A [`Signal`] stores its latest value and a list of watchers. Watching a
//! signal delivers the current value synchronously before any later change,
//! and the returned [`WatchGuard`] removes the watcher when dropped.

mod observable;
mod signal;

pub use observable::Observable;
pub use signal::{Signal, WatchGuard};
