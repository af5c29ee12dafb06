use super::{Signal, WatchGuard};

/// A source of values that can be read synchronously and watched.
///
/// Implemented by [`Signal`] and by views, so a view can be built over
/// either one.
pub trait Observable<T> {
    /// Clone of the latest value.
    fn current(&self) -> T;

    /// Watch the source. The callback receives the latest value
    /// immediately, then every later one.
    fn watch_boxed(&self, callback: Box<dyn Fn(&T)>) -> WatchGuard;
}

impl<T: Clone + 'static> Observable<T> for Signal<T> {
    fn current(&self) -> T {
        self.get()
    }

    fn watch_boxed(&self, callback: Box<dyn Fn(&T)>) -> WatchGuard {
        self.watch(move |value| callback(value))
    }
}
