use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Observer<T> = Rc<dyn Fn(&T)>;

struct SignalInner<T> {
    value: T,
    next_id: usize,
    observers: Vec<(usize, Observer<T>)>,
    // Guards of upstream signals this one is derived from.
    _dependencies: Vec<WatchGuard>,
}

/// A reactive value that replays its latest value to new watchers.
///
/// Watchers are notified synchronously, in registration order, every time
/// the value is set. A watcher removed while a notification is running is
/// not called for the rest of that round.
pub struct Signal<T> {
    inner: Rc<RefCell<SignalInner<T>>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Create a new signal with the given initial value.
    pub fn new(initial: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SignalInner {
                value: initial,
                next_id: 0,
                observers: Vec::new(),
                _dependencies: Vec::new(),
            })),
        }
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Read the value with a function without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Set a new value and notify every watcher.
    pub fn set(&self, new_value: T) {
        self.inner.borrow_mut().value = new_value;
        self.notify();
    }

    /// Update the value in place and notify every watcher.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        {
            let mut inner = self.inner.borrow_mut();
            f(&mut inner.value);
        }
        self.notify();
    }

    /// Watch this signal for changes.
    ///
    /// The callback is invoked immediately with the current value, then on
    /// every subsequent change until the returned guard is dropped.
    pub fn watch<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(&T) + 'static,
    {
        let callback: Observer<T> = Rc::new(callback);
        let (id, current) = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.observers.push((id, Rc::clone(&callback)));
            (id, inner.value.clone())
        };

        callback(&current);

        let inner: Weak<RefCell<SignalInner<T>>> = Rc::downgrade(&self.inner);
        let source: Weak<dyn Unwatch> = inner;
        WatchGuard {
            observer_id: id,
            source: Some(source),
        }
    }

    /// Create a derived signal by applying a function to this signal's value.
    ///
    /// The derived signal keeps its upstream subscription alive for as long
    /// as it exists itself.
    pub fn map<U, F>(&self, f: F) -> Signal<U>
    where
        U: Clone + 'static,
        F: Fn(&T) -> U + 'static,
    {
        let derived = Signal::new(self.with(|value| f(value)));
        let target = Rc::downgrade(&derived.inner);

        let guard = self.watch(move |value| {
            if let Some(inner) = target.upgrade() {
                Signal { inner }.set(f(value));
            }
        });

        derived.inner.borrow_mut()._dependencies.push(guard);
        derived
    }

    /// Tie the lifetime of an upstream subscription to this signal.
    pub(crate) fn retain(&self, guard: WatchGuard) {
        self.inner.borrow_mut()._dependencies.push(guard);
    }

    /// Number of live watchers.
    pub fn observer_count(&self) -> usize {
        self.inner.borrow().observers.len()
    }

    /// Drop every watcher. Their guards become inert.
    pub fn clear_observers(&self) {
        let observers = std::mem::take(&mut self.inner.borrow_mut().observers);
        drop(observers);
    }

    pub(crate) fn downgrade(&self) -> WeakSignal<T> {
        WeakSignal {
            inner: Rc::downgrade(&self.inner),
        }
    }

    fn notify(&self) {
        let (snapshot, observers) = {
            let inner = self.inner.borrow();
            let observers: Vec<(usize, Observer<T>)> = inner
                .observers
                .iter()
                .map(|(id, observer)| (*id, Rc::clone(observer)))
                .collect();
            (inner.value.clone(), observers)
        };

        for (id, observer) in observers {
            let still_registered = self
                .inner
                .borrow()
                .observers
                .iter()
                .any(|(registered, _)| *registered == id);
            if still_registered {
                observer(&snapshot);
            }
        }
    }
}

impl<T: Clone + Default + 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + std::fmt::Debug + 'static> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("value", &self.inner.borrow().value)
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// Non-owning handle to a signal, used by closures that must not keep
/// their target alive.
pub(crate) struct WeakSignal<T> {
    inner: Weak<RefCell<SignalInner<T>>>,
}

impl<T> Clone for WeakSignal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> WeakSignal<T> {
    pub(crate) fn upgrade(&self) -> Option<Signal<T>> {
        self.inner.upgrade().map(|inner| Signal { inner })
    }
}

trait Unwatch {
    fn unwatch(&self, observer_id: usize);
}

impl<T> Unwatch for RefCell<SignalInner<T>> {
    fn unwatch(&self, observer_id: usize) {
        // The removed closure is dropped after the borrow ends, since it may
        // own guards of its own.
        let removed = match self.try_borrow_mut() {
            Ok(mut inner) => inner
                .observers
                .iter()
                .position(|(id, _)| *id == observer_id)
                .map(|position| inner.observers.remove(position)),
            Err(_) => {
                tracing::warn!(observer_id, "signal busy, watcher not removed");
                None
            }
        };
        drop(removed);
    }
}

/// RAII guard for signal watchers.
///
/// Dropping the guard (or calling [`WatchGuard::unwatch`]) removes the
/// watcher from its signal.
#[must_use = "dropping a WatchGuard immediately removes the watcher"]
pub struct WatchGuard {
    observer_id: usize,
    source: Option<Weak<dyn Unwatch>>,
}

impl WatchGuard {
    /// A guard that watches nothing.
    pub fn inert() -> Self {
        Self {
            observer_id: 0,
            source: None,
        }
    }

    /// Stop watching now.
    pub fn unwatch(mut self) {
        self.release();
    }

    /// Whether the watched signal is still alive.
    pub fn is_live(&self) -> bool {
        self.source
            .as_ref()
            .is_some_and(|source| source.strong_count() > 0)
    }

    fn release(&mut self) {
        if let Some(source) = self.source.take().and_then(|source| source.upgrade()) {
            source.unwatch(self.observer_id);
        }
    }
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for WatchGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchGuard")
            .field("observer_id", &self.observer_id)
            .field("live", &self.is_live())
            .finish()
    }
}
