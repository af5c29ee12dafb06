use crate::signal::WatchGuard;
use crate::state::StateRecord;
use crate::store::{Store, StoreId, WeakStore};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// The kind of a strategy. A store holds at most one strategy per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Mirrors a store's data view into a sync surface.
    Loading,
    /// Application-defined strategies, told apart by name.
    Custom(&'static str),
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => f.write_str("loading"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// The behaviour plugged into a [`Strategy`].
///
/// `on_activate` starts synchronizing one store and returns the
/// subscription that keeps it going; the strategy owns that subscription
/// and drops it before calling `on_deactivate` for the same store.
pub trait StrategyHooks<E, S>: 'static {
    fn kind(&self) -> StrategyKind;

    fn on_activate(&self, store: &Store<E, S>) -> Option<WatchGuard>;

    fn on_deactivate(&self, _store: &Store<E, S>) {}

    /// Called once a store is unbound, after its sync has stopped. Release
    /// anything kept for that store here.
    fn on_unbind(&self, _store: &Store<E, S>) {}
}

struct StrategyInner<E, S> {
    hooks: Rc<dyn StrategyHooks<E, S>>,
    active: Cell<bool>,
    stores: RefCell<Vec<WeakStore<E, S>>>,
    synced: RefCell<HashMap<StoreId, Option<WatchGuard>>>,
}

/// A unit of one-way synchronization bound to one or more stores.
///
/// Strategies start inactive. Activating an active strategy tears every
/// synchronization down and starts it again, so each bound store always
/// has exactly one live subscription. Stores are held weakly; the store
/// side owns its strategies.
pub struct Strategy<E, S> {
    inner: Rc<StrategyInner<E, S>>,
}

impl<E, S> Clone for Strategy<E, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E, S> AsRef<Strategy<E, S>> for Strategy<E, S> {
    fn as_ref(&self) -> &Strategy<E, S> {
        self
    }
}

impl<E: 'static, S: StateRecord> Strategy<E, S> {
    /// Build an inactive strategy around `hooks`.
    pub fn new<H>(hooks: H) -> Self
    where
        H: StrategyHooks<E, S>,
    {
        Self::shared(Rc::new(hooks))
    }

    /// Build a strategy around hooks the caller keeps a handle to.
    pub fn shared<H>(hooks: Rc<H>) -> Self
    where
        H: StrategyHooks<E, S>,
    {
        let hooks: Rc<dyn StrategyHooks<E, S>> = hooks;
        Self {
            inner: Rc::new(StrategyInner {
                hooks,
                active: Cell::new(false),
                stores: RefCell::new(Vec::new()),
                synced: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// The kind reported by the hooks.
    pub fn kind(&self) -> StrategyKind {
        self.inner.hooks.kind()
    }

    /// Whether the strategy is active.
    pub fn active(&self) -> bool {
        self.inner.active.get()
    }

    /// Number of live stores bound to this strategy.
    pub fn store_count(&self) -> usize {
        self.stores().len()
    }

    /// Activate the strategy. An active strategy is deactivated first.
    pub fn activate(&self) {
        if self.active() {
            self.stop_all();
        }
        self.inner.active.set(true);
        tracing::debug!(kind = %self.kind(), stores = self.store_count(), "strategy activated");

        for store in self.stores() {
            self.start(&store);
        }
    }

    /// Deactivate the strategy. Safe to call in any state.
    pub fn deactivate(&self) {
        let was_active = self.inner.active.replace(false);
        self.stop_all();
        if was_active {
            tracing::debug!(kind = %self.kind(), "strategy deactivated");
        }
    }

    /// Bind a store. Binding the same store twice does nothing. An active
    /// strategy starts synchronizing the store right away.
    pub fn bind_store(&self, store: &Store<E, S>) {
        {
            let mut stores = self.inner.stores.borrow_mut();
            if stores.iter().any(|bound| bound.ptr_eq(store)) {
                return;
            }
            stores.push(store.downgrade());
        }
        tracing::debug!(kind = %self.kind(), store = %store.id(), "store bound");

        if self.active() {
            self.start(store);
        }
    }

    /// Unbind a store, stopping its synchronization if the strategy is
    /// active. Other stores are not affected.
    pub fn unbind_store(&self, store: &Store<E, S>) {
        let removed = {
            let mut stores = self.inner.stores.borrow_mut();
            let before = stores.len();
            stores.retain(|bound| !bound.ptr_eq(store));
            stores.len() != before
        };
        if self.active() {
            self.stop(store);
        }
        if removed {
            tracing::debug!(kind = %self.kind(), store = %store.id(), "store unbound");
            let hooks = Rc::clone(&self.inner.hooks);
            hooks.on_unbind(store);
        }
    }

    /// Whether `store` is bound.
    pub fn is_bound(&self, store: &Store<E, S>) -> bool {
        self.inner
            .stores
            .borrow()
            .iter()
            .any(|bound| bound.ptr_eq(store))
    }

    /// Whether a synchronization for `store` is currently running.
    pub fn is_syncing(&self, store: &Store<E, S>) -> bool {
        self.inner.synced.borrow().contains_key(&store.id())
    }

    /// Whether both handles point to the same strategy.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Restart the synchronization of one store, if it is running.
    pub(crate) fn restart(&self, store: &Store<E, S>) {
        if self.active() && self.is_bound(store) {
            self.stop(store);
            self.start(store);
        }
    }

    fn stores(&self) -> Vec<Store<E, S>> {
        let mut stores = self.inner.stores.borrow_mut();
        stores.retain(|bound| bound.upgrade().is_some());
        stores.iter().filter_map(WeakStore::upgrade).collect()
    }

    fn start(&self, store: &Store<E, S>) {
        if self.is_syncing(store) {
            return;
        }
        let hooks = Rc::clone(&self.inner.hooks);
        let guard = hooks.on_activate(store);
        self.inner.synced.borrow_mut().insert(store.id(), guard);
    }

    fn stop(&self, store: &Store<E, S>) {
        let entry = self.inner.synced.borrow_mut().remove(&store.id());
        if let Some(guard) = entry {
            drop(guard);
            let hooks = Rc::clone(&self.inner.hooks);
            hooks.on_deactivate(store);
        }
    }

    fn stop_all(&self) {
        for store in self.stores() {
            self.stop(&store);
        }
        // Subscriptions of stores that no longer exist.
        let orphans = std::mem::take(&mut *self.inner.synced.borrow_mut());
        drop(orphans);
    }
}

impl<E: 'static, S: 'static> fmt::Debug for Strategy<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy")
            .field("kind", &self.inner.hooks.kind())
            .field("active", &self.inner.active.get())
            .finish()
    }
}
