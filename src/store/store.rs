use crate::entity::{EntityKey, EntityRecord, KeyFn, PropertyFn, StoreOptions};
use crate::error::{Result, StoreError};
use crate::signal::{Signal, WatchGuard};
use crate::state::{EntityState, StateManager, StateRecord};
use crate::strategy::{Strategy, StrategyKind};
use crate::view::View;
use indexmap::IndexMap;
use serde_json::Value;
use std::borrow::Borrow;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_STORE_ID: AtomicUsize = AtomicUsize::new(0);

/// Process-unique identity of a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreId(usize);

impl StoreId {
    fn next() -> Self {
        Self(NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store#{}", self.0)
    }
}

struct StoreInner<E, S> {
    id: StoreId,
    key: KeyFn<E>,
    property: Option<PropertyFn<E>>,
    index: RefCell<IndexMap<EntityKey, Rc<E>>>,
    entities: Signal<Vec<Rc<E>>>,
    pristine: Cell<bool>,
    state: StateManager<E, S>,
    data_view: View<Rc<E>>,
    state_view: View<Rc<E>, EntityRecord<E, S>>,
    strategies: RefCell<Vec<Strategy<E, S>>>,
}

/// A keyed collection of entities with per-entity state and derived views.
///
/// Entities are held by reference and indexed by the key the configured
/// accessor computes for them. Every mutating call publishes one snapshot
/// that runs through the data view, the state view and every watcher
/// before the call returns.
///
/// `Store` is a cheap handle; clones share the same collection.
pub struct Store<E, S = EntityState> {
    inner: Rc<StoreInner<E, S>>,
}

impl<E, S> Clone for Store<E, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: 'static, S: StateRecord> Store<E, S> {
    /// Create a store holding `entities`.
    pub fn new<I>(entities: I, options: StoreOptions<E>) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Rc<E>>,
    {
        let StoreOptions { key, property } = options;

        let entities_signal = Signal::new(Vec::new());
        let state = StateManager::new(Rc::clone(&key));
        let data_view = View::new(entities_signal.clone());
        let reader = state.clone();
        let state_view = View::joined(
            data_view.clone(),
            state.changes().clone(),
            move |entity: &Rc<E>| EntityRecord {
                entity: Rc::clone(entity),
                state: reader.get(entity),
            },
        );

        data_view.lift();
        state_view.lift();

        let store = Self {
            inner: Rc::new(StoreInner {
                id: StoreId::next(),
                key,
                property,
                index: RefCell::new(IndexMap::new()),
                entities: entities_signal,
                pristine: Cell::new(true),
                state,
                data_view,
                state_view,
                strategies: RefCell::new(Vec::new()),
            }),
        };

        let index = store.generate_index(entities);
        if !index.is_empty() {
            *store.inner.index.borrow_mut() = index;
            store.next();
        }
        store
    }

    /// Create an empty store.
    pub fn empty(options: StoreOptions<E>) -> Self {
        Self::new(Vec::<Rc<E>>::new(), options)
    }

    /// Identity of this store, shared by all its clones.
    pub fn id(&self) -> StoreId {
        self.inner.id
    }

    /// The entity stored under `key`.
    pub fn get(&self, key: &EntityKey) -> Option<Rc<E>> {
        self.inner.index.borrow().get(key).cloned()
    }

    /// Whether an entity is stored under `key`.
    pub fn contains_key(&self, key: &EntityKey) -> bool {
        self.inner.index.borrow().contains_key(key)
    }

    /// Every entity, in index order.
    pub fn all(&self) -> Vec<Rc<E>> {
        self.inner.entities.get()
    }

    /// Replace the whole collection. The store becomes pristine.
    pub fn load<I>(&self, entities: I)
    where
        I: IntoIterator,
        I::Item: Into<Rc<E>>,
    {
        let index = self.generate_index(entities);
        let count = index.len();
        *self.inner.index.borrow_mut() = index;
        self.inner.pristine.set(true);
        tracing::debug!(store = %self.inner.id, count, "entities loaded");
        self.next();
    }

    /// Empty the collection but keep state and view configuration, so
    /// future loads go through the same filters and sorts.
    pub fn soft_clear(&self) {
        if self.inner.index.borrow().is_empty() {
            return;
        }
        self.inner.index.borrow_mut().clear();
        self.inner.pristine.set(true);
        tracing::debug!(store = %self.inner.id, "entities cleared");
        self.next();
    }

    /// Empty the collection, reset every state record and drop view
    /// filters and sorts.
    pub fn clear(&self) {
        self.inner.state_view.clear();
        self.inner.data_view.clear();
        self.inner.state.clear();
        self.soft_clear();
    }

    /// Tear the store down: unbind its strategies, destroy its views and
    /// release every watcher. The store must not be used afterwards.
    pub fn destroy(&self) {
        let strategies = std::mem::take(&mut *self.inner.strategies.borrow_mut());
        for strategy in &strategies {
            strategy.unbind_store(self);
        }

        self.inner.state_view.destroy();
        self.inner.data_view.destroy();
        self.clear();
        self.inner.entities.clear_observers();
        tracing::debug!(store = %self.inner.id, "store destroyed");
    }

    /// Insert one entity. See [`Store::insert_many`].
    pub fn insert(&self, entity: impl Into<Rc<E>>) {
        self.insert_many([entity.into()]);
    }

    /// Insert entities. An entity whose key is already present replaces
    /// the previous one in place.
    pub fn insert_many<I>(&self, entities: I)
    where
        I: IntoIterator,
        I::Item: Into<Rc<E>>,
    {
        self.upsert(entities, "inserted");
    }

    /// Update one entity, inserting it if its key is new.
    pub fn update(&self, entity: impl Into<Rc<E>>) {
        self.update_many([entity.into()]);
    }

    /// Update or insert entities.
    pub fn update_many<I>(&self, entities: I)
    where
        I: IntoIterator,
        I::Item: Into<Rc<E>>,
    {
        self.upsert(entities, "updated");
    }

    /// Remove one entity by its computed key.
    pub fn delete(&self, entity: &E) {
        self.delete_many([entity]);
    }

    /// Remove entities by their computed key. Absent keys are ignored.
    pub fn delete_many<I>(&self, entities: I)
    where
        I: IntoIterator,
        I::Item: Borrow<E>,
    {
        let keys: Vec<EntityKey> = entities
            .into_iter()
            .map(|entity| self.key_of(entity.borrow()))
            .collect();
        self.remove_keys(keys);
    }

    /// Remove the entity stored under `key`, if any.
    pub fn delete_by_key(&self, key: &EntityKey) {
        self.remove_keys(vec![key.clone()]);
    }

    /// Register a strategy and bind this store to it.
    ///
    /// At most one strategy of each kind may be registered. On a duplicate
    /// the store is left untouched.
    pub fn add_strategy(&self, strategy: impl AsRef<Strategy<E, S>>, activate: bool) -> Result<()> {
        let strategy = strategy.as_ref();
        let kind = strategy.kind();
        if self.strategy_of_type(kind).is_some() {
            return Err(StoreError::DuplicateStrategy { kind });
        }

        self.inner.strategies.borrow_mut().push(strategy.clone());
        strategy.bind_store(self);
        if activate {
            strategy.activate();
        }
        Ok(())
    }

    /// Unregister a strategy. Does nothing if it is not registered here.
    pub fn remove_strategy(&self, strategy: impl AsRef<Strategy<E, S>>) {
        let strategy = strategy.as_ref();
        let removed = {
            let mut strategies = self.inner.strategies.borrow_mut();
            strategies
                .iter()
                .position(|registered| registered.ptr_eq(strategy))
                .map(|position| strategies.remove(position))
        };
        if let Some(strategy) = removed {
            strategy.unbind_store(self);
        }
    }

    /// The registered strategy of `kind`.
    pub fn strategy_of_type(&self, kind: StrategyKind) -> Option<Strategy<E, S>> {
        self.inner
            .strategies
            .borrow()
            .iter()
            .find(|strategy| strategy.kind() == kind)
            .cloned()
    }

    /// Activate the registered strategy of `kind`, if any.
    pub fn activate_strategy_of_type(&self, kind: StrategyKind) {
        if let Some(strategy) = self.strategy_of_type(kind) {
            strategy.activate();
        }
    }

    /// Deactivate the registered strategy of `kind`, if any.
    pub fn deactivate_strategy_of_type(&self, kind: StrategyKind) {
        if let Some(strategy) = self.strategy_of_type(kind) {
            strategy.deactivate();
        }
    }

    /// Whether the contents are exactly those of the last bulk load.
    pub fn pristine(&self) -> bool {
        self.inner.pristine.get()
    }

    /// Number of entities.
    pub fn count(&self) -> usize {
        self.inner.index.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// A snapshot of the key index.
    pub fn index(&self) -> IndexMap<EntityKey, Rc<E>> {
        self.inner.index.borrow().clone()
    }

    /// Every key, in index order.
    pub fn keys(&self) -> Vec<EntityKey> {
        self.inner.index.borrow().keys().cloned().collect()
    }

    /// Compute the key of `entity` with the configured accessor.
    pub fn key_of(&self, entity: &E) -> EntityKey {
        (self.inner.key)(entity)
    }

    /// Read a named property through the configured accessor.
    pub fn property(&self, entity: &E, name: &str) -> Option<Value> {
        self.inner
            .property
            .as_ref()
            .and_then(|property| property(entity, name))
    }

    /// Per-entity state records.
    pub fn state(&self) -> &StateManager<E, S> {
        &self.inner.state
    }

    /// View of every entity.
    pub fn data_view(&self) -> &View<Rc<E>> {
        &self.inner.data_view
    }

    /// View of every entity joined with its state.
    pub fn state_view(&self) -> &View<Rc<E>, EntityRecord<E, S>> {
        &self.inner.state_view
    }

    /// Watch the raw entity snapshots.
    pub fn subscribe<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(&Vec<Rc<E>>) + 'static,
    {
        self.inner.entities.watch(callback)
    }

    /// Number of registered strategies.
    pub fn strategy_count(&self) -> usize {
        self.inner.strategies.borrow().len()
    }

    pub(crate) fn downgrade(&self) -> WeakStore<E, S> {
        WeakStore {
            inner: Rc::downgrade(&self.inner),
        }
    }

    fn upsert<I>(&self, entities: I, action: &'static str)
    where
        I: IntoIterator,
        I::Item: Into<Rc<E>>,
    {
        let mut written = 0usize;
        {
            let mut index = self.inner.index.borrow_mut();
            for entity in entities {
                let entity = entity.into();
                index.insert((self.inner.key)(&entity), entity);
                written += 1;
            }
        }
        self.inner.pristine.set(false);
        tracing::trace!(store = %self.inner.id, count = written, action, "entities written");
        self.next();
    }

    fn remove_keys(&self, keys: Vec<EntityKey>) {
        let removed = {
            let mut index = self.inner.index.borrow_mut();
            keys.iter()
                .filter(|key| index.shift_remove(*key).is_some())
                .count()
        };
        self.inner.pristine.set(false);
        tracing::trace!(store = %self.inner.id, count = removed, "entities deleted");
        self.next();
    }

    fn generate_index<I>(&self, entities: I) -> IndexMap<EntityKey, Rc<E>>
    where
        I: IntoIterator,
        I::Item: Into<Rc<E>>,
    {
        entities
            .into_iter()
            .map(|entity| {
                let entity = entity.into();
                ((self.inner.key)(&entity), entity)
            })
            .collect()
    }

    fn next(&self) {
        let snapshot: Vec<Rc<E>> = self.inner.index.borrow().values().cloned().collect();
        self.inner.entities.set(snapshot);
    }
}

impl<E, S> fmt::Debug for Store<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.inner.id)
            .field("count", &self.inner.index.borrow().len())
            .field("pristine", &self.inner.pristine.get())
            .finish()
    }
}

/// Non-owning handle to a store, held by strategies.
pub(crate) struct WeakStore<E, S> {
    inner: Weak<StoreInner<E, S>>,
}

impl<E, S> Clone for WeakStore<E, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<E, S> WeakStore<E, S> {
    pub(crate) fn upgrade(&self) -> Option<Store<E, S>> {
        self.inner.upgrade().map(|inner| Store { inner })
    }

    pub(crate) fn ptr_eq(&self, store: &Store<E, S>) -> bool {
        std::ptr::eq(self.inner.as_ptr(), Rc::as_ptr(&store.inner))
    }
}
