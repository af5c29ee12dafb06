use crate::entity::{EntityKey, EntityRecord, StoreOptions};
use crate::signal::{Signal, WatchGuard};
use crate::state::{EntityState, EntityStatePatch};
use crate::store::Store;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Configuration of a [`Selector`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorOptions {
    /// How many previously active keys to remember.
    pub history_limit: usize,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        Self { history_limit: 20 }
    }
}

/// A store in which at most one entity is active at a time.
///
/// The active entity is whatever the state view reports first with
/// `active` set; activating an entity clears the flag everywhere else in
/// the same notification. Previously active keys are remembered so the
/// selection can step back.
pub struct Selector<E> {
    store: Store<E>,
    active: Signal<Option<EntityRecord<E, EntityState>>>,
    history: Rc<RefCell<VecDeque<EntityKey>>>,
    _history_guard: WatchGuard,
}

impl<E: 'static> Selector<E> {
    /// Create an empty selector.
    pub fn new(options: StoreOptions<E>, selector: SelectorOptions) -> Self {
        let store: Store<E> = Store::empty(options);
        let active = store
            .state_view()
            .first_by(|record: &EntityRecord<E, EntityState>| record.state.active);

        let history = Rc::new(RefCell::new(VecDeque::new()));
        let sink = Rc::clone(&history);
        let keys = store.clone();
        let limit = selector.history_limit.max(1);
        let history_guard = active.watch(move |record: &Option<EntityRecord<E, EntityState>>| {
            let mut history = sink.borrow_mut();
            match record {
                None => history.clear(),
                Some(record) => {
                    let key = keys.key_of(&record.entity);
                    history.retain(|previous| *previous != key);
                    history.push_back(key);
                    while history.len() > limit {
                        history.pop_front();
                    }
                }
            }
        });

        Self {
            store,
            active,
            history,
            _history_guard: history_guard,
        }
    }

    /// Replace the selectable entities.
    pub fn load<I>(&self, entities: I)
    where
        I: IntoIterator,
        I::Item: Into<Rc<E>>,
    {
        self.store.load(entities);
    }

    /// The entity stored under `key`.
    pub fn get(&self, key: &EntityKey) -> Option<Rc<E>> {
        self.store.get(key)
    }

    /// Every selectable entity.
    pub fn all(&self) -> Vec<Rc<E>> {
        self.store.all()
    }

    /// Make the entity at `key` the only active one, recording `options`
    /// in its state. Returns `false` when no such entity exists.
    pub fn activate(&self, key: &EntityKey, options: Map<String, Value>) -> bool {
        let Some(entity) = self.store.get(key) else {
            return false;
        };

        tracing::debug!(%key, "activating entity");
        self.store.state().batch(|state| {
            state.update_all(&EntityStatePatch::new().active(false));
            state.update(
                &entity,
                &EntityStatePatch::new().active(true).options(options),
                true,
            );
        });
        true
    }

    /// Step back to the previously active entity, or deactivate when there
    /// is none.
    pub fn activate_previous(&self) -> bool {
        let previous = {
            let mut history = self.history.borrow_mut();
            if history.len() <= 1 {
                None
            } else {
                history.pop_back();
                history.pop_back()
            }
        };

        match previous {
            Some(key) if self.activate(&key, Map::new()) => true,
            _ => {
                self.deactivate();
                false
            }
        }
    }

    /// Clear the active flag everywhere and forget the history.
    pub fn deactivate(&self) {
        self.history.borrow_mut().clear();
        self.store
            .state()
            .update_all(&EntityStatePatch::new().active(false));
    }

    /// The active entity and its state.
    pub fn active(&self) -> Option<EntityRecord<E, EntityState>> {
        self.active.get()
    }

    /// Key of the active entity.
    pub fn active_key(&self) -> Option<EntityKey> {
        self.active
            .with(|record| record.as_ref().map(|record| self.store.key_of(&record.entity)))
    }

    /// Watch the active entity. The current one is delivered immediately.
    pub fn watch_active<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(&Option<EntityRecord<E, EntityState>>) + 'static,
    {
        self.active.watch(callback)
    }

    /// Previously active keys, oldest first; the last one is the active key.
    pub fn history(&self) -> Vec<EntityKey> {
        self.history.borrow().iter().cloned().collect()
    }

    /// The underlying store.
    pub fn store(&self) -> &Store<E> {
        &self.store
    }

    /// Forget the history and destroy the store.
    pub fn destroy(&self) {
        self.history.borrow_mut().clear();
        self.store.destroy();
    }
}
