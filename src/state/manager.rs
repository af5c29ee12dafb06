use super::StateRecord;
use crate::entity::{EntityKey, KeyFn};
use crate::signal::Signal;
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// What a state notification is about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateChange {
    /// No change yet; the value a new change stream starts with.
    Initial,
    /// The records of these keys changed.
    Updated(Vec<EntityKey>),
    /// Every known record changed.
    UpdatedAll,
    /// All records were discarded.
    Cleared,
}

impl StateChange {
    /// Whether the record of `key` may have changed.
    pub fn affects(&self, key: &EntityKey) -> bool {
        match self {
            Self::Initial => false,
            Self::Updated(keys) => keys.contains(key),
            Self::UpdatedAll | Self::Cleared => true,
        }
    }

    fn merge(self, next: StateChange) -> StateChange {
        match (self, next) {
            (Self::Cleared, _) | (_, Self::Cleared) => Self::Cleared,
            (Self::UpdatedAll, _) | (_, Self::UpdatedAll) => Self::UpdatedAll,
            (Self::Updated(mut keys), Self::Updated(more)) => {
                for key in more {
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
                Self::Updated(keys)
            }
            (Self::Initial, other) | (other, Self::Initial) => other,
        }
    }
}

struct StateManagerInner<E, S> {
    key: KeyFn<E>,
    records: RefCell<IndexMap<EntityKey, S>>,
    changes: Signal<StateChange>,
    batch_depth: Cell<usize>,
    pending: RefCell<Option<StateChange>>,
}

/// Per-entity state records, keyed like the entities they describe but
/// stored apart from them.
///
/// Records outlive the entities: replacing or deleting an entity leaves its
/// record in place until [`StateManager::clear`] is called.
pub struct StateManager<E, S> {
    inner: Rc<StateManagerInner<E, S>>,
}

impl<E, S> Clone for StateManager<E, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: 'static, S: StateRecord> StateManager<E, S> {
    /// Create a manager keying records with `key`.
    pub fn new(key: KeyFn<E>) -> Self {
        Self {
            inner: Rc::new(StateManagerInner {
                key,
                records: RefCell::new(IndexMap::new()),
                changes: Signal::new(StateChange::Initial),
                batch_depth: Cell::new(0),
                pending: RefCell::new(None),
            }),
        }
    }

    /// The state of an entity, or a default record if it has none.
    pub fn get(&self, entity: &E) -> S {
        self.get_by_key(&(self.inner.key)(entity))
    }

    /// The record stored under `key`, or a default one.
    pub fn get_by_key(&self, key: &EntityKey) -> S {
        self.inner
            .records
            .borrow()
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Merge `patch` into an entity's record, or start from a default
    /// record when `replace` is set.
    pub fn update(&self, entity: &E, patch: &S::Patch, replace: bool) {
        let key = (self.inner.key)(entity);
        self.write(&key, patch, replace);
        tracing::trace!(%key, replace, "state updated");
        self.emit(StateChange::Updated(vec![key]));
    }

    /// Apply one patch to several entities with a single notification.
    pub fn update_many<'a, I>(&self, entities: I, patch: &S::Patch, replace: bool)
    where
        I: IntoIterator<Item = &'a E>,
        E: 'a,
    {
        let keys: Vec<EntityKey> = entities
            .into_iter()
            .map(|entity| (self.inner.key)(entity))
            .collect();
        for key in &keys {
            self.write(key, patch, replace);
        }
        self.emit(StateChange::Updated(keys));
    }

    /// Merge `patch` into every record currently held.
    pub fn update_all(&self, patch: &S::Patch) {
        for record in self.inner.records.borrow_mut().values_mut() {
            record.apply(patch);
        }
        self.emit(StateChange::UpdatedAll);
    }

    /// Discard every record.
    pub fn clear(&self) {
        self.inner.records.borrow_mut().clear();
        tracing::debug!("state cleared");
        self.emit(StateChange::Cleared);
    }

    /// Run several updates and publish them as one notification.
    pub fn batch<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        self.inner.batch_depth.set(self.inner.batch_depth.get() + 1);
        let result = f(self);
        let depth = self.inner.batch_depth.get() - 1;
        self.inner.batch_depth.set(depth);

        if depth == 0 {
            let pending = self.inner.pending.borrow_mut().take();
            if let Some(change) = pending {
                self.inner.changes.set(change);
            }
        }
        result
    }

    /// The change stream. Replays the latest change to new watchers.
    pub fn changes(&self) -> &Signal<StateChange> {
        &self.inner.changes
    }

    /// Keys that have a record.
    pub fn keys(&self) -> Vec<EntityKey> {
        self.inner.records.borrow().keys().cloned().collect()
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.inner.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(&self, key: &EntityKey, patch: &S::Patch, replace: bool) {
        let mut records = self.inner.records.borrow_mut();
        if replace {
            let mut record = S::default();
            record.apply(patch);
            records.insert(key.clone(), record);
        } else {
            records.entry(key.clone()).or_default().apply(patch);
        }
    }

    fn emit(&self, change: StateChange) {
        if self.inner.batch_depth.get() > 0 {
            let mut pending = self.inner.pending.borrow_mut();
            *pending = Some(match pending.take() {
                Some(previous) => previous.merge(change),
                None => change,
            });
        } else {
            self.inner.changes.set(change);
        }
    }
}
