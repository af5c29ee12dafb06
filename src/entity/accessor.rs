use super::EntityKey;
use serde_json::Value;
use std::rc::Rc;

/// Computes an entity's key.
pub type KeyFn<E> = Rc<dyn Fn(&E) -> EntityKey>;

/// Reads a named property of an entity.
pub type PropertyFn<E> = Rc<dyn Fn(&E, &str) -> Option<Value>>;

/// The accessors a store is configured with.
///
/// There is no default key accessor: every store states how its entities
/// are identified.
pub struct StoreOptions<E> {
    pub(crate) key: KeyFn<E>,
    pub(crate) property: Option<PropertyFn<E>>,
}

impl<E> StoreOptions<E> {
    /// Options with a key accessor and no property accessor.
    pub fn new<F>(key: F) -> Self
    where
        F: Fn(&E) -> EntityKey + 'static,
    {
        Self {
            key: Rc::new(key),
            property: None,
        }
    }

    /// Add a property accessor.
    pub fn with_property<F>(mut self, property: F) -> Self
    where
        F: Fn(&E, &str) -> Option<Value> + 'static,
    {
        self.property = Some(Rc::new(property));
        self
    }
}

impl<E> Clone for StoreOptions<E> {
    fn clone(&self) -> Self {
        Self {
            key: Rc::clone(&self.key),
            property: self.property.clone(),
        }
    }
}
