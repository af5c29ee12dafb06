use crate::entity::EntityKey;
use std::collections::{HashMap, HashSet};

/// An element of an external surface, identified by key and versioned by
/// a revision token.
pub trait Revisioned {
    type Revision: PartialEq;

    fn key(&self) -> EntityKey;

    fn revision(&self) -> Self::Revision;
}

/// The changes that bring a surface in line with a target sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct Diff<T> {
    pub add: Vec<T>,
    pub remove: Vec<T>,
}

impl<T> Diff<T> {
    /// Whether there is nothing to add or remove.
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

impl<T> Default for Diff<T> {
    fn default() -> Self {
        Self {
            add: Vec::new(),
            remove: Vec::new(),
        }
    }
}

/// Compute the minimal changes turning `source` into `target`.
///
/// A source element is removed when its key is gone from `target` or its
/// revision no longer matches; a target element is added when its key is
/// new or its source counterpart was removed as stale. Elements with the
/// same key and revision on both sides are left alone. `add` follows the
/// order of `target`.
pub fn diff<T>(source: &[T], target: &[T]) -> Diff<T>
where
    T: Revisioned + Clone,
{
    let mut pending: HashMap<EntityKey, &T> = target
        .iter()
        .map(|element| (element.key(), element))
        .collect();

    let mut remove = Vec::new();
    for element in source {
        let key = element.key();
        match pending.get(&key) {
            Some(fresh) if fresh.revision() == element.revision() => {
                pending.remove(&key);
            }
            _ => remove.push(element.clone()),
        }
    }

    let pending: HashSet<EntityKey> = pending.into_keys().collect();
    let add = target
        .iter()
        .filter(|element| pending.contains(&element.key()))
        .cloned()
        .collect();

    Diff { add, remove }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Element {
        id: &'static str,
        rev: u32,
    }

    impl Revisioned for Element {
        type Revision = u32;

        fn key(&self) -> EntityKey {
            EntityKey::from(self.id)
        }

        fn revision(&self) -> u32 {
            self.rev
        }
    }

    fn el(id: &'static str, rev: u32) -> Element {
        Element { id, rev }
    }

    #[test]
    fn unchanged_elements_are_untouched() {
        let source = [el("k1", 1), el("k2", 2)];
        let target = [el("k1", 1), el("k3", 3)];

        let diff = diff(&source, &target);
        assert_eq!(diff.remove, vec![el("k2", 2)]);
        assert_eq!(diff.add, vec![el("k3", 3)]);
    }

    #[test]
    fn stale_revisions_are_replaced() {
        let source = [el("k1", 1), el("k2", 1)];
        let target = [el("k1", 2), el("k2", 1)];

        let diff = diff(&source, &target);
        assert_eq!(diff.remove, vec![el("k1", 1)]);
        assert_eq!(diff.add, vec![el("k1", 2)]);
    }

    #[test]
    fn identical_sequences_need_nothing() {
        let target = [el("a", 1), el("b", 7)];
        assert!(diff(&target, &target).is_empty());
    }

    #[test]
    fn empty_sides() {
        let target = [el("a", 1), el("b", 1)];
        let fill = diff(&[], &target);
        assert_eq!(fill.add, target.to_vec());
        assert!(fill.remove.is_empty());

        let drain = diff(&target, &[]);
        assert_eq!(drain.remove, target.to_vec());
        assert!(drain.add.is_empty());
    }

    #[test]
    fn additions_follow_target_order() {
        let diff = diff(&[el("b", 1)], &[el("c", 1), el("b", 1), el("a", 1)]);
        assert_eq!(diff.add, vec![el("c", 1), el("a", 1)]);
    }
}
