use super::reconcile::{diff, Diff, Revisioned};
use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// How a target should bring elements into focus after a sync.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Motion {
    /// Let the target decide.
    #[default]
    Default,
    Zoom,
    Move,
    /// Leave the focus where it is.
    None,
}

/// A focus request passed to the target along with the elements to focus.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Focus {
    pub motion: Motion,
    /// Scale factors for the top, right, bottom and left of the focused
    /// area. A factor of 1 doubles the distance from the center.
    pub view_scale: Option<[f64; 4]>,
    /// Focused area to visible area ratio under which the target should
    /// zoom in.
    pub area_ratio: Option<f64>,
}

impl Focus {
    /// A focus request with no scale or ratio hints.
    pub fn new(motion: Motion) -> Self {
        Self {
            motion,
            ..Default::default()
        }
    }
}

/// An external surface that mirrors a store, such as a rendering layer.
pub trait SyncTarget {
    type Element: Revisioned + Clone;

    fn elements(&self) -> Vec<Self::Element>;

    fn add_elements(&mut self, elements: &[Self::Element]);

    fn remove_elements(&mut self, elements: &[Self::Element]);

    fn clear(&mut self) {
        let elements = self.elements();
        self.remove_elements(&elements);
    }

    fn focus(&mut self, _elements: &[Self::Element], _focus: &Focus) {}
}

/// A slot for a sync target that may be bound or rebound at any time.
///
/// Every sync operation on an empty slot fails with
/// [`StoreError::UnboundTarget`].
pub struct Surface<T> {
    target: Rc<RefCell<Option<T>>>,
}

impl<T> Clone for Surface<T> {
    fn clone(&self) -> Self {
        Self {
            target: Rc::clone(&self.target),
        }
    }
}

impl<T> Default for Surface<T> {
    fn default() -> Self {
        Self::unbound()
    }
}

impl<T> Surface<T> {
    /// An empty slot.
    pub fn unbound() -> Self {
        Self {
            target: Rc::new(RefCell::new(None)),
        }
    }

    /// A slot holding `target`.
    pub fn new(target: T) -> Self {
        Self {
            target: Rc::new(RefCell::new(Some(target))),
        }
    }

    /// Bind a target, returning the previous one.
    pub fn bind(&self, target: T) -> Option<T> {
        self.target.borrow_mut().replace(target)
    }

    /// Take the target out, leaving the slot empty.
    pub fn unbind(&self) -> Option<T> {
        self.target.borrow_mut().take()
    }

    /// Whether a target is bound.
    pub fn is_bound(&self) -> bool {
        self.target.borrow().is_some()
    }

    /// Read the bound target.
    pub fn with_target<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        self.target
            .borrow()
            .as_ref()
            .map(f)
            .ok_or(StoreError::UnboundTarget)
    }
}

impl<T: SyncTarget> Surface<T> {
    /// Bring the target in line with `elements`, touching only what
    /// changed, then focus.
    ///
    /// Added elements get the focus when there are any; otherwise the
    /// whole set does, unless it is empty. [`Motion::None`] never focuses.
    pub fn set_elements(&self, elements: &[T::Element], focus: &Focus) -> Result<Diff<T::Element>> {
        let mut slot = self.target.borrow_mut();
        let target = slot.as_mut().ok_or(StoreError::UnboundTarget)?;

        let current = target.elements();
        let diff = diff(&current, elements);

        if !diff.remove.is_empty() {
            target.remove_elements(&diff.remove);
        }
        if !diff.add.is_empty() {
            target.add_elements(&diff.add);
        }

        if focus.motion != Motion::None {
            if !diff.add.is_empty() {
                target.focus(&diff.add, focus);
            } else if !elements.is_empty() {
                target.focus(elements, focus);
            }
        }

        tracing::trace!(
            added = diff.add.len(),
            removed = diff.remove.len(),
            motion = ?focus.motion,
            "surface synced"
        );
        Ok(diff)
    }

    /// Remove every element from the target.
    pub fn clear(&self) -> Result<()> {
        let mut slot = self.target.borrow_mut();
        let target = slot.as_mut().ok_or(StoreError::UnboundTarget)?;
        target.clear();
        Ok(())
    }
}
