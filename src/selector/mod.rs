//! Single-active-entity selection built from a store and its state view.

mod selector;

pub use selector::{Selector, SelectorOptions};
