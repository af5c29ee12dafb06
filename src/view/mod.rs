//! Derived, reactive projections over a source sequence.

mod view;

pub use view::View;
