//! Entity identity and accessors.

mod accessor;
mod key;
mod record;

pub use accessor::{KeyFn, PropertyFn, StoreOptions};
pub use key::EntityKey;
pub use record::EntityRecord;
