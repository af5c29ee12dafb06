use std::rc::Rc;

/// An entity paired with its current state record.
#[derive(Debug)]
pub struct EntityRecord<E, S> {
    pub entity: Rc<E>,
    pub state: S,
}

impl<E, S: Clone> Clone for EntityRecord<E, S> {
    fn clone(&self) -> Self {
        Self {
            entity: Rc::clone(&self.entity),
            state: self.state.clone(),
        }
    }
}

impl<E: PartialEq, S: PartialEq> PartialEq for EntityRecord<E, S> {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity && self.state == other.state
    }
}
