use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A per-entity state record held by a [`StateManager`](super::StateManager).
///
/// Updates are expressed as patches so several independent features can
/// each touch only the fields they own.
pub trait StateRecord: Default + Clone + 'static {
    type Patch: Clone + 'static;

    /// Merge a patch into this record.
    fn apply(&mut self, patch: &Self::Patch);
}

/// The default state record: a few common flags plus free-form options.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityState {
    pub active: bool,
    pub selected: bool,
    pub visible: bool,
    pub options: Map<String, Value>,
}

/// Partial update of an [`EntityState`]. Unset fields are left untouched;
/// options are merged key by key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityStatePatch {
    pub active: Option<bool>,
    pub selected: Option<bool>,
    pub visible: Option<bool>,
    pub options: Option<Map<String, Value>>,
}

impl EntityStatePatch {
    /// A patch that changes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = Some(selected);
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    pub fn options(mut self, options: Map<String, Value>) -> Self {
        self.options = Some(options);
        self
    }
}

impl StateRecord for EntityState {
    type Patch = EntityStatePatch;

    fn apply(&mut self, patch: &EntityStatePatch) {
        if let Some(active) = patch.active {
            self.active = active;
        }
        if let Some(selected) = patch.selected {
            self.selected = selected;
        }
        if let Some(visible) = patch.visible {
            self.visible = visible;
        }
        if let Some(options) = &patch.options {
            self.options
                .extend(options.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }
}
