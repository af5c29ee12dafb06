use super::{Strategy, StrategyHooks, StrategyKind};
use crate::error::{Result, StoreError};
use crate::signal::WatchGuard;
use crate::state::StateRecord;
use crate::store::{Store, StoreId};
use crate::sync::{Focus, Motion, Surface, SyncTarget};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Configuration of a [`LoadingStrategy`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadingOptions {
    /// Always use this motion instead of choosing one per change.
    pub motion: Option<Motion>,
    /// Forwarded to the target with every focus request.
    pub view_scale: Option<[f64; 4]>,
    /// Forwarded to the target with every focus request.
    pub area_ratio: Option<f64>,
}

type Project<E, El> = Rc<dyn Fn(&E) -> El>;

struct Loading<E, T: SyncTarget> {
    options: LoadingOptions,
    project: Project<E, T::Element>,
    surfaces: RefCell<HashMap<StoreId, Surface<T>>>,
}

impl<E: 'static, T: SyncTarget + 'static> Loading<E, T> {
    fn surface(&self, store: StoreId) -> Option<Surface<T>> {
        self.surfaces.borrow().get(&store).cloned()
    }

    fn sync<S: StateRecord>(&self, entities: &[Rc<E>], store: &Store<E, S>) -> Result<()> {
        let surface = self.surface(store.id()).ok_or(StoreError::UnboundTarget)?;
        if entities.is_empty() {
            return surface.clear();
        }

        let elements: Vec<T::Element> = entities.iter().map(|entity| (self.project)(entity)).collect();
        let focus = Focus {
            motion: self.select_motion(store),
            view_scale: self.options.view_scale,
            area_ratio: self.options.area_ratio,
        };
        surface.set_elements(&elements, &focus).map(|_| ())
    }

    fn select_motion<S: StateRecord>(&self, store: &Store<E, S>) -> Motion {
        if let Some(motion) = self.options.motion {
            return motion;
        }
        if store.pristine() {
            // freshly loaded
            return Motion::Default;
        }
        if store.count() > store.data_view().count() {
            // a filter hid some entities
            return Motion::Default;
        }
        Motion::None
    }
}

struct LoadingHooks<E, T: SyncTarget> {
    loading: Rc<Loading<E, T>>,
}

impl<E, S, T> StrategyHooks<E, S> for LoadingHooks<E, T>
where
    E: 'static,
    S: StateRecord,
    T: SyncTarget + 'static,
{
    fn kind(&self) -> StrategyKind {
        StrategyKind::Loading
    }

    /// Watches the data view: filtered, never sorted, since order means
    /// nothing on a surface.
    fn on_activate(&self, store: &Store<E, S>) -> Option<WatchGuard> {
        let loading = Rc::clone(&self.loading);
        let weak = store.downgrade();

        Some(store.data_view().watch(move |entities| {
            let Some(store) = weak.upgrade() else {
                return;
            };
            if let Err(error) = loading.sync(entities, &store) {
                tracing::warn!(store = %store.id(), %error, "loading strategy could not sync store");
            }
        }))
    }

    fn on_unbind(&self, store: &Store<E, S>) {
        if self.loading.surfaces.borrow_mut().remove(&store.id()).is_some() {
            tracing::debug!(store = %store.id(), "surface released");
        }
    }
}

/// Mirrors each bound store's data view into the [`Surface`] attached for
/// that store.
///
/// The binding is one-way: entities reaching the store reach the surface,
/// never the other way around. Only the difference between the surface and
/// the store is applied on each change.
pub struct LoadingStrategy<E, S, T: SyncTarget> {
    strategy: Strategy<E, S>,
    loading: Rc<Loading<E, T>>,
}

impl<E, S, T> LoadingStrategy<E, S, T>
where
    E: 'static,
    S: StateRecord,
    T: SyncTarget + 'static,
{
    /// `project` turns an entity into the element its surface holds.
    pub fn new<F>(options: LoadingOptions, project: F) -> Self
    where
        F: Fn(&E) -> T::Element + 'static,
    {
        let loading = Rc::new(Loading {
            options,
            project: Rc::new(project),
            surfaces: RefCell::new(HashMap::new()),
        });
        let strategy = Strategy::new(LoadingHooks {
            loading: Rc::clone(&loading),
        });
        Self { strategy, loading }
    }

    /// Attach the surface a store is mirrored into, replacing any previous
    /// one. A running sync of that store starts over on the new surface.
    pub fn attach(&self, store: &Store<E, S>, surface: Surface<T>) -> Option<Surface<T>> {
        let previous = self.loading.surfaces.borrow_mut().insert(store.id(), surface);
        self.strategy.restart(store);
        previous
    }

    /// Forget the surface of a store. Unbinding the store does this too.
    pub fn detach(&self, store: &Store<E, S>) -> Option<Surface<T>> {
        self.loading.surfaces.borrow_mut().remove(&store.id())
    }

    /// The surface attached for a store, if any.
    pub fn surface(&self, store: &Store<E, S>) -> Option<Surface<T>> {
        self.loading.surface(store.id())
    }

    /// The options every focus request is built from.
    pub fn options(&self) -> &LoadingOptions {
        &self.loading.options
    }

    /// The strategy to register on stores.
    pub fn strategy(&self) -> &Strategy<E, S> {
        &self.strategy
    }

    /// Activate the strategy.
    pub fn activate(&self) {
        self.strategy.activate();
    }

    /// Deactivate the strategy.
    pub fn deactivate(&self) {
        self.strategy.deactivate();
    }

    /// Whether the strategy is active.
    pub fn active(&self) -> bool {
        self.strategy.active()
    }
}

impl<E, S, T: SyncTarget> AsRef<Strategy<E, S>> for LoadingStrategy<E, S, T> {
    fn as_ref(&self) -> &Strategy<E, S> {
        &self.strategy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityKey, StoreOptions};
    use crate::state::EntityState;
    use crate::sync::Revisioned;

    #[derive(Clone, Debug, PartialEq)]
    struct Feature {
        id: u32,
        revision: u32,
    }

    impl Revisioned for Feature {
        type Revision = u32;

        fn key(&self) -> EntityKey {
            EntityKey::from(self.id)
        }

        fn revision(&self) -> u32 {
            self.revision
        }
    }

    #[derive(Default)]
    struct Layer {
        features: Vec<Feature>,
        motions: Vec<Motion>,
        clears: usize,
    }

    impl SyncTarget for Layer {
        type Element = Feature;

        fn elements(&self) -> Vec<Feature> {
            self.features.clone()
        }

        fn add_elements(&mut self, elements: &[Feature]) {
            self.features.extend_from_slice(elements);
        }

        fn remove_elements(&mut self, elements: &[Feature]) {
            self.features.retain(|feature| !elements.contains(feature));
        }

        fn clear(&mut self) {
            self.clears += 1;
            self.features.clear();
        }

        fn focus(&mut self, _elements: &[Feature], focus: &Focus) {
            self.motions.push(focus.motion);
        }
    }

    fn feature(id: u32, revision: u32) -> Feature {
        Feature { id, revision }
    }

    fn store(features: Vec<Feature>) -> Store<Feature> {
        Store::new(
            features,
            StoreOptions::new(|feature: &Feature| EntityKey::from(feature.id)),
        )
    }

    fn strategy(options: LoadingOptions) -> LoadingStrategy<Feature, EntityState, Layer> {
        LoadingStrategy::new(options, |feature: &Feature| feature.clone())
    }

    fn layer_ids(surface: &Surface<Layer>) -> Vec<u32> {
        surface
            .with_target(|layer| layer.features.iter().map(|f| f.id).collect())
            .unwrap()
    }

    #[test]
    fn activation_loads_the_surface() {
        let store = store(vec![feature(1, 1), feature(2, 1)]);
        let loading = strategy(LoadingOptions::default());
        let surface = Surface::new(Layer::default());
        loading.attach(&store, surface.clone());

        store.add_strategy(&loading, true).unwrap();
        assert_eq!(layer_ids(&surface), vec![1, 2]);

        store.insert(feature(3, 1));
        assert_eq!(layer_ids(&surface), vec![1, 2, 3]);

        store.delete(&feature(1, 1));
        assert_eq!(layer_ids(&surface), vec![2, 3]);
    }

    #[test]
    fn inactive_strategy_does_nothing() {
        let store = store(vec![feature(1, 1)]);
        let loading = strategy(LoadingOptions::default());
        let surface = Surface::new(Layer::default());
        loading.attach(&store, surface.clone());
        store.add_strategy(&loading, false).unwrap();

        assert!(layer_ids(&surface).is_empty());
    }

    #[test]
    fn stale_revisions_are_replaced() {
        let store = store(vec![feature(1, 1)]);
        let loading = strategy(LoadingOptions::default());
        let surface = Surface::new(Layer::default());
        loading.attach(&store, surface.clone());
        store.add_strategy(&loading, true).unwrap();

        store.update(feature(1, 2));
        let revisions = surface
            .with_target(|layer| layer.features.iter().map(|f| f.revision).collect::<Vec<_>>())
            .unwrap();
        assert_eq!(revisions, vec![2]);
    }

    #[test]
    fn empty_projection_clears_the_surface() {
        let store = store(vec![feature(1, 1)]);
        let loading = strategy(LoadingOptions::default());
        let surface = Surface::new(Layer::default());
        loading.attach(&store, surface.clone());
        store.add_strategy(&loading, true).unwrap();

        store.soft_clear();
        assert!(layer_ids(&surface).is_empty());
        assert_eq!(surface.with_target(|layer| layer.clears).unwrap(), 1);
    }

    #[test]
    fn filtered_entities_leave_the_surface() {
        let store = store(vec![feature(1, 1), feature(2, 1), feature(3, 1)]);
        let loading = strategy(LoadingOptions::default());
        let surface = Surface::new(Layer::default());
        loading.attach(&store, surface.clone());
        store.add_strategy(&loading, true).unwrap();

        store.data_view().filter(|feature| feature.id != 2);
        assert_eq!(layer_ids(&surface), vec![1, 3]);
    }

    #[test]
    fn motion_follows_store_history() {
        let store = store(vec![feature(1, 1)]);
        let loading = strategy(LoadingOptions::default());
        let surface = Surface::new(Layer::default());
        loading.attach(&store, surface.clone());
        store.add_strategy(&loading, true).unwrap();

        // incremental change, nothing filtered
        store.insert(feature(2, 1));
        // a filter hides an entity
        store.data_view().filter(|feature| feature.id == 1);

        let motions = surface.with_target(|layer| layer.motions.clone()).unwrap();
        assert_eq!(motions, vec![Motion::Default, Motion::Default]);
    }

    #[test]
    fn configured_motion_wins() {
        let store = store(vec![feature(1, 1)]);
        let loading = strategy(LoadingOptions {
            motion: Some(Motion::Zoom),
            ..Default::default()
        });
        let surface = Surface::new(Layer::default());
        loading.attach(&store, surface.clone());
        store.add_strategy(&loading, true).unwrap();
        store.insert(feature(2, 1));

        let motions = surface.with_target(|layer| layer.motions.clone()).unwrap();
        assert_eq!(motions, vec![Motion::Zoom, Motion::Zoom]);
    }

    #[test]
    fn attaching_while_active_syncs_immediately() {
        let store = store(vec![feature(1, 1)]);
        let loading = strategy(LoadingOptions::default());
        store.add_strategy(&loading, true).unwrap();

        let surface = Surface::unbound();
        loading.attach(&store, surface.clone());
        assert!(!surface.is_bound());

        surface.bind(Layer::default());
        store.insert(feature(2, 1));
        assert_eq!(layer_ids(&surface), vec![1, 2]);
    }

    #[test]
    fn one_strategy_many_stores() {
        let first = store(vec![feature(1, 1)]);
        let second = store(vec![feature(7, 1)]);
        let loading = strategy(LoadingOptions::default());
        let first_surface = Surface::new(Layer::default());
        let second_surface = Surface::new(Layer::default());
        loading.attach(&first, first_surface.clone());
        loading.attach(&second, second_surface.clone());

        first.add_strategy(&loading, false).unwrap();
        second.add_strategy(&loading, true).unwrap();
        assert_eq!(layer_ids(&first_surface), vec![1]);
        assert_eq!(layer_ids(&second_surface), vec![7]);

        second.remove_strategy(&loading);
        second.insert(feature(8, 1));
        first.insert(feature(2, 1));
        assert_eq!(layer_ids(&first_surface), vec![1, 2]);
        assert_eq!(layer_ids(&second_surface), vec![7]);
    }

    #[test]
    fn unbinding_releases_the_surface() {
        let loading = strategy(LoadingOptions::default());
        let mut released = Vec::new();
        for id in 1..=3 {
            let store = store(vec![feature(id, 1)]);
            loading.attach(&store, Surface::new(Layer::default()));
            store.add_strategy(&loading, true).unwrap();

            store.destroy();
            released.push(loading.surface(&store).is_none());
        }
        assert_eq!(released, vec![true, true, true]);
    }

    #[test]
    fn removing_the_strategy_releases_the_surface() {
        let first = store(vec![feature(1, 1)]);
        let second = store(vec![feature(2, 1)]);
        let loading = strategy(LoadingOptions::default());
        loading.attach(&first, Surface::new(Layer::default()));
        loading.attach(&second, Surface::new(Layer::default()));
        first.add_strategy(&loading, false).unwrap();
        second.add_strategy(&loading, false).unwrap();

        first.remove_strategy(&loading);
        assert!(loading.surface(&first).is_none());
        assert!(loading.surface(&second).is_some());
    }

    #[test]
    fn options_deserialize() {
        let options: LoadingOptions =
            serde_json::from_str(r#"{"motion": "none", "area_ratio": 0.004}"#).unwrap();
        assert_eq!(options.motion, Some(Motion::None));
        assert_eq!(options.area_ratio, Some(0.004));
        assert_eq!(options.view_scale, None);
    }
}
