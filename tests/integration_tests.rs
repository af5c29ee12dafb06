//! Integration tests for Entwine

use entwine::{
    diff, EntityKey, EntityStatePatch, Focus, LoadingOptions, LoadingStrategy, Motion, Revisioned,
    Selector, SelectorOptions, StateChange, Store, StoreError, StoreOptions, Strategy,
    StrategyHooks, StrategyKind, Surface, SyncTarget, WatchGuard,
};
use serde_json::{json, Map};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq)]
struct Row {
    id: u32,
    name: String,
}

fn row(id: u32, name: &str) -> Row {
    Row {
        id,
        name: name.to_string(),
    }
}

fn rows() -> StoreOptions<Row> {
    StoreOptions::new(|row: &Row| EntityKey::from(row.id))
        .with_property(|row: &Row, name: &str| match name {
            "name" => Some(json!(row.name)),
            _ => None,
        })
}

fn names(store: &Store<Row>) -> Vec<String> {
    store.all().iter().map(|row| row.name.clone()).collect()
}

#[test]
fn store_integration() {
    let store: Store<Row> = Store::new(vec![row(1, "a"), row(2, "b")], rows());
    assert!(store.pristine());

    store.update(row(1, "A"));
    assert_eq!(names(&store), vec!["A", "b"]);
    assert!(!store.pristine());

    store.insert(row(3, "c"));
    store.delete_by_key(&EntityKey::from(2u32));
    assert_eq!(names(&store), vec!["A", "c"]);
    assert_eq!(store.property(&row(9, "z"), "name"), Some(json!("z")));

    store.load(vec![row(5, "e")]);
    assert!(store.pristine());
    assert_eq!(store.keys(), vec![EntityKey::from(5u32)]);
}

#[test]
fn views_follow_the_store() {
    let store: Store<Row> = Store::new(vec![row(2, "b"), row(1, "a"), row(3, "c")], rows());
    store.data_view().filter(|row| row.id != 3);
    store.state_view().sort(|x, y| x.name.cmp(&y.name));

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let _guard = store.state_view().watch(move |records| {
        let names: Vec<String> = records.iter().map(|r| r.entity.name.clone()).collect();
        sink.borrow_mut().push(names);
    });

    store.insert(row(0, "0"));
    assert_eq!(
        *seen.borrow(),
        vec![vec!["a", "b"], vec!["0", "a", "b"]]
    );

    store.clear();
    assert!(store.is_empty());
    assert!(store.state_view().is_empty());
}

#[test]
fn state_flows_into_the_state_view() {
    let store: Store<Row> = Store::new(vec![row(1, "a"), row(2, "b")], rows());
    let changes = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&changes);
    let _guard = store
        .state()
        .changes()
        .watch(move |change| sink.borrow_mut().push(change.clone()));

    store
        .state()
        .update(&row(2, "b"), &EntityStatePatch::new().visible(true), false);

    let visible: Vec<u32> = store
        .state_view()
        .all()
        .iter()
        .filter(|record| record.state.visible)
        .map(|record| record.entity.id)
        .collect();
    assert_eq!(visible, vec![2]);
    assert_eq!(
        *changes.borrow(),
        vec![
            StateChange::Initial,
            StateChange::Updated(vec![EntityKey::from(2u32)])
        ]
    );
}

#[derive(Default)]
struct Recording {
    activations: Cell<usize>,
    emissions: Rc<Cell<usize>>,
}

impl StrategyHooks<Row, entwine::EntityState> for Recording {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Custom("recording")
    }

    fn on_activate(&self, store: &Store<Row>) -> Option<WatchGuard> {
        self.activations.set(self.activations.get() + 1);
        let emissions = Rc::clone(&self.emissions);
        Some(store.subscribe(move |_| emissions.set(emissions.get() + 1)))
    }
}

#[test]
fn duplicate_strategy_is_rejected() {
    let store: Store<Row> = Store::empty(rows());
    store
        .add_strategy(Strategy::new(Recording::default()), false)
        .unwrap();

    let result = store.add_strategy(Strategy::new(Recording::default()), true);
    assert_eq!(
        result,
        Err(StoreError::DuplicateStrategy {
            kind: StrategyKind::Custom("recording")
        })
    );
    assert_eq!(store.strategy_count(), 1);
}

#[test]
fn double_activation_syncs_once() {
    let hooks = Rc::new(Recording::default());
    let strategy = Strategy::shared(Rc::clone(&hooks));
    let store: Store<Row> = Store::empty(rows());
    store.add_strategy(&strategy, true).unwrap();
    strategy.activate();
    assert_eq!(hooks.activations.get(), 2);

    hooks.emissions.set(0);
    store.insert(row(1, "a"));
    assert_eq!(hooks.emissions.get(), 1);
}

#[derive(Clone, Debug, PartialEq)]
struct Element {
    key: &'static str,
    revision: u32,
}

impl Revisioned for Element {
    type Revision = u32;

    fn key(&self) -> EntityKey {
        EntityKey::from(self.key)
    }

    fn revision(&self) -> u32 {
        self.revision
    }
}

fn element(key: &'static str, revision: u32) -> Element {
    Element { key, revision }
}

#[test]
fn reconcile_integration() {
    let source = vec![element("k1", 1), element("k2", 1)];
    let target = vec![element("k1", 1), element("k2", 2), element("k3", 1)];

    let result = diff(&source, &target);
    assert_eq!(result.add, vec![element("k2", 2), element("k3", 1)]);
    assert_eq!(result.remove, vec![element("k2", 1)]);

    assert!(diff(&target, &target).is_empty());
}

#[derive(Default)]
struct Layer {
    elements: Vec<Element>,
    focused: Vec<Motion>,
}

impl SyncTarget for Layer {
    type Element = Element;

    fn elements(&self) -> Vec<Element> {
        self.elements.clone()
    }

    fn add_elements(&mut self, elements: &[Element]) {
        self.elements.extend_from_slice(elements);
    }

    fn remove_elements(&mut self, elements: &[Element]) {
        self.elements.retain(|existing| !elements.contains(existing));
    }

    fn focus(&mut self, _elements: &[Element], focus: &Focus) {
        self.focused.push(focus.motion);
    }
}

#[test]
fn loading_strategy_mirrors_the_store() {
    let store: Store<Element> = Store::new(
        vec![element("k1", 1), element("k2", 1)],
        StoreOptions::new(Element::key),
    );
    let loading: LoadingStrategy<Element, entwine::EntityState, Layer> =
        LoadingStrategy::new(LoadingOptions::default(), Element::clone);
    let surface = Surface::new(Layer::default());
    loading.attach(&store, surface.clone());
    store.add_strategy(&loading, true).unwrap();

    store.update(element("k2", 2));
    store.insert(element("k3", 1));

    let mirrored = surface.with_target(|layer| layer.elements.clone()).unwrap();
    assert_eq!(
        mirrored,
        vec![element("k1", 1), element("k2", 2), element("k3", 1)]
    );
    let focused = surface.with_target(|layer| layer.focused.clone()).unwrap();
    assert_eq!(focused, vec![Motion::Default]);

    store.deactivate_strategy_of_type(StrategyKind::Loading);
    store.insert(element("k4", 1));
    assert_eq!(surface.with_target(|layer| layer.elements.len()).unwrap(), 3);
}

#[test]
fn unbound_surface_reports_an_error() {
    let surface: Surface<Layer> = Surface::unbound();
    assert_eq!(surface.clear(), Err(StoreError::UnboundTarget));
    assert_eq!(
        surface
            .set_elements(&[element("k1", 1)], &Focus::new(Motion::None))
            .map(|diff| diff.add.len()),
        Err(StoreError::UnboundTarget)
    );
}

#[derive(Debug)]
struct Tool {
    name: &'static str,
}

#[test]
fn selector_integration() {
    let selector = Selector::new(
        StoreOptions::new(|tool: &Tool| EntityKey::from(tool.name)),
        SelectorOptions::default(),
    );
    selector.load(vec![Tool { name: "pan" }, Tool { name: "zoom" }]);

    assert!(selector.activate(&"pan".into(), Map::new()));
    assert!(selector.activate(&"zoom".into(), Map::new()));

    let active: Vec<&str> = selector
        .store()
        .state_view()
        .all()
        .iter()
        .filter(|record| record.state.active)
        .map(|record| record.entity.name)
        .collect();
    assert_eq!(active, vec!["zoom"]);

    assert!(selector.activate_previous());
    assert_eq!(selector.active_key(), Some(EntityKey::from("pan")));

    selector.destroy();
    assert!(selector.all().is_empty());
}
