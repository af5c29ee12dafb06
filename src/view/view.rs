use crate::signal::{Observable, Signal, WatchGuard};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::{Rc, Weak};

type Predicate<E> = Rc<dyn Fn(&E) -> bool>;
type Comparator<E> = Rc<dyn Fn(&E, &E) -> Ordering>;
type Reduce<E, R> = Rc<dyn Fn(&E) -> R>;
type ViewCell<E, R> = RefCell<ViewInner<E, R>>;
type Connect<E, R> = Rc<dyn Fn(Weak<ViewCell<E, R>>) -> WatchGuard>;

struct ViewInner<E, R> {
    source: Rc<dyn Observable<Vec<E>>>,
    filter: Option<Predicate<E>>,
    sort: Option<Comparator<E>>,
    reduce: Reduce<E, R>,
    join: Option<Connect<E, R>>,
    output: Signal<Vec<R>>,
    source_guard: Option<WatchGuard>,
    join_guard: Option<WatchGuard>,
    lifted: bool,
    dirty: bool,
    destroyed: bool,
}

/// A derived projection of a source sequence.
///
/// The pipeline is filter, then a stable sort, then a per-element reduce.
/// Nothing is computed until [`View::lift`] connects the view to its
/// sources. After that, every source emission marks the view dirty; an
/// observed view recomputes right away, an unobserved one on its next read.
/// Either way a read never returns a projection older than its sources.
pub struct View<E, R = E> {
    inner: Rc<ViewCell<E, R>>,
}

impl<E, R> Clone for View<E, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: Clone + 'static> View<E, E> {
    /// A view whose elements are the source elements themselves.
    pub fn new<O>(source: O) -> Self
    where
        O: Observable<Vec<E>> + 'static,
    {
        Self::build(Rc::new(source), Rc::new(|element: &E| element.clone()))
    }
}

impl<E: 'static, R: Clone + 'static> View<E, R> {
    /// A view that combines each source element with a second, independent
    /// source. `reduce` runs again whenever either source emits.
    pub fn joined<O, J, OJ, F>(source: O, other: OJ, reduce: F) -> Self
    where
        O: Observable<Vec<E>> + 'static,
        OJ: Observable<J> + 'static,
        J: 'static,
        F: Fn(&E) -> R + 'static,
    {
        let view = Self::build(Rc::new(source), Rc::new(reduce));
        view.inner.borrow_mut().join = Some(Self::connector(other));
        view
    }

    fn build(source: Rc<dyn Observable<Vec<E>>>, reduce: Reduce<E, R>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ViewInner {
                source,
                filter: None,
                sort: None,
                reduce,
                join: None,
                output: Signal::new(Vec::new()),
                source_guard: None,
                join_guard: None,
                lifted: false,
                dirty: true,
                destroyed: false,
            })),
        }
    }

    fn connector<J, OJ>(other: OJ) -> Connect<E, R>
    where
        OJ: Observable<J> + 'static,
        J: 'static,
    {
        let other = Rc::new(other);
        Rc::new(move |view: Weak<ViewCell<E, R>>| {
            other.watch_boxed(Box::new(move |_: &J| {
                if let Some(cell) = view.upgrade() {
                    invalidate(&cell);
                }
            }))
        })
    }

    /// Keep only the elements matching `predicate`. Replaces any previous
    /// filter.
    pub fn filter<F>(&self, predicate: F) -> &Self
    where
        F: Fn(&E) -> bool + 'static,
    {
        self.inner.borrow_mut().filter = Some(Rc::new(predicate));
        self.reconfigured();
        self
    }

    /// Drop the filter.
    pub fn clear_filter(&self) -> &Self {
        self.inner.borrow_mut().filter = None;
        self.reconfigured();
        self
    }

    /// Order the elements with `comparator`. Replaces any previous sort.
    pub fn sort<F>(&self, comparator: F) -> &Self
    where
        F: Fn(&E, &E) -> Ordering + 'static,
    {
        self.inner.borrow_mut().sort = Some(Rc::new(comparator));
        self.reconfigured();
        self
    }

    /// Drop the sort, back to source order.
    pub fn clear_sort(&self) -> &Self {
        self.inner.borrow_mut().sort = None;
        self.reconfigured();
        self
    }

    /// Join against another source, replacing any previous join.
    pub fn join<J, OJ, F>(&self, other: OJ, reduce: F) -> &Self
    where
        OJ: Observable<J> + 'static,
        J: 'static,
        F: Fn(&E) -> R + 'static,
    {
        let connect = Self::connector(other);
        let (previous, lifted) = {
            let mut inner = self.inner.borrow_mut();
            inner.reduce = Rc::new(reduce);
            inner.join = Some(Rc::clone(&connect));
            (inner.join_guard.take(), inner.lifted)
        };
        drop(previous);

        if lifted {
            let guard = connect(Rc::downgrade(&self.inner));
            self.inner.borrow_mut().join_guard = Some(guard);
        }
        self.reconfigured();
        self
    }

    /// Connect the view to its source and join source. Calling it again
    /// does nothing.
    pub fn lift(&self) -> &Self {
        let (source, join) = {
            let mut inner = self.inner.borrow_mut();
            if inner.lifted || inner.destroyed {
                return self;
            }
            inner.lifted = true;
            inner.dirty = true;
            (Rc::clone(&inner.source), inner.join.clone())
        };

        let view = Rc::downgrade(&self.inner);
        let source_guard = source.watch_boxed(Box::new(move |_: &Vec<E>| {
            if let Some(cell) = view.upgrade() {
                invalidate(&cell);
            }
        }));
        let join_guard = join.map(|connect| connect(Rc::downgrade(&self.inner)));

        let mut inner = self.inner.borrow_mut();
        inner.source_guard = Some(source_guard);
        inner.join_guard = join_guard;
        self
    }

    /// The current projection.
    pub fn all(&self) -> Vec<R> {
        self.ensure_fresh();
        self.output().get()
    }

    /// Watch the projection. The current projection is delivered
    /// immediately.
    pub fn watch<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(&Vec<R>) + 'static,
    {
        self.ensure_fresh();
        self.output().watch(callback)
    }

    /// A signal holding the first element matching `predicate`, kept up to
    /// date for as long as the signal lives.
    pub fn first_by<F>(&self, predicate: F) -> Signal<Option<R>>
    where
        F: Fn(&R) -> bool + 'static,
    {
        let first = Signal::new(None);
        let target = first.downgrade();

        let guard = self.watch(move |items| {
            if let Some(first) = target.upgrade() {
                first.set(items.iter().find(|item| predicate(item)).cloned());
            }
        });

        first.retain(guard);
        first
    }

    /// Number of elements in the projection.
    pub fn count(&self) -> usize {
        self.ensure_fresh();
        self.output().with(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Whether the view is connected to its sources.
    pub fn is_lifted(&self) -> bool {
        self.inner.borrow().lifted
    }

    /// Drop the filter and the sort. The join stays in place.
    pub fn clear(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.filter = None;
            inner.sort = None;
        }
        self.reconfigured();
    }

    /// Release every subscription this view holds, both upstream and from
    /// its own watchers. The view is empty and inert afterwards.
    pub fn destroy(&self) {
        let (source_guard, join_guard, output) = {
            let mut inner = self.inner.borrow_mut();
            inner.destroyed = true;
            inner.lifted = false;
            inner.dirty = false;
            inner.join = None;
            (
                inner.source_guard.take(),
                inner.join_guard.take(),
                inner.output.clone(),
            )
        };
        drop(source_guard);
        drop(join_guard);

        output.clear_observers();
        output.set(Vec::new());
    }

    fn output(&self) -> Signal<Vec<R>> {
        self.inner.borrow().output.clone()
    }

    fn reconfigured(&self) {
        invalidate(&self.inner);
    }

    fn ensure_fresh(&self) {
        let stale = {
            let inner = self.inner.borrow();
            inner.dirty && inner.lifted && !inner.destroyed
        };
        if stale {
            refresh(&self.inner);
        }
    }
}

impl<E: 'static, R: Clone + 'static> Observable<Vec<R>> for View<E, R> {
    fn current(&self) -> Vec<R> {
        self.all()
    }

    fn watch_boxed(&self, callback: Box<dyn Fn(&Vec<R>)>) -> WatchGuard {
        self.watch(move |items| callback(items))
    }
}

fn invalidate<E: 'static, R: Clone + 'static>(cell: &Rc<ViewCell<E, R>>) {
    let observed = {
        let mut inner = cell.borrow_mut();
        if !inner.lifted || inner.destroyed {
            return;
        }
        inner.dirty = true;
        inner.output.observer_count() > 0
    };
    if observed {
        refresh(cell);
    }
}

fn refresh<E: 'static, R: Clone + 'static>(cell: &Rc<ViewCell<E, R>>) {
    let (source, filter, sort, reduce, output) = {
        let mut inner = cell.borrow_mut();
        inner.dirty = false;
        (
            Rc::clone(&inner.source),
            inner.filter.clone(),
            inner.sort.clone(),
            Rc::clone(&inner.reduce),
            inner.output.clone(),
        )
    };

    let mut items = source.current();
    if let Some(filter) = filter {
        items.retain(|item| filter(item));
    }
    if let Some(sort) = sort {
        items.sort_by(|a, b| sort(a, b));
    }
    let projected: Vec<R> = items.iter().map(|item| reduce(item)).collect();

    tracing::trace!(count = projected.len(), "view recomputed");
    output.set(projected);
}
