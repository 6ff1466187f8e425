//! Headless host runtime for renderable units.
//!
//! This module is the substrate the resolution engine commits into. It
//! implements the renderable-unit boundary the engine depends on
//! (instantiate a unit with props, force-update a live instance) as a
//! single-threaded cooperative scheduler:
//!
//! - **Renderable**: a cheap-to-clone render function with pointer identity.
//! - **Unit instance**: one mounted occurrence of a renderable, with
//!   slot-indexed local state that persists across renders.
//! - **Scheduling turn**: work queued while the runtime is idle flushes
//!   immediately; a flush drains the render queue to empty, then runs one
//!   deferred task, and repeats until both queues are empty. Deferred tasks
//!   therefore always observe fully committed state.
//!
//! Rendered output is an abstract [`Node`] tree, not pixels; anything that
//! can walk [`Runtime::output`] and [`Runtime::children`] can present it.

use crate::value::{Action, Record, Value};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

// ============================================================================
// Rendered tree
// ============================================================================

/// A node in a unit's rendered output.
#[derive(Clone)]
pub enum Node {
    /// The no-op placeholder rendered by entries that are not ready.
    Empty,
    /// Literal text content.
    Text(String),
    /// A structural element with ordered children.
    Element { tag: String, children: Vec<Node> },
    /// A child renderable instance with props; the host instantiates it.
    Unit(Renderable, Record),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Node {
        Node::Text(text.into())
    }

    pub fn elem(tag: impl Into<String>, children: Vec<Node>) -> Node {
        Node::Element {
            tag: tag.into(),
            children,
        }
    }

    pub fn unit(renderable: &Renderable, props: Record) -> Node {
        Node::Unit(renderable.clone(), props)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Empty => f.write_str("Empty"),
            Node::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Node::Element { tag, children } => f
                .debug_struct("Element")
                .field("tag", tag)
                .field("children", children)
                .finish(),
            Node::Unit(_, props) => f.debug_tuple("Unit").field(props).finish(),
        }
    }
}

/// Render function for one unit: called with the unit's render context and
/// its current props, returns the rendered tree.
pub type RenderFn = Rc<dyn Fn(&mut UnitCtx, &Record) -> Node>;

/// A mountable rendering unit. Identity (for reconciliation) is the pointer
/// of the wrapped render function, so clones of one `Renderable` reconcile
/// to the same instance while two distinct renderables never do.
#[derive(Clone)]
pub struct Renderable {
    render: RenderFn,
}

impl Renderable {
    pub fn new(render: impl Fn(&mut UnitCtx, &Record) -> Node + 'static) -> Self {
        Self {
            render: Rc::new(render),
        }
    }

    /// Pointer identity comparison.
    pub fn same(&self, other: &Renderable) -> bool {
        Rc::ptr_eq(&self.render, &other.render)
    }
}

impl fmt::Debug for Renderable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Renderable(..)")
    }
}

/// Identifier of a mounted unit instance. Unit slots are reused after
/// unmount; the generation tells a reused slot apart from the instance that
/// previously occupied it, so a stale id keeps resolving to nothing.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct UnitId {
    index: usize,
    generation: u64,
}

// ============================================================================
// Unit instances
// ============================================================================

type MountTask = Box<dyn FnOnce() -> Option<Box<dyn FnOnce()>>>;

struct ChildSlot {
    /// Structural path of the `Node::Unit` within the parent's output tree.
    path: String,
    unit: UnitId,
}

struct UnitInstance {
    id: UnitId,
    renderable: Renderable,
    props: RefCell<Record>,
    /// Slot-indexed local state; slots are identified by call order within
    /// the render function, which must therefore be stable across renders.
    slots: RefCell<Vec<Rc<dyn Any>>>,
    children: RefCell<Vec<ChildSlot>>,
    output: RefCell<Node>,
    mounted: Cell<bool>,
    alive: Cell<bool>,
    queued: Cell<bool>,
    cleanups: RefCell<Vec<Box<dyn FnOnce()>>>,
}

// ============================================================================
// Runtime
// ============================================================================

struct UnitSlot {
    /// Bumped once per reuse, never reset.
    generation: u64,
    unit: Option<Rc<UnitInstance>>,
}

struct RuntimeInner {
    units: RefCell<Vec<UnitSlot>>,
    /// Indices of vacated slots, reused by the next instantiation.
    free: RefCell<Vec<usize>>,
    render_queue: RefCell<VecDeque<UnitId>>,
    deferred: RefCell<VecDeque<Box<dyn FnOnce()>>>,
    flushing: Cell<bool>,
    batching: Cell<bool>,
}

/// The host scheduler. Cloning yields another handle to the same runtime.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                units: RefCell::new(Vec::new()),
                free: RefCell::new(Vec::new()),
                render_queue: RefCell::new(VecDeque::new()),
                deferred: RefCell::new(VecDeque::new()),
                flushing: Cell::new(false),
                batching: Cell::new(false),
            }),
        }
    }

    /// Mount a renderable as a root instance and flush.
    pub fn mount(&self, renderable: &Renderable, props: Record) -> UnitId {
        let id = self.instantiate(renderable.clone(), props);
        tracing::trace!(unit = id.index, "mount root");
        self.request_render(id);
        id
    }

    /// Unmount an instance and its subtree. Idempotent: unmounting an
    /// already-unmounted instance is a no-op.
    pub fn unmount(&self, id: UnitId) {
        self.unmount_subtree(id);
        self.flush_if_idle();
    }

    /// Run `f` as a single synchronous batch: updates scheduled inside only
    /// propagate after `f` returns, so dependents are notified exactly once
    /// per batch instead of once per update.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        if self.inner.batching.get() {
            return f();
        }
        self.inner.batching.set(true);
        let out = f();
        self.inner.batching.set(false);
        self.flush_if_idle();
        out
    }

    /// Drain all pending renders and deferred tasks.
    pub fn run_until_idle(&self) {
        self.flush_if_idle();
    }

    pub fn is_alive(&self, id: UnitId) -> bool {
        self.instance(id).is_some_and(|unit| unit.alive.get())
    }

    /// The last committed output of an instance (`Node::Empty` if gone).
    pub fn output(&self, id: UnitId) -> Node {
        self.instance(id)
            .map(|unit| unit.output.borrow().clone())
            .unwrap_or(Node::Empty)
    }

    /// Child instances of a unit, in output-tree traversal order. The n-th
    /// entry corresponds to the n-th `Node::Unit` encountered when walking
    /// [`Runtime::output`] depth-first.
    pub fn children(&self, id: UnitId) -> Vec<UnitId> {
        self.instance(id)
            .map(|unit| unit.children.borrow().iter().map(|slot| slot.unit).collect())
            .unwrap_or_default()
    }

    fn instance(&self, id: UnitId) -> Option<Rc<UnitInstance>> {
        let units = self.inner.units.borrow();
        let slot = units.get(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.unit.clone()
    }

    fn instantiate(&self, renderable: Renderable, props: Record) -> UnitId {
        let mut units = self.inner.units.borrow_mut();
        let index = match self.inner.free.borrow_mut().pop() {
            Some(index) => {
                units[index].generation += 1;
                index
            }
            None => {
                units.push(UnitSlot {
                    generation: 0,
                    unit: None,
                });
                units.len() - 1
            }
        };
        let id = UnitId {
            index,
            generation: units[index].generation,
        };
        units[index].unit = Some(Rc::new(UnitInstance {
            id,
            renderable,
            props: RefCell::new(props),
            slots: RefCell::new(Vec::new()),
            children: RefCell::new(Vec::new()),
            output: RefCell::new(Node::Empty),
            mounted: Cell::new(false),
            alive: Cell::new(true),
            queued: Cell::new(false),
            cleanups: RefCell::new(Vec::new()),
        }));
        id
    }

    pub(crate) fn request_render(&self, id: UnitId) {
        if let Some(unit) = self.instance(id)
            && unit.alive.get()
            && !unit.queued.get()
        {
            unit.queued.set(true);
            self.inner.render_queue.borrow_mut().push_back(id);
        }
        self.flush_if_idle();
    }

    pub(crate) fn defer_task(&self, task: Box<dyn FnOnce()>) {
        self.inner.deferred.borrow_mut().push_back(task);
        self.flush_if_idle();
    }

    /// Flush unless a flush is already on the stack or a batch is open.
    fn flush_if_idle(&self) {
        if self.inner.flushing.get() || self.inner.batching.get() {
            return;
        }
        self.inner.flushing.set(true);
        loop {
            let next = self.inner.render_queue.borrow_mut().pop_front();
            if let Some(id) = next {
                if let Some(unit) = self.instance(id) {
                    unit.queued.set(false);
                    if unit.alive.get() {
                        self.render_unit(id);
                    }
                }
                continue;
            }
            let task = self.inner.deferred.borrow_mut().pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }
        self.inner.flushing.set(false);
    }

    /// Execute one render pass for a unit: run its render function,
    /// reconcile child units, commit the output, then run first-mount tasks
    /// (after the whole subtree has committed).
    fn render_unit(&self, id: UnitId) {
        let Some(unit) = self.instance(id) else {
            return;
        };
        if !unit.alive.get() {
            return;
        }
        tracing::trace!(unit = id.index, "render");

        let props = unit.props.borrow().clone();
        let mut ctx = UnitCtx {
            rt: self.clone(),
            unit: Rc::clone(&unit),
            cursor: 0,
            mount_tasks: Vec::new(),
        };
        let node = (unit.renderable.render)(&mut ctx, &props);
        let mount_tasks = ctx.mount_tasks;

        self.reconcile_children(&unit, &node);
        *unit.output.borrow_mut() = node;

        unit.mounted.set(true);
        for task in mount_tasks {
            if let Some(cleanup) = task() {
                unit.cleanups.borrow_mut().push(cleanup);
            }
        }
    }

    /// Match this render's child units against the previous render's by
    /// structural path and renderable identity. Kept instances get their
    /// props updated (a shallow-equal update skips the re-render, memo
    /// style); everything unmatched is unmounted or freshly mounted.
    fn reconcile_children(&self, unit: &Rc<UnitInstance>, node: &Node) {
        let mut spots = Vec::new();
        collect_units(node, &mut String::new(), &mut spots);

        let old_slots = std::mem::take(&mut *unit.children.borrow_mut());
        let mut leftovers: Vec<Option<ChildSlot>> = old_slots.into_iter().map(Some).collect();
        let mut next_slots = Vec::with_capacity(spots.len());

        for (path, child_renderable, child_props) in spots {
            let mut kept = None;
            for slot in leftovers.iter_mut() {
                let matches = match slot {
                    Some(old) if old.path == path => self
                        .instance(old.unit)
                        .is_some_and(|inst| inst.renderable.same(&child_renderable)),
                    _ => false,
                };
                if matches {
                    kept = slot.take();
                    break;
                }
            }

            let child_id = match kept {
                Some(old) => {
                    if let Some(inst) = self.instance(old.unit) {
                        let prev = inst.props.borrow().clone();
                        if !prev.shallow_eq(&child_props) {
                            *inst.props.borrow_mut() = child_props;
                            self.render_unit(old.unit);
                        }
                    }
                    old.unit
                }
                None => {
                    let child_id = self.instantiate(child_renderable, child_props);
                    self.render_unit(child_id);
                    child_id
                }
            };
            next_slots.push(ChildSlot {
                path,
                unit: child_id,
            });
        }

        for stale in leftovers.into_iter().flatten() {
            self.unmount_subtree(stale.unit);
        }
        *unit.children.borrow_mut() = next_slots;
    }

    fn unmount_subtree(&self, id: UnitId) {
        let Some(unit) = self.instance(id) else {
            return;
        };
        if !unit.alive.get() {
            return;
        }
        tracing::trace!(unit = id.index, "unmount");
        unit.alive.set(false);

        let children = std::mem::take(&mut *unit.children.borrow_mut());
        for child in children {
            self.unmount_subtree(child.unit);
        }
        let cleanups = std::mem::take(&mut *unit.cleanups.borrow_mut());
        for cleanup in cleanups {
            cleanup();
        }
        self.inner.units.borrow_mut()[id.index].unit = None;
        self.inner.free.borrow_mut().push(id.index);
    }
}

fn collect_units(node: &Node, path: &mut String, out: &mut Vec<(String, Renderable, Record)>) {
    match node {
        Node::Unit(renderable, props) => {
            out.push((path.clone(), renderable.clone(), props.clone()));
        }
        Node::Element { children, .. } => {
            let len = path.len();
            for (index, child) in children.iter().enumerate() {
                path.push_str(&format!("/{index}"));
                collect_units(child, path, out);
                path.truncate(len);
            }
        }
        Node::Empty | Node::Text(_) => {}
    }
}

// ============================================================================
// Render context
// ============================================================================

/// Force-update handle for one unit instance: calling it schedules a
/// re-render. Safe to call after unmount (no-op).
#[derive(Clone)]
pub struct Updater {
    rt: Runtime,
    id: UnitId,
}

impl Updater {
    pub fn call(&self) {
        self.rt.request_render(self.id);
    }
}

/// Per-render context handed to every render function.
///
/// State is slot-indexed by call order, so `state`/`action` must be called
/// in the same order on every render of a given instance (the usual rule for
/// positional hook storage).
pub struct UnitCtx {
    rt: Runtime,
    unit: Rc<UnitInstance>,
    cursor: usize,
    mount_tasks: Vec<MountTask>,
}

impl UnitCtx {
    pub fn id(&self) -> UnitId {
        self.unit.id
    }

    pub fn runtime(&self) -> &Runtime {
        &self.rt
    }

    /// Get or create the next local state slot. The initializer only runs on
    /// the instance's first render.
    pub fn state<T: 'static>(&mut self, init: impl FnOnce() -> T) -> StateSlot<T> {
        let index = self.cursor;
        self.cursor += 1;
        let cell = {
            let mut slots = self.unit.slots.borrow_mut();
            if index >= slots.len() {
                slots.push(Rc::new(RefCell::new(init())) as Rc<dyn Any>);
            }
            Rc::clone(&slots[index])
        };
        let cell = cell.downcast::<RefCell<T>>().unwrap_or_else(|_| {
            panic!(
                "state slot {index} changed type between renders; \
                 state() calls must happen in the same order on every render"
            )
        });
        StateSlot {
            cell,
            updater: self.updater(),
        }
    }

    /// An identity-stable [`Action`] whose body is refreshed on every render.
    /// Because the handle compares equal to itself across recomputations,
    /// storing it in an emitted record never trips field-level watchers.
    pub fn action(&mut self, f: impl Fn(&[Value]) + 'static) -> Action {
        struct ActionState {
            current: Rc<RefCell<Rc<dyn Fn(&[Value])>>>,
            handle: Action,
        }
        let f: Rc<dyn Fn(&[Value])> = Rc::new(f);
        let slot = self.state({
            let f = Rc::clone(&f);
            move || {
                let current = Rc::new(RefCell::new(f));
                let inner = Rc::clone(&current);
                let handle = Action::new(move |args| {
                    let body = Rc::clone(&inner.borrow());
                    body(args);
                });
                ActionState { current, handle }
            }
        });
        slot.with(|state| {
            *state.current.borrow_mut() = f;
            state.handle.clone()
        })
    }

    pub fn updater(&self) -> Updater {
        Updater {
            rt: self.rt.clone(),
            id: self.unit.id,
        }
    }

    /// Run `f` once, after this instance's first render pass has committed.
    pub fn on_mount(&mut self, f: impl FnOnce() + 'static) {
        if self.unit.mounted.get() {
            return;
        }
        self.mount_tasks.push(Box::new(move || {
            f();
            None
        }));
    }

    /// Like [`UnitCtx::on_mount`], but the task returns a cleanup that runs
    /// when the instance unmounts.
    pub fn on_mount_cleanup(&mut self, f: impl FnOnce() -> Box<dyn FnOnce()> + 'static) {
        if self.unit.mounted.get() {
            return;
        }
        self.mount_tasks.push(Box::new(move || Some(f())));
    }

    /// Schedule a task for the end of the current scheduling turn, after all
    /// pending renders have committed.
    pub fn defer(&self, task: impl FnOnce() + 'static) {
        self.rt.defer_task(Box::new(task));
    }
}

/// Handle to one local state slot.
pub struct StateSlot<T> {
    cell: Rc<RefCell<T>>,
    updater: Updater,
}

impl<T> Clone for StateSlot<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
            updater: self.updater.clone(),
        }
    }
}

impl<T: 'static> StateSlot<T> {
    /// Replace the value and schedule a re-render of the owning unit.
    pub fn set(&self, value: T) {
        *self.cell.borrow_mut() = value;
        self.updater.call();
    }

    /// Mutate the value in place and schedule a re-render.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.cell.borrow_mut());
        self.updater.call();
    }

    /// Read without cloning. Does not subscribe to anything; slots are plain
    /// storage, not signals.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.cell.borrow())
    }
}

impl<T: Clone + 'static> StateSlot<T> {
    pub fn get(&self) -> T {
        self.cell.borrow().clone()
    }
}
