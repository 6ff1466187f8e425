//! Hook entries: committed reactive sources with listener fan-out.
//!
//! A hook's body is an ordinary render function whose returned record is the
//! hook's current value. Every commit stores the value and schedules a drain
//! of the listener list at the end of the scheduling turn, so listeners
//! always observe a fully committed turn.
//!
//! Listener removal is two-phase. A listener marked for deletion before a
//! drain reaches it is skipped; a one-shot listener is marked after it runs.
//! Both kinds are pruned at the end of the drain, and listeners added while
//! a drain is in flight wait for the next one.

use crate::error::ResolveError;
use crate::inject::{Dependency, Injected, Scope, combine};
use crate::registry::Registry;
use crate::runtime::{Node, Renderable, UnitCtx};
use crate::value::Record;
use crate::watcher::Watcher;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Subscription entry point of a hook: give it a callback, get back an
/// unsubscribe handle.
pub type SubscribeFn = Rc<dyn Fn(Box<dyn Fn(&Record)>) -> Unsubscribe>;

/// Revokes one subscription. Calling it more than once is harmless.
#[derive(Clone)]
pub struct Unsubscribe {
    f: Rc<dyn Fn()>,
}

impl Unsubscribe {
    pub(crate) fn new(f: impl Fn() + 'static) -> Self {
        Self { f: Rc::new(f) }
    }

    pub fn call(&self) {
        (self.f)();
    }
}

enum ListenerCallback {
    Durable(Box<dyn Fn(&Record)>),
    Once(RefCell<Option<Box<dyn FnOnce(&Record)>>>),
}

struct Listener {
    callback: ListenerCallback,
    /// Set by unsubscribe; a drain skips and prunes the listener.
    delete_before: Cell<bool>,
    /// One-shot listeners are pruned after they run.
    delete_after: bool,
}

#[derive(Default)]
struct HookStore {
    listeners: Vec<Rc<Listener>>,
    state: Option<Record>,
    mounted: bool,
}

/// Handle to a committed (or committing) hook entry.
#[derive(Clone)]
pub struct HookHandle {
    store: Rc<RefCell<HookStore>>,
}

impl std::fmt::Debug for HookHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookHandle").finish_non_exhaustive()
    }
}

impl HookHandle {
    fn new() -> Self {
        Self {
            store: Rc::new(RefCell::new(HookStore::default())),
        }
    }

    /// Latest value this hook has produced, if it has committed.
    pub fn current(&self) -> Option<Record> {
        self.store.borrow().state.clone()
    }

    /// Register a durable listener. If the hook already holds a value the
    /// callback fires immediately with it, then stays registered for every
    /// later emission.
    pub fn subscribe(&self, callback: impl Fn(&Record) + 'static) -> Unsubscribe {
        let replay = {
            let store = self.store.borrow();
            if store.mounted { store.state.clone() } else { None }
        };
        if let Some(state) = replay {
            callback(&state);
        }

        let listener = Rc::new(Listener {
            callback: ListenerCallback::Durable(Box::new(callback)),
            delete_before: Cell::new(false),
            delete_after: false,
        });
        self.store.borrow_mut().listeners.push(Rc::clone(&listener));
        Unsubscribe::new(move || listener.delete_before.set(true))
    }

    /// Register a one-shot listener. Fires immediately (without registering)
    /// if the hook already holds a value, otherwise on the first emission.
    pub fn once(&self, callback: impl FnOnce(&Record) + 'static) {
        let replay = {
            let store = self.store.borrow();
            if store.mounted { store.state.clone() } else { None }
        };
        if let Some(state) = replay {
            callback(&state);
            return;
        }
        self.store.borrow_mut().listeners.push(Rc::new(Listener {
            callback: ListenerCallback::Once(RefCell::new(Some(Box::new(callback)))),
            delete_before: Cell::new(false),
            delete_after: true,
        }));
    }

    pub(crate) fn subscribe_fn(&self) -> SubscribeFn {
        let handle = self.clone();
        Rc::new(move |callback| handle.subscribe(callback))
    }

    /// Deliver the current value to every registered listener and prune
    /// marked ones. Listeners added during the drain are kept for the next
    /// drain rather than invoked in this one.
    fn drain(&self) {
        let (snapshot, state) = {
            let store = self.store.borrow();
            let Some(state) = store.state.clone() else {
                return;
            };
            (store.listeners.clone(), state)
        };

        let mut dead: Vec<Rc<Listener>> = Vec::new();
        for listener in &snapshot {
            if listener.delete_before.get() {
                dead.push(Rc::clone(listener));
                continue;
            }
            match &listener.callback {
                ListenerCallback::Durable(f) => f(&state),
                ListenerCallback::Once(slot) => {
                    if let Some(f) = slot.borrow_mut().take() {
                        f(&state);
                    }
                }
            }
            if listener.delete_after {
                dead.push(Rc::clone(listener));
            }
        }

        if !dead.is_empty() {
            self.store
                .borrow_mut()
                .listeners
                .retain(|kept| !dead.iter().any(|gone| Rc::ptr_eq(kept, gone)));
        }
    }
}

/// Body of a hook: a render-context function over its injected dependencies
/// producing the hook's value record.
pub type HookBody = Rc<dyn Fn(&mut UnitCtx, &[Injected]) -> Record>;

/// Resolve a hook's dependencies against a scope and commit it into the
/// registry's holder.
///
/// Constant dependencies resolve eagerly (missing constants read as unset).
/// Hook dependencies gate readiness: the entry only commits once every
/// upstream hook has produced at least one value, each of which seeds a
/// [`Watcher`]. A missing upstream hook is an error.
pub(crate) fn create_hook(
    registry: &Registry,
    body: HookBody,
    deps: Rc<Vec<Dependency>>,
    scope: &Scope,
) -> Result<HookHandle, ResolveError> {
    let handle = HookHandle::new();

    let mut constants = Vec::new();
    let mut upstream = Vec::new();
    for dep in deps.iter() {
        if let Some(key) = dep.constant_key() {
            constants.push(scope.constant(key).unwrap_or_default());
        } else if let Some(key) = dep.hook_key() {
            let hook = scope
                .hook(key)
                .ok_or_else(|| ResolveError::MissingHook(key.to_string()))?;
            upstream.push(hook);
        }
    }

    if upstream.is_empty() {
        commit_hook(registry, &handle, body, deps, constants, Vec::new());
        return Ok(handle);
    }

    // Wait for every upstream hook to produce its first value, then build
    // seeded watchers and commit.
    let pending: Rc<RefCell<Vec<Option<Record>>>> =
        Rc::new(RefCell::new(vec![None; upstream.len()]));
    let registry = registry.clone();
    for (index, hook) in upstream.iter().enumerate() {
        let pending = Rc::clone(&pending);
        let handle = handle.clone();
        let body = Rc::clone(&body);
        let deps = Rc::clone(&deps);
        let constants = constants.clone();
        let upstream = upstream.clone();
        let registry = registry.clone();
        hook.once(move |first| {
            pending.borrow_mut()[index] = Some(first.clone());
            let ready = pending.borrow().iter().all(Option::is_some);
            if !ready {
                return;
            }
            let seeds = pending.borrow();
            let watchers = upstream
                .iter()
                .zip(seeds.iter())
                .map(|(hook, seed)| {
                    Watcher::new(
                        hook.subscribe_fn(),
                        seed.clone().unwrap_or_default(),
                        registry.mode(),
                    )
                })
                .collect();
            commit_hook(&registry, &handle, body, deps, constants.clone(), watchers);
        });
    }
    Ok(handle)
}

fn commit_hook(
    registry: &Registry,
    handle: &HookHandle,
    body: HookBody,
    deps: Rc<Vec<Dependency>>,
    constants: Vec<crate::value::Value>,
    watchers: Vec<Watcher>,
) {
    let args = combine(&deps, watchers, constants, Vec::new());
    let handle = handle.clone();
    let renderable = Renderable::new(move |ctx, _| {
        let value = body(ctx, &args);
        {
            let mut store = handle.store.borrow_mut();
            store.state = Some(value);
            store.mounted = true;
        }
        let handle = handle.clone();
        ctx.defer(move || handle.drain());
        Node::Empty
    });
    registry.render_hook(renderable);
}
