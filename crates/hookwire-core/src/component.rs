//! Component declarations: renderables gated on hook readiness.
//!
//! A component body runs exactly once per resolution, when every upstream
//! hook it depends on has produced a value. Until then every mounted
//! instance of the component renders an empty placeholder. All instances of
//! one resolved component share a single entry (watchers, resolved body),
//! and each instance registers a dispatcher so readiness changes reach all
//! of them.

use crate::error::ResolveError;
use crate::hook::HookHandle;
use crate::inject::{Dependency, Injected, Scope, combine};
use crate::registry::Registry;
use crate::runtime::{Node, Renderable, UnitId, Updater};
use crate::value::{Record, Value};
use crate::watcher::{WatchMode, Watcher};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Body of a component: runs once over its injected dependencies and
/// returns the renderable that every instance of the component will use.
pub type ComponentBody = Rc<dyn Fn(&[Injected]) -> Renderable>;

/// An unresolved component declaration. Resolving it against a [`Scope`]
/// yields a mountable [`Renderable`]; re-resolving yields an independent
/// entry with its own watchers.
#[derive(Clone)]
pub struct ComponentDef {
    registry: Registry,
    deps: Rc<Vec<Dependency>>,
    body: ComponentBody,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// No live instance and nothing in flight.
    Idle,
    /// Waiting for upstream hooks to produce their first values.
    AwaitingHooks,
    Ready,
}

struct ComponentEntry {
    mode: WatchMode,
    deps: Rc<Vec<Dependency>>,
    body: ComponentBody,
    constants: Vec<Value>,
    components: Vec<Renderable>,
    upstream: Vec<HookHandle>,
    phase: Cell<Phase>,
    pending: RefCell<Vec<Option<Record>>>,
    watchers: RefCell<Vec<Watcher>>,
    resolved: RefCell<Option<Renderable>>,
    /// Set when the last instance unmounts after a successful resolution;
    /// the next mount re-seeds the kept watchers instead of re-resolving.
    recommit: Cell<bool>,
    once_registered: Cell<bool>,
    dispatchers: RefCell<Vec<(UnitId, Updater)>>,
}

impl ComponentDef {
    pub(crate) fn new(registry: Registry, deps: Rc<Vec<Dependency>>, body: ComponentBody) -> Self {
        Self {
            registry,
            deps,
            body,
        }
    }

    /// Resolve this declaration against a scope.
    ///
    /// Constants resolve eagerly (missing ones read as unset) and nested
    /// component dependencies resolve recursively. A missing upstream hook
    /// is an error; present hooks gate the body behind their first values.
    pub fn resolve(&self, scope: &Scope) -> Result<Renderable, ResolveError> {
        let mut constants = Vec::new();
        let mut upstream = Vec::new();
        let mut components = Vec::new();
        for dep in self.deps.iter() {
            match dep {
                Dependency::Constant(token) => {
                    constants.push(scope.constant(&token.key).unwrap_or_default());
                }
                Dependency::Hook(token) => {
                    let hook = scope
                        .hook(&token.key)
                        .ok_or_else(|| ResolveError::MissingHook(token.key.clone()))?;
                    upstream.push(hook);
                }
                Dependency::Component(def) => {
                    components.push(def.resolve(scope)?);
                }
            }
        }

        if upstream.is_empty() {
            let args = combine(&self.deps, Vec::new(), constants, components);
            return Ok((self.body)(&args));
        }

        let pending = vec![None; upstream.len()];
        let entry = Rc::new(ComponentEntry {
            mode: self.registry.mode(),
            deps: Rc::clone(&self.deps),
            body: Rc::clone(&self.body),
            constants,
            components,
            upstream,
            phase: Cell::new(Phase::Idle),
            pending: RefCell::new(pending),
            watchers: RefCell::new(Vec::new()),
            resolved: RefCell::new(None),
            recommit: Cell::new(false),
            once_registered: Cell::new(false),
            dispatchers: RefCell::new(Vec::new()),
        });

        Ok(Renderable::new(move |ctx, props| {
            let mount_entry_handle = Rc::clone(&entry);
            let id = ctx.id();
            let updater = ctx.updater();
            ctx.on_mount_cleanup(move || {
                mount_entry_handle
                    .dispatchers
                    .borrow_mut()
                    .push((id, updater.clone()));
                mount_entry(&mount_entry_handle, &updater);
                let entry = mount_entry_handle;
                Box::new(move || {
                    entry
                        .dispatchers
                        .borrow_mut()
                        .retain(|(dispatcher, _)| *dispatcher != id);
                    let last = entry.dispatchers.borrow().is_empty();
                    if last && entry.resolved.borrow().is_some() {
                        entry.phase.set(Phase::Idle);
                        entry.recommit.set(true);
                    }
                })
            });

            // render the resolved body only after this instance's mount task
            // has run, so a rearm always precedes the child's first render
            let registered = entry
                .dispatchers
                .borrow()
                .iter()
                .any(|(dispatcher, _)| *dispatcher == id);
            let resolved = entry.resolved.borrow();
            match (entry.phase.get(), resolved.as_ref()) {
                (Phase::Ready, Some(resolved)) if registered => {
                    Node::unit(resolved, props.clone())
                }
                _ => Node::Empty,
            }
        }))
    }
}

/// First-mount path for one component instance.
fn mount_entry(entry: &Rc<ComponentEntry>, updater: &Updater) {
    if entry.resolved.borrow().is_some() {
        // with no other live instance, no subscription has kept the watcher
        // state current; re-seed from the hooks before rendering
        let alone = entry.dispatchers.borrow().len() == 1;
        if entry.recommit.get() || alone {
            entry.recommit.set(false);
            for (watcher, hook) in entry.watchers.borrow().iter().zip(&entry.upstream) {
                watcher.rearm(hook.current().unwrap_or_default());
            }
        }
        entry.phase.set(Phase::Ready);
        updater.call();
        return;
    }
    if entry.once_registered.get() {
        return;
    }
    entry.once_registered.set(true);
    entry.phase.set(Phase::AwaitingHooks);

    for (index, hook) in entry.upstream.iter().enumerate() {
        let entry = Rc::clone(entry);
        hook.once(move |first| {
            entry.pending.borrow_mut()[index] = Some(first.clone());
            let ready = entry.pending.borrow().iter().all(Option::is_some);
            if !ready {
                return;
            }
            tracing::debug!("component dependencies ready, resolving body");
            let watchers: Vec<Watcher> = {
                let seeds = entry.pending.borrow();
                entry
                    .upstream
                    .iter()
                    .zip(seeds.iter())
                    .map(|(hook, seed)| {
                        Watcher::new(
                            hook.subscribe_fn(),
                            seed.clone().unwrap_or_default(),
                            entry.mode,
                        )
                    })
                    .collect()
            };
            let args = combine(
                &entry.deps,
                watchers.clone(),
                entry.constants.clone(),
                entry.components.clone(),
            );
            *entry.watchers.borrow_mut() = watchers;
            *entry.resolved.borrow_mut() = Some((entry.body)(&args));
            entry.phase.set(Phase::Ready);
            notify_all(&entry);
        });
    }
}

fn notify_all(entry: &ComponentEntry) {
    let dispatchers: Vec<Updater> = entry
        .dispatchers
        .borrow()
        .iter()
        .map(|(_, updater)| updater.clone())
        .collect();
    for updater in dispatchers {
        updater.call();
    }
}
