//! Registry: the configured entry point of a wiring setup.
//!
//! A registry is created against a [`Runtime`], collects the hook entries
//! committed through it, and exposes the declaration constructors
//! ([`Registry::constant`], [`Registry::hook`], [`Registry::component`]).
//! Committed hooks live as children of the registry's holder unit, which
//! must be mounted exactly once; hooks committed after the holder mounts
//! appear on its next render.

use crate::component::{ComponentBody, ComponentDef};
use crate::error::ResolveError;
use crate::hook::{HookBody, HookHandle, create_hook};
use crate::inject::{Dependency, Injected, Scope};
use crate::runtime::{Node, Renderable, Runtime, UnitCtx, Updater};
use crate::value::{Record, Value};
use crate::watcher::WatchMode;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_IDENTITY: AtomicUsize = AtomicUsize::new(1);

fn next_identity() -> String {
    format!("hook-{}", NEXT_IDENTITY.fetch_add(1, Ordering::Relaxed))
}

struct RegisteredHook {
    identity: String,
    renderable: Renderable,
}

struct RegistryInner {
    rt: Runtime,
    mode: WatchMode,
    hooks: RefCell<Vec<RegisteredHook>>,
    holder_updater: RefCell<Option<Updater>>,
    holder_mounts: Cell<usize>,
}

/// Handle to one configured wiring setup. Cloning shares the setup.
#[derive(Clone)]
pub struct Registry {
    inner: Rc<RegistryInner>,
}

/// Configure a registry with field-level change detection.
pub fn configure(rt: &Runtime) -> Registry {
    configure_with(rt, WatchMode::default())
}

/// Configure a registry with an explicit [`WatchMode`].
pub fn configure_with(rt: &Runtime, mode: WatchMode) -> Registry {
    tracing::debug!(?mode, "configuring registry");
    Registry {
        inner: Rc::new(RegistryInner {
            rt: rt.clone(),
            mode,
            hooks: RefCell::new(Vec::new()),
            holder_updater: RefCell::new(None),
            holder_mounts: Cell::new(0),
        }),
    }
}

impl Registry {
    pub fn runtime(&self) -> &Runtime {
        &self.inner.rt
    }

    pub(crate) fn mode(&self) -> WatchMode {
        self.inner.mode
    }

    /// Declare a derived constant: `project` runs over the values of the
    /// constant dependencies, in declaration order, at resolution time.
    pub fn constant(
        &self,
        deps: Vec<Dependency>,
        project: impl Fn(&[Value]) -> Value + 'static,
    ) -> ConstantDef {
        ConstantDef {
            deps: Rc::new(deps),
            project: Rc::new(project),
        }
    }

    /// Declare a hook. The body re-runs like any render function; the record
    /// it returns is the hook's emitted value.
    pub fn hook(
        &self,
        deps: Vec<Dependency>,
        body: impl Fn(&mut UnitCtx, &[Injected]) -> Record + 'static,
    ) -> HookDef {
        HookDef {
            registry: self.clone(),
            deps: Rc::new(deps),
            body: Rc::new(body),
        }
    }

    /// Declare a component. The body runs once per resolution, after every
    /// hook dependency has produced a value.
    pub fn component(
        &self,
        deps: Vec<Dependency>,
        body: impl Fn(&[Injected]) -> Renderable + 'static,
    ) -> ComponentDef {
        ComponentDef::new(self.clone(), Rc::new(deps), Rc::new(body))
    }

    /// The unit that hosts every committed hook entry. Mount it once at the
    /// top of the application before resolving hook-dependent declarations.
    ///
    /// # Panics
    /// Panics if mounted more than once.
    pub fn holder(&self) -> Renderable {
        let registry = self.clone();
        Renderable::new(move |ctx, _| {
            *registry.inner.holder_updater.borrow_mut() = Some(ctx.updater());
            let registry_mount = registry.clone();
            ctx.on_mount(move || {
                let mounts = registry_mount.inner.holder_mounts.get() + 1;
                registry_mount.inner.holder_mounts.set(mounts);
                if mounts > 1 {
                    panic!(
                        "the hookwire holder must be mounted exactly once \
                         at the top of the application"
                    );
                }
            });
            let children = registry
                .inner
                .hooks
                .borrow()
                .iter()
                .map(|hook| Node::unit(&hook.renderable, Record::default()))
                .collect();
            Node::elem("hooks", children)
        })
    }

    /// Identities of the committed hook entries, in commit order.
    pub fn hook_identities(&self) -> Vec<String> {
        self.inner
            .hooks
            .borrow()
            .iter()
            .map(|hook| hook.identity.clone())
            .collect()
    }

    pub(crate) fn render_hook(&self, renderable: Renderable) {
        let identity = next_identity();
        tracing::debug!(%identity, "committing hook entry");
        self.inner.hooks.borrow_mut().push(RegisteredHook {
            identity,
            renderable,
        });
        let updater = self.inner.holder_updater.borrow().clone();
        if let Some(updater) = updater {
            updater.call();
        }
    }
}

/// A declared derived constant.
#[derive(Clone)]
pub struct ConstantDef {
    deps: Rc<Vec<Dependency>>,
    project: Rc<dyn Fn(&[Value]) -> Value>,
}

impl ConstantDef {
    /// Resolve against a scope. Missing constants read as unset.
    pub fn resolve(&self, scope: &Scope) -> Value {
        let values: Vec<Value> = self
            .deps
            .iter()
            .filter_map(|dep| dep.constant_key())
            .map(|key| scope.constant(key).unwrap_or_default())
            .collect();
        (self.project)(&values)
    }
}

/// A declared hook, not yet resolved against a scope.
#[derive(Clone)]
pub struct HookDef {
    registry: Registry,
    deps: Rc<Vec<Dependency>>,
    body: HookBody,
}

impl HookDef {
    /// Resolve and commit this hook. With no hook dependencies the entry
    /// commits immediately; otherwise it commits once every upstream hook
    /// has emitted at least one value.
    pub fn resolve(&self, scope: &Scope) -> Result<HookHandle, ResolveError> {
        create_hook(
            &self.registry,
            Rc::clone(&self.body),
            Rc::clone(&self.deps),
            scope,
        )
    }
}
