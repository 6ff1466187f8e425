//! Injection tokens, resolution scopes, and injected arguments.
//!
//! Declarations name their dependencies with string-keyed tokens; a
//! [`Scope`] maps those keys to live providers at resolution time. The
//! [`combine`] pass reassembles resolved dependencies into declaration
//! order, so a body's argument slice lines up with its dependency list.

use crate::component::ComponentDef;
use crate::hook::HookHandle;
use crate::runtime::Renderable;
use crate::value::Value;
use crate::watcher::Watcher;
use std::collections::HashMap;

/// What a token resolves to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InjectorKind {
    Hook,
    Constant,
}

/// A named dependency request.
#[derive(Clone, Debug)]
pub struct Token {
    pub key: String,
    pub kind: InjectorKind,
}

/// One entry of a declaration's dependency list.
#[derive(Clone)]
pub enum Dependency {
    Hook(Token),
    Constant(Token),
    /// A nested component declaration, resolved recursively.
    Component(ComponentDef),
}

impl Dependency {
    pub(crate) fn hook_key(&self) -> Option<&str> {
        match self {
            Dependency::Hook(token) => Some(&token.key),
            _ => None,
        }
    }

    pub(crate) fn constant_key(&self) -> Option<&str> {
        match self {
            Dependency::Constant(token) => Some(&token.key),
            _ => None,
        }
    }
}

impl From<ComponentDef> for Dependency {
    fn from(def: ComponentDef) -> Self {
        Dependency::Component(def)
    }
}

/// Request a named hook dependency.
pub fn hook(key: impl Into<String>) -> Dependency {
    Dependency::Hook(Token {
        key: key.into(),
        kind: InjectorKind::Hook,
    })
}

/// Request a named constant dependency.
pub fn constant(key: impl Into<String>) -> Dependency {
    Dependency::Constant(Token {
        key: key.into(),
        kind: InjectorKind::Constant,
    })
}

enum Provided {
    Hook(HookHandle),
    Constant(Value),
}

/// Key-to-provider map a declaration resolves against.
#[derive(Default)]
pub struct Scope {
    entries: HashMap<String, Provided>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hook(mut self, key: impl Into<String>, hook: HookHandle) -> Self {
        self.entries.insert(key.into(), Provided::Hook(hook));
        self
    }

    pub fn with_constant(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries
            .insert(key.into(), Provided::Constant(value.into()));
        self
    }

    pub fn hook(&self, key: &str) -> Option<HookHandle> {
        match self.entries.get(key) {
            Some(Provided::Hook(hook)) => Some(hook.clone()),
            _ => None,
        }
    }

    pub fn constant(&self, key: &str) -> Option<Value> {
        match self.entries.get(key) {
            Some(Provided::Constant(value)) => Some(value.clone()),
            _ => None,
        }
    }
}

/// One resolved dependency, in declaration position.
#[derive(Clone)]
pub enum Injected {
    Watcher(Watcher),
    Constant(Value),
    Component(Renderable),
}

impl Injected {
    /// The watcher behind a hook dependency.
    ///
    /// # Panics
    /// Panics if this position holds a constant or component.
    pub fn watcher(&self) -> &Watcher {
        match self {
            Injected::Watcher(watcher) => watcher,
            _ => panic!("dependency at this position is not a hook"),
        }
    }

    /// The value behind a constant dependency.
    ///
    /// # Panics
    /// Panics if this position holds a hook or component.
    pub fn constant(&self) -> &Value {
        match self {
            Injected::Constant(value) => value,
            _ => panic!("dependency at this position is not a constant"),
        }
    }

    /// The renderable behind a component dependency.
    ///
    /// # Panics
    /// Panics if this position holds a hook or constant.
    pub fn component(&self) -> &Renderable {
        match self {
            Injected::Component(renderable) => renderable,
            _ => panic!("dependency at this position is not a component"),
        }
    }
}

/// Zip resolved hooks, constants, and components back into the declaration
/// order of `deps`. Each input list must hold exactly the resolutions for
/// its kind, in the order those dependencies appear in `deps`.
pub(crate) fn combine(
    deps: &[Dependency],
    watchers: Vec<Watcher>,
    constants: Vec<Value>,
    components: Vec<Renderable>,
) -> Vec<Injected> {
    let mut watchers = watchers.into_iter();
    let mut constants = constants.into_iter();
    let mut components = components.into_iter();
    deps.iter()
        .filter_map(|dep| match dep {
            Dependency::Hook(_) => watchers.next().map(Injected::Watcher),
            Dependency::Constant(_) => constants.next().map(Injected::Constant),
            Dependency::Component(_) => components.next().map(Injected::Component),
        })
        .collect()
}
