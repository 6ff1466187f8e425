//! Hookwire - reactive dependency injection wired through named hooks.
//!
//! Hookwire resolves declarations (hooks, constants, components) against
//! named scopes. A hook is a stateful reactive source; anything depending
//! on it only comes alive once every hook it names has produced a value,
//! and from then on re-runs when a watched field actually changes.
//!
//! # Quick Start
//!
//! ```
//! use hookwire::prelude::*;
//!
//! let rt = Runtime::new();
//! let registry = configure(&rt);
//! rt.mount(&registry.holder(), Record::default());
//!
//! let counter = registry.hook(vec![], |ctx, _| {
//!     let count = ctx.state(|| 0i64);
//!     let bump = {
//!         let count = count.clone();
//!         ctx.action(move |_| count.update(|n| *n += 1))
//!     };
//!     Record::build()
//!         .field("count", count.get())
//!         .field("bump", bump)
//!         .finish()
//! });
//! let counter = counter.resolve(&Scope::new()).unwrap();
//! assert_eq!(counter.current().unwrap().get("count").as_int(), Some(0));
//!
//! counter.current().unwrap().get("bump").as_action().unwrap().fire();
//! assert_eq!(counter.current().unwrap().get("count").as_int(), Some(1));
//! ```
//!
//! # Rules of State
//!
//! Hook bodies re-run like render functions, so `ctx.state` and
//! `ctx.action` calls must happen in the same order on every run: keep
//! them at the top level, out of conditionals and loops.

pub mod watch;

pub mod prelude {
    //! Common imports for hookwire applications.
    pub use crate::watch::{Mirror, WatchOptions, Watched, watch};
    pub use hookwire_core::inject;
    pub use hookwire_core::{
        Action, Node, Record, Renderable, ResolveError, Runtime, Scope, Value, WatchMode,
        configure, configure_with,
    };
    pub use hookwire_render::{render_to_string, text_content};
}

// Re-export core types at crate root
pub use hookwire_core::{
    Action, ComponentDef, ConstantDef, Dependency, HookDef, HookHandle, Injected, Node, Record,
    Renderable, ResolveError, Runtime, Scope, UnitCtx, UnitId, Value, WatchMode, configure,
    configure_with, inject,
};
pub use hookwire_render::{render_to_string, text_content};

pub use hookwire_core as core;
pub use hookwire_render as render;
