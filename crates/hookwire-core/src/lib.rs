//! Core types and runtime for hookwire.

pub mod component;
pub mod error;
pub mod inject;
pub mod registry;
pub mod runtime;
pub mod value;
pub mod watcher;

mod hook;

// Re-export the runtime surface for convenience
pub use runtime::{Node, Renderable, Runtime, StateSlot, UnitCtx, UnitId, Updater};

// Re-export the resolution surface
pub use component::{ComponentBody, ComponentDef};
pub use error::ResolveError;
pub use hook::{HookBody, HookHandle, SubscribeFn, Unsubscribe};
pub use inject::{Dependency, Injected, InjectorKind, Scope, Token};
pub use registry::{ConstantDef, HookDef, Registry, configure, configure_with};
pub use value::{Action, Record, RecordBuilder, Value};
pub use watcher::{StateReader, WatchMode, Watcher};
