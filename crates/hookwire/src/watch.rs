//! Observability over resolved hooks and constants.
//!
//! [`watch`] subscribes to a set of named providers and logs a line through
//! `tracing` whenever a watched hook actually changes, optionally with a
//! field diff against the previous emission. A [`Mirror`] additionally
//! keeps the latest value of every watched entry for programmatic reads.

use chrono::Local;
use hookwire_core::{HookHandle, Record, Unsubscribe, Value};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A provider placed under observation.
#[derive(Clone)]
pub enum Watched {
    Hook(HookHandle),
    Constant(Value),
}

/// What a watch line includes.
#[derive(Clone)]
pub struct WatchOptions {
    /// Log target suffix; lines go to `<prefix>::watch`.
    pub prefix: String,
    pub show_diff: bool,
    pub show_current: bool,
    pub show_previous: bool,
    /// Latest-value sink, shared with the caller.
    pub mirror: Option<Mirror>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            prefix: "hookwire".to_string(),
            show_diff: false,
            show_current: true,
            show_previous: false,
            mirror: None,
        }
    }
}

/// Shared sink holding the latest value of every watched entry.
#[derive(Clone, Default)]
pub struct Mirror {
    inner: Rc<RefCell<HashMap<String, Value>>>,
}

impl Mirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.inner.borrow().get(name).cloned()
    }

    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.inner.borrow().clone()
    }

    fn put(&self, name: &str, value: Value) {
        self.inner.borrow_mut().insert(name.to_string(), value);
    }
}

/// Fields that differ between two records, keyed by field name, as
/// `(previous, current)` pairs. With no previous record every field of
/// `current` counts as changed.
pub fn diff(current: &Record, previous: Option<&Record>) -> IndexMap<String, (Value, Value)> {
    let mut changed = IndexMap::new();
    match previous {
        None => {
            for (key, value) in current.iter() {
                changed.insert(key.to_string(), (Value::Unset, value.clone()));
            }
        }
        Some(previous) => {
            for (key, value) in current.iter() {
                let before = previous.get(key);
                if !before.same(value) {
                    changed.insert(key.to_string(), (before, value.clone()));
                }
            }
            for (key, before) in previous.iter() {
                if !current.contains(key) {
                    changed.insert(key.to_string(), (before.clone(), Value::Unset));
                }
            }
        }
    }
    changed
}

/// Observe the given named providers. Constants are logged once; hooks are
/// logged on every emission that changes at least one field. The returned
/// handles revoke the hook subscriptions.
pub fn watch(
    entries: impl IntoIterator<Item = (String, Watched)>,
    options: WatchOptions,
) -> Vec<Unsubscribe> {
    let mut subscriptions = Vec::new();
    for (name, watched) in entries {
        match watched {
            Watched::Constant(value) => {
                if let Some(mirror) = &options.mirror {
                    mirror.put(&name, value.clone());
                }
                tracing::info!(
                    target: "hookwire::watch",
                    watched = %name,
                    prefix = %options.prefix,
                    at = %timestamp(),
                    value = ?value,
                    "constant"
                );
            }
            Watched::Hook(hook) => {
                let previous: Rc<RefCell<Option<Record>>> = Rc::new(RefCell::new(None));
                let options = options.clone();
                let name = name.clone();
                subscriptions.push(hook.subscribe(move |current| {
                    let changed = diff(current, previous.borrow().as_ref());
                    if let Some(mirror) = &options.mirror {
                        mirror.put(&name, Value::Record(current.clone()));
                    }
                    if changed.is_empty() {
                        return;
                    }
                    log_emission(&name, &options, current, previous.borrow().as_ref(), &changed);
                    *previous.borrow_mut() = Some(current.clone());
                }));
            }
        }
    }
    subscriptions
}

fn log_emission(
    name: &str,
    options: &WatchOptions,
    current: &Record,
    previous: Option<&Record>,
    changed: &IndexMap<String, (Value, Value)>,
) {
    let current = options.show_current.then(|| format!("{current:?}"));
    let previous = options
        .show_previous
        .then(|| format!("{previous:?}"))
        .filter(|_| previous.is_some());
    let changed = options.show_diff.then(|| format!("{changed:?}"));
    tracing::info!(
        target: "hookwire::watch",
        watched = %name,
        prefix = %options.prefix,
        at = %timestamp(),
        current = current.as_deref(),
        previous = previous.as_deref(),
        diff = changed.as_deref(),
        "update"
    );
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S%.3f").to_string()
}
