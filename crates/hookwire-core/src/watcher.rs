//! Change-detecting views over an upstream emission stream.
//!
//! A [`Watcher`] subscribes one consuming unit instance to one upstream
//! hook. It holds the latest emitted record, decides whether an emission is
//! a real change worth a re-render, and swallows exactly one emission after
//! being created or rearmed (the subscription replay that merely repeats the
//! seed it was built from).

use crate::hook::SubscribeFn;
use crate::runtime::UnitCtx;
use crate::value::{Record, Value};
use indexmap::IndexSet;
use std::cell::RefCell;
use std::rc::Rc;

/// How a watcher decides that an upstream emission warrants an update.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum WatchMode {
    /// Track which fields the consumer actually read during its first
    /// render and only propagate emissions that change one of them.
    #[default]
    FieldLevel,
    /// Propagate every emission.
    Whole,
}

struct WatcherStore {
    state: Record,
    /// Fields read through [`StateReader::get`] while tracking.
    accessed: IndexSet<String>,
    /// Frozen copy of `accessed`, taken when tracking ends.
    captured: Vec<String>,
    /// Tracking is a one-shot phase; once collected, reads are plain reads.
    collected: bool,
    /// When set, the next emission is dropped instead of propagated.
    immediate: bool,
}

struct WatcherInner {
    subscribe: SubscribeFn,
    mode: WatchMode,
    store: RefCell<WatcherStore>,
}

/// One consumer's live view of one upstream hook.
#[derive(Clone)]
pub struct Watcher {
    inner: Rc<WatcherInner>,
}

impl Watcher {
    pub(crate) fn new(subscribe: SubscribeFn, initial: Record, mode: WatchMode) -> Self {
        Self {
            inner: Rc::new(WatcherInner {
                subscribe,
                mode,
                store: RefCell::new(WatcherStore {
                    state: initial,
                    accessed: IndexSet::new(),
                    captured: Vec::new(),
                    collected: false,
                    immediate: true,
                }),
            }),
        }
    }

    /// Re-seed the watcher for a fresh consumer instance. The existing
    /// subscription (if any) keeps feeding it; the next emission after the
    /// rearm is swallowed as the replay of `seed`.
    pub(crate) fn rearm(&self, seed: Record) {
        let mut store = self.inner.store.borrow_mut();
        store.state = seed;
        store.immediate = true;
    }

    /// Bind this watcher to a consumer instance and return a reader over the
    /// current upstream state.
    ///
    /// On the instance's first render this registers the subscription (to
    /// start after the render commits) and, in field-level mode, puts the
    /// reader into tracking mode so the fields the consumer reads become the
    /// watcher's change-detection set.
    pub fn read(&self, ctx: &mut UnitCtx) -> StateReader {
        let tracking = {
            let store = self.inner.store.borrow();
            self.inner.mode == WatchMode::FieldLevel && !store.collected
        };

        let watcher = self.clone();
        let updater = ctx.updater();
        ctx.on_mount_cleanup(move || {
            {
                let mut store = watcher.inner.store.borrow_mut();
                if !store.collected {
                    store.captured = store.accessed.iter().cloned().collect();
                    store.collected = true;
                }
            }
            let emission = watcher.clone();
            let unsub = (watcher.inner.subscribe)(Box::new(move |updated| {
                emission.on_emission(updated, &updater);
            }));
            Box::new(move || unsub.call())
        });

        StateReader {
            inner: Rc::clone(&self.inner),
            tracking,
        }
    }

    fn on_emission(&self, updated: &Record, updater: &crate::runtime::Updater) {
        let changed = {
            let mut store = self.inner.store.borrow_mut();
            if store.immediate {
                store.immediate = false;
                return;
            }
            let changed = match self.inner.mode {
                WatchMode::Whole => true,
                WatchMode::FieldLevel => store
                    .captured
                    .iter()
                    .any(|key| !store.state.get(key).same(&updated.get(key))),
            };
            if changed {
                store.state = updated.clone();
            }
            changed
        };
        if changed {
            tracing::trace!("watcher propagating update");
            updater.call();
        }
    }

    /// Latest record this watcher holds.
    pub fn current(&self) -> Record {
        self.inner.store.borrow().state.clone()
    }
}

/// Read access to a watcher's current state. While tracking, every field
/// read is recorded into the watcher's change-detection set.
pub struct StateReader {
    inner: Rc<WatcherInner>,
    tracking: bool,
}

impl StateReader {
    pub fn get(&self, key: &str) -> Value {
        let mut store = self.inner.store.borrow_mut();
        if self.tracking {
            store.accessed.insert(key.to_string());
        }
        store.state.get(key)
    }

    /// The whole current record, without recording any field access.
    pub fn snapshot(&self) -> Record {
        self.inner.store.borrow().state.clone()
    }
}
