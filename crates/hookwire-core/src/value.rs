//! Dynamically-shaped values with shallow identity semantics.
//!
//! Hook states, constants, and component props are all composite [`Record`]
//! values: cheap-to-clone, insertion-ordered field maps. Change detection
//! everywhere in the engine compares fields with [`Value::same`], which keeps
//! the original host-language rules: primitives compare by value, containers
//! and callables by pointer identity.

use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

// ============================================================================
// Action
// ============================================================================

/// A cheap-to-clone callable stored inside a [`Record`].
///
/// Actions compare by pointer identity, so an action handle created once and
/// re-emitted across recomputations never looks like a change to a watcher.
/// Use `UnitCtx::action` inside a projection to get an identity-stable handle
/// whose body is still refreshed every render.
#[derive(Clone)]
pub struct Action {
    f: Rc<dyn Fn(&[Value])>,
}

impl Action {
    /// Create an action from a closure taking positional [`Value`] arguments.
    pub fn new(f: impl Fn(&[Value]) + 'static) -> Self {
        Self { f: Rc::new(f) }
    }

    /// Invoke the action with arguments.
    pub fn call(&self, args: &[Value]) {
        (self.f)(args);
    }

    /// Invoke the action with no arguments.
    pub fn fire(&self) {
        self.call(&[]);
    }

    /// Pointer identity comparison.
    pub fn same(&self, other: &Action) -> bool {
        Rc::ptr_eq(&self.f, &other.f)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Action(..)")
    }
}

// ============================================================================
// Record
// ============================================================================

/// An immutable, insertion-ordered composite value.
///
/// Cloning a record is an `Rc` bump; building one goes through
/// [`RecordBuilder`]. Reading a missing field yields [`Value::Unset`] rather
/// than an error, and watchers track such reads as dependencies on an absent
/// key.
///
/// # Example
///
/// ```
/// use hookwire_core::value::Record;
///
/// let first = Record::build().field("first", "first").finish();
/// let second = Record::build().field("second", "second").merge(&first).finish();
/// assert_eq!(second.get("first").as_str(), Some("first"));
/// ```
#[derive(Clone, Default)]
pub struct Record {
    fields: Rc<IndexMap<String, Value>>,
}

impl Record {
    /// Start building a record.
    pub fn build() -> RecordBuilder {
        RecordBuilder {
            fields: IndexMap::new(),
        }
    }

    /// Read a field, yielding [`Value::Unset`] when the key is absent.
    pub fn get(&self, key: &str) -> Value {
        self.fields.get(key).cloned().unwrap_or(Value::Unset)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Pointer identity comparison (the whole-record analogue of
    /// [`Value::same`]).
    pub fn same_identity(&self, other: &Record) -> bool {
        Rc::ptr_eq(&self.fields, &other.fields)
    }

    /// Shallow equality: same keys, pairwise [`Value::same`] values.
    ///
    /// This is the memo-style props comparison used by the host runtime to
    /// decide whether a parent-driven re-render can skip a kept child.
    pub fn shallow_eq(&self, other: &Record) -> bool {
        if self.same_identity(other) {
            return true;
        }
        if self.fields.len() != other.fields.len() {
            return false;
        }
        self.fields
            .iter()
            .all(|(key, value)| match other.fields.get(key) {
                Some(theirs) => value.same(theirs),
                None => false,
            })
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.fields.iter()).finish()
    }
}

/// Builder for [`Record`]; `merge` has the semantics of an object spread,
/// later fields overwrite earlier ones.
pub struct RecordBuilder {
    fields: IndexMap<String, Value>,
}

impl RecordBuilder {
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn merge(mut self, other: &Record) -> Self {
        for (key, value) in other.iter() {
            self.fields.insert(key.to_string(), value.clone());
        }
        self
    }

    pub fn finish(self) -> Record {
        Record {
            fields: Rc::new(self.fields),
        }
    }
}

// ============================================================================
// Value
// ============================================================================

/// A dynamically-shaped field value.
#[derive(Clone, Default)]
pub enum Value {
    /// A missing field. Reading an absent record key yields this.
    #[default]
    Unset,
    Bool(bool),
    Int(i64),
    Str(Rc<str>),
    List(Rc<Vec<Value>>),
    Record(Record),
    Action(Action),
}

impl Value {
    /// Shallow identity comparison: `Unset`/`Bool`/`Int`/`Str` by value,
    /// `List`/`Record`/`Action` by pointer. This is the comparison every
    /// watcher and diff in the engine uses.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Unset, Value::Unset) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Record(a), Value::Record(b)) => a.same_identity(b),
            (Value::Action(a), Value::Action(b)) => a.same(b),
            _ => false,
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, Value::Unset)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_action(&self) -> Option<&Action> {
        match self {
            Value::Action(a) => Some(a),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unset => f.write_str("Unset"),
            Value::Bool(b) => fmt::Debug::fmt(b, f),
            Value::Int(n) => fmt::Debug::fmt(n, f),
            Value::Str(s) => fmt::Debug::fmt(s, f),
            Value::List(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Record(r) => fmt::Debug::fmt(r, f),
            Value::Action(a) => fmt::Debug::fmt(a, f),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s.as_str()))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(Rc::new(items))
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

impl From<Action> for Value {
    fn from(a: Action) -> Self {
        Value::Action(a)
    }
}
