//! Associated functions and their registry.
//!
//! An associated function is the domain-specific operation a command
//! wraps - "list volumes", "reset adapter" - supplied by a plugin. The
//! framework never imports functions dynamically: plugins register them by
//! name in a [`FunctionRegistry`] and command declarations resolve against
//! it eagerly, failing at build time when a name is missing.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use hostmux_session::Connection;

/// Keyword arguments passed to an associated function.
pub type CallArgs = BTreeMap<String, Value>;

/// Whether a command runs against the session's hosts or stands alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Binding {
    /// Invoked once per live connection; receives the connection.
    #[default]
    Session,
    /// Invoked exactly once, with no connection.
    None,
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Session => write!(f, "session-bound"),
            Binding::None => write!(f, "unbound"),
        }
    }
}

/// The parameters an associated function declares.
///
/// Required parameters must be producible by the command's usage grammar
/// (checked at declaration time). Translated options naming neither a
/// required nor an optional parameter are dropped before the call, unless
/// `accepts_extra` is set.
#[derive(Debug, Clone, Default)]
pub struct ParamSpec {
    pub required: Vec<String>,
    pub optional: Vec<String>,
    pub accepts_extra: bool,
}

impl ParamSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn optional<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optional = names.into_iter().map(Into::into).collect();
        self
    }

    /// Accept arbitrary keyword arguments; nothing is dropped.
    pub fn extra(mut self) -> Self {
        self.accepts_extra = true;
        self
    }

    pub fn declares(&self, name: &str) -> bool {
        self.required.iter().any(|p| p == name) || self.optional.iter().any(|p| p == name)
    }
}

/// Row data returned by an associated function.
///
/// `Lazy` keeps the source's generator semantics: each item may incur a
/// further round-trip, and an error raised mid-iteration is that host's
/// failure, caught by the execution engine like any other.
pub enum Rows {
    Eager(Vec<Vec<Value>>),
    Lazy(Box<dyn Iterator<Item = anyhow::Result<Vec<Value>>>>),
}

impl Rows {
    pub fn eager<I, R>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = Value>,
    {
        Rows::Eager(
            rows.into_iter()
                .map(|r| r.into_iter().collect())
                .collect(),
        )
    }
}

impl fmt::Debug for Rows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rows::Eager(rows) => f.debug_tuple("Eager").field(&rows.len()).finish(),
            Rows::Lazy(_) => f.debug_tuple("Lazy").finish(),
        }
    }
}

/// How one output column of a derived listing gets its value.
#[derive(Clone)]
pub enum PropertySource {
    /// Direct field lookup on the result object.
    Field(String),
    /// Computed from the whole result object.
    Transform(Arc<dyn Fn(&Value) -> anyhow::Result<Value>>),
}

impl fmt::Debug for PropertySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertySource::Field(name) => f.debug_tuple("Field").field(name).finish(),
            PropertySource::Transform(_) => f.debug_tuple("Transform").finish(),
        }
    }
}

/// One column of a derived listing: a header plus where the value comes
/// from. Lookup and transform failures render sentinels, never errors.
#[derive(Debug, Clone)]
pub struct Property {
    pub header: String,
    pub source: PropertySource,
}

impl Property {
    pub fn field(header: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            source: PropertySource::Field(field.into()),
        }
    }

    pub fn transform<F>(header: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<Value> + 'static,
    {
        Self {
            header: header.into(),
            source: PropertySource::Transform(Arc::new(f)),
        }
    }
}

/// What an associated function produces.
#[derive(Debug)]
pub enum FnOutput {
    /// Nothing to render.
    Unit,
    /// A single value; the target of expected-result checks.
    Value(Value),
    /// Rows for a command with declared fixed columns.
    Rows(Rows),
    /// A listing that carries its own column headers (the "derive columns
    /// from the result" path).
    Listing { columns: Vec<String>, rows: Rows },
    /// Result objects rendered through property descriptors.
    Derived {
        properties: Vec<Property>,
        items: Vec<Value>,
    },
    /// One record's fields, in caller-declared order.
    Record(Vec<(String, Value)>),
}

/// An associated function: the external operation a command wraps.
///
/// `conn` is `Some` for session-bound functions (one call per live host)
/// and `None` for unbound ones; [`CommandFn::binding`] declares which, and
/// the declaration processor verifies it against the command.
pub trait CommandFn {
    fn binding(&self) -> Binding {
        Binding::Session
    }

    fn params(&self) -> ParamSpec;

    /// Per-command option verification, run once before any host is
    /// contacted. The default accepts everything.
    fn verify_options(&self, _args: &CallArgs) -> Result<(), String> {
        Ok(())
    }

    fn invoke(
        &self,
        conn: Option<&mut dyn Connection>,
        args: &CallArgs,
    ) -> anyhow::Result<FnOutput>;
}

/// The explicit name-to-function map plugins populate at registration.
#[derive(Default)]
pub struct FunctionRegistry {
    map: BTreeMap<String, Arc<dyn CommandFn>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function under a dotted name like `"volume.list"`.
    /// A later registration under the same name replaces the earlier one.
    pub fn register(&mut self, name: impl Into<String>, function: impl CommandFn + 'static) {
        self.map.insert(name.into(), Arc::new(function));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CommandFn>> {
        self.map.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.map.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("names", &self.names())
            .finish()
    }
}
