use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// The closed set of primitive kinds with a built-in leaf strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    I32,
    I64,
    U32,
    U64,
    F64,
    Text,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Bool => "bool",
            Kind::I32 => "i32",
            Kind::I64 => "i64",
            Kind::U32 => "u32",
            Kind::U64 => "u64",
            Kind::F64 => "f64",
            Kind::Text => "string",
        };
        f.write_str(name)
    }
}

/// The current value of a binding, in its natural semantic type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F64(f64),
    Text(String),
    List(Vec<Value>),
}

/// Renders scalars in the same text form the leaf strategies accept, and
/// lists as `[a, b, c]`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// One selector on the route from the root of a tree to a binding's location.
///
/// Routes are re-walked on every access, so a binding never holds a reference
/// into storage that a later insert could move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The n-th bindable field of a record.
    Field(usize),
    /// The entry stored under a key of a mapping.
    Key(String),
    /// The target of a reference.
    Deref,
}

/// One place to look for the config file.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPath {
    /// The OS config directory for the app, via `directories::ProjectDirs`.
    Platform,
    /// `$HOME/<dir>`, e.g. `Home(".myapp")`.
    Home(&'static str),
    Cwd,
    /// A fixed directory.
    Path(PathBuf),
    /// Every directory from the working directory up to `Boundary`.
    Ancestors(Boundary),
}

/// How far an [`Ancestors`](SearchPath::Ancestors) walk goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Boundary {
    /// Walk to the filesystem root.
    Root,
    /// Stop at the first directory containing an entry with this name.
    Marker(&'static str),
}

/// What to do when several config files are found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Apply every file, lowest priority first.
    #[default]
    Merge,
    /// Apply only the highest-priority file.
    FirstMatch,
}

/// A `config` subcommand, independent of the CLI parser that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigAction {
    List,
    Gen { output: Option<PathBuf> },
    Get { key: String },
}
