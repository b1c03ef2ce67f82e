//! Bind a nested configuration struct to a flat set of named, settable flags.
//!
//! Flagtree walks a configuration tree once and installs one binding per
//! leaf, named by the dotted path from the root (`database.pool_size`). Every
//! binding reads and writes the live tree, so config files, environment
//! variables and command-line options all land in the same struct you hand
//! out to the rest of the program.
//!
//! ```ignore
//! #[derive(flagtree::Reflect, Default)]
//! struct AppConfig {
//!     /// The port to listen on.
//!     pub port: u32,
//!     pub database: Database,
//! }
//!
//! let config = flagtree::shared(AppConfig::default());
//! let flags = Flagtree::builder()
//!     .app_name("myapp")
//!     .args(std::env::args().skip(1))
//!     .load(&config)?;
//! ```
//!
//! That single call searches the platform config directory for `myapp.conf`,
//! applies `MYAPP_*` environment variables and then command-line options such
//! as `--database.pool_size=8`, each layer overwriting the one before.
//!
//! # The tree
//!
//! Anything implementing [`Reflect`] can be bound. The derive covers structs
//! with named fields; the shapes below are built in:
//!
//! - **Scalars**: `bool`, `i32`, `i64`, `u32`, `u64`, `f64`, `String`. Integers
//!   accept `0x`/`0o`/`0b` prefixes, a leading `0` for octal, and `_`
//!   separators. Booleans accept `1 t T TRUE true True` and their false
//!   counterparts.
//! - **Records**: every `pub` field becomes a path segment. `#[flag(flatten)]`
//!   splices a nested record's fields into the parent namespace,
//!   `#[flag(skip)]` leaves a field out, `#[flag(rename = "...")]` changes
//!   the segment, and `///` doc comments become help text.
//! - **Sequences**: `Vec<T>` of a scalar is one repeated binding; every set
//!   appends an element.
//! - **Mappings**: `HashMap`/`BTreeMap` with string keys contribute one
//!   segment per present key, in sorted order.
//! - **References**: `Option<T>` and `Box<T>` are followed. A `None` field is
//!   filled with `T::default()` unless marked `#[flag(required)]`.
//! - **Extensions**: a type marked `#[flag(value)]` that implements
//!   [`FlagValue`] parses and prints itself and is bound as a single leaf.
//!
//! Anything else (`u8`, `char`, shared `Rc<T>`, integer map keys) is rejected
//! at bind time with the dotted path of the offending field.
//!
//! # Layer precedence
//!
//! ```text
//! Values in the tree    whatever the struct was built with
//!        ↑ overwritten by
//! Config files          search paths in order, later paths win
//!        ↑ overwritten by
//! Environment vars      PREFIX_KEY
//!        ↑ overwritten by
//! Command line          --key value
//! ```
//!
//! Every layer is **sparse**: a file, variable or option only touches the
//! bindings it names. Files ending in `.toml` are read as TOML; anything else
//! as `key = value` lines (see [`conf`]).
//!
//! # No CLI framework required
//!
//! Binding, file parsing and environment mapping have no dependency on any
//! CLI framework. For [clap](https://docs.rs/clap) users, the [`cli`] module
//! (behind the `clap` Cargo feature, on by default) turns a [`FlagSet`] into
//! clap options and provides drop-in `config list|get|gen` subcommands.
//!
//! # Error handling
//!
//! All fallible operations return [`FlagtreeError`]. Binding and parse errors
//! carry the dotted path; file errors carry the file and line.

extern crate self as flagtree;

pub mod error;
pub mod types;

mod binding;
mod builder;
#[cfg(feature = "clap")]
pub mod cli;
pub mod conf;
pub mod env;
mod file;
mod ops;
mod reflect;
mod registry;
mod resolve;
mod strategy;
pub mod table;
mod traverse;

#[cfg(test)]
mod fixtures;

pub use binding::{Binding, Shared, shared};
pub use builder::{Flagtree, FlagtreeBuilder};
#[cfg(feature = "clap")]
pub use cli::{ConfigArgs, ConfigSubcommand};
pub use error::{BoxError, FlagtreeError};
pub use flagtree_derive::Reflect;
pub use ops::ConfigResult;
pub use reflect::{
    Field, FlagValue, MapKey, Mapping, Node, NodeMut, Record, Reference, Reflect, Sequence,
    SetError, Target, WriteFn,
};
pub use registry::{Flag, FlagSet, Registry, bind, bind_into};
pub use types::{Boundary, ConfigAction, Kind, SearchMode, SearchPath, Step, Value};
