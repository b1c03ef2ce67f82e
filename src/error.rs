use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by leaf parsers and extension types.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum FlagtreeError {
    #[error("cannot build bindings from nil")]
    NilConfiguration,

    #[error("cannot build bindings from type `{type_name}` for path `{path}`")]
    UnsupportedType {
        type_name: &'static str,
        path: String,
    },

    #[error("value of type `{type_name}` at `{path}` cannot be set")]
    UnsettableLeaf {
        type_name: &'static str,
        path: String,
    },

    #[error("map key must be string, found `{key_type}` at `{path}`")]
    NonStringMapKey {
        key_type: &'static str,
        path: String,
    },

    #[error("cannot build bindings from nil reference for path `{path}`")]
    NilUnallocatableReference { path: String },

    #[error("invalid value {text:?} for `{path}`: {source}")]
    ParseFailure {
        path: String,
        text: String,
        source: BoxError,
    },

    #[error("binding `{path}` no longer resolves to a value")]
    StaleBinding { path: String },

    #[error("binding `{path}` used while the configuration is borrowed")]
    TreeBorrowed { path: String },

    #[error("duplicate binding `{0}`")]
    DuplicateBinding(String),

    #[error("unknown flag `{0}`")]
    UnknownFlag(String),

    #[error("unknown key '{key}' on line {line}")]
    UnknownKey { key: String, line: usize },

    #[error("line {line} has no key")]
    MissingSeparator { line: usize },

    #[error("line {line}: {source}")]
    AtLine {
        line: usize,
        source: Box<FlagtreeError>,
    },

    #[error("environment variable {var}: {source}")]
    EnvVar {
        var: String,
        source: Box<FlagtreeError>,
    },

    #[error("{path}: {source}")]
    InFile {
        path: PathBuf,
        source: Box<FlagtreeError>,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Read(#[from] std::io::Error),

    #[error("failed to parse {path}: {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("app name is required, call .app_name() on the builder")]
    AppNameRequired,

    #[cfg(feature = "clap")]
    #[error(transparent)]
    Cli(#[from] clap::Error),
}

impl FlagtreeError {
    /// The dotted path the error refers to, when it has one.
    pub fn path(&self) -> Option<&str> {
        match self {
            FlagtreeError::UnsupportedType { path, .. }
            | FlagtreeError::UnsettableLeaf { path, .. }
            | FlagtreeError::NonStringMapKey { path, .. }
            | FlagtreeError::NilUnallocatableReference { path }
            | FlagtreeError::ParseFailure { path, .. }
            | FlagtreeError::StaleBinding { path }
            | FlagtreeError::TreeBorrowed { path } => Some(path),
            FlagtreeError::AtLine { source, .. }
            | FlagtreeError::EnvVar { source, .. }
            | FlagtreeError::InFile { source, .. } => source.path(),
            _ => None,
        }
    }
}
