//! `config list`, `config get` and `config gen` over a [`FlagSet`].
//!
//! Every operation reads through the bindings, so what is shown is the live
//! value in the bound tree.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::conf;
use crate::error::FlagtreeError;
use crate::registry::FlagSet;
use crate::types::ConfigAction;

/// What a [`ConfigAction`] produced. `Display` renders it for the terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigResult {
    /// A generated config file template.
    Template(String),
    /// The template went to this file instead of stdout.
    TemplateWritten { path: PathBuf },
    /// A binding's current value and its help text.
    KeyValue {
        key: String,
        value: String,
        help: Option<&'static str>,
    },
    /// Every binding with its current value, in registration order.
    Listing { entries: Vec<(String, String)> },
}

impl fmt::Display for ConfigResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigResult::Template(t) => write!(f, "{t}"),
            ConfigResult::TemplateWritten { path } => {
                write!(f, "Config template written to {}", path.display())
            }
            ConfigResult::KeyValue { key, value, help } => {
                if let Some(help) = help {
                    writeln!(f, "# {help}")?;
                }
                write!(f, "{key} = {value}")
            }
            ConfigResult::Listing { entries } => {
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{key} = {value}")?;
                }
                Ok(())
            }
        }
    }
}

/// Run `action` against `flags`.
pub fn handle(flags: &FlagSet, action: &ConfigAction) -> Result<ConfigResult, FlagtreeError> {
    match action {
        ConfigAction::List => list_values(flags),
        ConfigAction::Get { key } => get_value(flags, key),
        ConfigAction::Gen { output: None } => Ok(ConfigResult::Template(conf::render(flags)?)),
        ConfigAction::Gen { output: Some(path) } => write_template(flags, path),
    }
}

impl FlagSet {
    /// Run `action` against the current values of these bindings.
    pub fn handle(&self, action: &ConfigAction) -> Result<ConfigResult, FlagtreeError> {
        handle(self, action)
    }
}

/// A binding's current value and help, by name.
pub fn get_value(flags: &FlagSet, key: &str) -> Result<ConfigResult, FlagtreeError> {
    let flag = flags
        .lookup(key)
        .ok_or_else(|| FlagtreeError::UnknownFlag(key.to_string()))?;
    Ok(ConfigResult::KeyValue {
        key: key.to_string(),
        value: flag.binding.format()?,
        help: flag.help,
    })
}

pub fn list_values(flags: &FlagSet) -> Result<ConfigResult, FlagtreeError> {
    Ok(ConfigResult::Listing {
        entries: flags.listing()?,
    })
}

/// Render the template and write it to `path`, creating parent directories.
pub fn write_template(flags: &FlagSet, path: &Path) -> Result<ConfigResult, FlagtreeError> {
    let template = conf::render(flags)?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| FlagtreeError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::write(path, &template).map_err(|e| FlagtreeError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    tracing::debug!(path = %path.display(), "wrote config template");
    Ok(ConfigResult::TemplateWritten {
        path: path.to_path_buf(),
    })
}
