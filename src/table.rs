//! TOML config files.
//!
//! The document is flattened into dotted keys (`[database]` + `url = ...`
//! becomes `database.url`) and each value is applied through its binding as
//! text. Arrays are applied one element at a time, so they append to
//! repeated bindings.

use std::path::Path;

use toml::{Table, Value};

use crate::error::FlagtreeError;
use crate::registry::FlagSet;

/// Apply a TOML document to `flags`. `path` is only used in error messages.
pub fn apply_str(content: &str, path: &Path, flags: &FlagSet) -> Result<(), FlagtreeError> {
    let table: Table = toml::from_str(content).map_err(|e| FlagtreeError::TomlParse {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut entries = Vec::new();
    flatten("", &table, &mut entries);

    for (key, text) in entries {
        let Some(flag) = flags.lookup(&key) else {
            let line = find_key_line(content, &key);
            return Err(FlagtreeError::UnknownKey { key, line });
        };
        flag.binding.set(&text).map_err(|e| FlagtreeError::AtLine {
            line: find_key_line(content, &key),
            source: Box::new(e),
        })?;
    }
    Ok(())
}

pub fn apply_file(path: &Path, flags: &FlagSet) -> Result<(), FlagtreeError> {
    let content = std::fs::read_to_string(path).map_err(|e| FlagtreeError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    tracing::debug!(path = %path.display(), "reading TOML config file");
    apply_str(&content, path, flags).map_err(|e| match e {
        FlagtreeError::TomlParse { .. } => e,
        other => FlagtreeError::InFile {
            path: path.to_path_buf(),
            source: Box::new(other),
        },
    })
}

/// Collect `(dotted key, text)` pairs. Array elements share their key.
fn flatten(prefix: &str, table: &Table, out: &mut Vec<(String, String)>) {
    for (key, value) in table {
        let dotted = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Table(inner) => flatten(&dotted, inner, out),
            Value::Array(items) => {
                for item in items {
                    out.push((dotted.clone(), text_of(item)));
                }
            }
            other => out.push((dotted, text_of(other))),
        }
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Best-effort 1-indexed line of a dotted key, tracking `[section]` headers
/// and dotted assignments. Quoted keys and inline tables are not handled.
/// Returns 0 when the key cannot be found.
fn find_key_line(content: &str, dotted_key: &str) -> usize {
    let mut section = String::new();

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if trimmed.starts_with("[[") {
            section.clear();
            continue;
        }
        if let Some(header) = trimmed.strip_prefix('[') {
            section = header.trim_end_matches(']').trim().replace(' ', "");
            continue;
        }

        let Some((lhs, _)) = trimmed.split_once('=') else {
            continue;
        };
        let lhs = lhs.trim().replace(' ', "");
        let full = if section.is_empty() {
            lhs
        } else {
            format!("{section}.{lhs}")
        };
        if full == dotted_key {
            return i + 1;
        }
    }
    0
}
