//! Line-oriented `key = value` config files.
//!
//! ```text
//! # A full-line comment
//! port = 8080
//! database.url = pg://localhost   # trailing comment
//! motd = we are \#1
//! ```
//!
//! `#` starts a comment unless written as `\#`, which yields a literal `#`.
//! Keys and values are trimmed. A repeated binding appears once per element.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::FlagtreeError;
use crate::registry::FlagSet;
use crate::types::Value;

/// Apply every `key = value` line of `reader` to `flags`, stopping at the
/// first bad line. Lines before it stay applied.
pub fn parse<R: BufRead>(reader: R, flags: &FlagSet) -> Result<(), FlagtreeError> {
    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = strip_comment(&line?);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (key, value) = line
            .split_once('=')
            .ok_or(FlagtreeError::MissingSeparator { line: line_no })?;
        let key = key.trim();
        let value = value.trim();

        let flag = flags.lookup(key).ok_or_else(|| FlagtreeError::UnknownKey {
            key: key.to_string(),
            line: line_no,
        })?;
        flag.binding
            .set(value)
            .map_err(|e| FlagtreeError::AtLine {
                line: line_no,
                source: Box::new(e),
            })?;
    }
    Ok(())
}

pub fn parse_str(text: &str, flags: &FlagSet) -> Result<(), FlagtreeError> {
    parse(text.as_bytes(), flags)
}

pub fn parse_file(path: &Path, flags: &FlagSet) -> Result<(), FlagtreeError> {
    let file = File::open(path).map_err(|e| FlagtreeError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    tracing::debug!(path = %path.display(), "reading config file");
    parse(BufReader::new(file), flags).map_err(|e| FlagtreeError::InFile {
        path: path.to_path_buf(),
        source: Box::new(e),
    })
}

/// Render a commented file that sets every binding to its current value.
pub fn render(flags: &FlagSet) -> Result<String, FlagtreeError> {
    let mut out = String::new();
    for (i, flag) in flags.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if let Some(help) = flag.help {
            out.push_str(&format!("# {help}\n"));
        }

        let name = flag.name();
        match flag.binding.get()? {
            Value::List(items) if items.is_empty() => {
                out.push_str(&format!("# {name} =\n"));
            }
            Value::List(items) => {
                for item in items {
                    out.push_str(&format!("{name} = {}\n", escape(&item.to_string())));
                }
            }
            _ => {
                let text = flag.binding.format()?;
                out.push_str(&format!("{name} = {}\n", escape(&text)));
            }
        }
    }
    Ok(out)
}

/// Drop everything from the first unescaped `#`, unescaping `\#`.
fn strip_comment(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'#') => {
                out.push('#');
                chars.next();
            }
            '#' => break,
            _ => out.push(c),
        }
    }
    out
}

fn escape(text: &str) -> String {
    text.replace('#', "\\#")
}
