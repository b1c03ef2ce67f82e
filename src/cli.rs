//! Clap adapter for flagtree.
//!
//! This module is the **optional integration layer** between the
//! framework-agnostic bindings and the [clap](https://docs.rs/clap) CLI
//! parser. It is compiled only when the `clap` Cargo feature is enabled (on
//! by default).
//!
//! Two halves:
//!
//! - [`augment`] / [`apply_matches`] turn every binding of a [`FlagSet`] into
//!   a `--name` option and push the values the user typed back through the
//!   bindings. Toggles accept a bare `--debug`; repeated bindings take the
//!   option once per element.
//! - [`ConfigArgs`] and [`ConfigSubcommand`] are clap derive types you can
//!   embed into your own `#[derive(Parser)]` struct to get `config
//!   list|get|gen` subcommands. [`ConfigArgs::into_action()`] converts them
//!   into a [`ConfigAction`](crate::ConfigAction).

use std::path::PathBuf;

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Args, Command, Subcommand};

use crate::error::FlagtreeError;
use crate::registry::FlagSet;
use crate::types::ConfigAction;

/// One clap option per binding, named after the binding.
pub fn flag_args(flags: &FlagSet) -> Vec<Arg> {
    flags
        .iter()
        .map(|flag| {
            let name = flag.name().to_string();
            let mut arg = Arg::new(name.clone())
                .long(name)
                .allow_hyphen_values(true);
            if let Some(help) = flag.help {
                arg = arg.help(help);
            }
            if flag.binding.is_repeated() {
                arg = arg.action(ArgAction::Append);
            } else if flag.binding.is_toggle() {
                arg = arg
                    .num_args(0..=1)
                    .require_equals(true)
                    .default_missing_value("true");
            } else {
                arg = arg.action(ArgAction::Set);
            }
            arg
        })
        .collect()
}

/// Add one option per binding to an existing command.
///
/// A binding named `help` or `version` takes over that option from clap.
pub fn augment(mut command: Command, flags: &FlagSet) -> Command {
    if flags.lookup("help").is_some() {
        command = command.disable_help_flag(true);
    }
    if flags.lookup("version").is_some() {
        command = command.disable_version_flag(true);
    }
    command.args(flag_args(flags))
}

/// A standalone command accepting only the binding options.
pub fn command(flags: &FlagSet) -> Command {
    let name = if flags.name().is_empty() {
        "flagtree".to_string()
    } else {
        flags.name().to_lowercase()
    };
    augment(Command::new(name), flags)
}

/// Set every binding whose option was given on the command line, in
/// registration order. Defaults and absent options are left alone.
pub fn apply_matches(flags: &FlagSet, matches: &ArgMatches) -> Result<(), FlagtreeError> {
    for flag in flags.iter() {
        let name = flag.name();
        if matches.value_source(name) != Some(ValueSource::CommandLine) {
            continue;
        }
        let Some(values) = matches.get_many::<String>(name) else {
            continue;
        };
        for value in values {
            tracing::trace!(flag = name, %value, "applying command-line value");
            flag.binding.set(value)?;
        }
    }
    Ok(())
}

/// Parse `args` (without the binary name) against the binding options and
/// apply them.
pub fn apply_args<I, T>(flags: &FlagSet, args: I) -> Result<(), FlagtreeError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = command(flags)
        .no_binary_name(true)
        .try_get_matches_from(args)?;
    apply_matches(flags, &matches)
}

/// The `config` subcommand group, for embedding in an app's clap derive:
/// ```ignore
/// #[derive(Parser)]
/// struct Cli {
///     #[command(subcommand)]
///     command: Commands,
/// }
///
/// #[derive(Subcommand)]
/// enum Commands {
///     Config(ConfigArgs),
/// }
/// ```
#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigSubcommand>,
}

/// `config` subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Show every setting with its current value.
    List,
    /// Generate a commented config file holding the current values.
    Gen {
        /// Write to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the current value and help for one setting.
    Get {
        /// Dotted setting name (e.g. "database.url").
        key: String,
    },
}

impl ConfigArgs {
    /// The [`ConfigAction`] these args ask for. A bare `config` lists.
    pub fn into_action(self) -> ConfigAction {
        match self.action {
            None | Some(ConfigSubcommand::List) => ConfigAction::List,
            Some(ConfigSubcommand::Gen { output }) => ConfigAction::Gen { output },
            Some(ConfigSubcommand::Get { key }) => ConfigAction::Get { key },
        }
    }
}
