use std::path::Path;

use crate::binding::Shared;
use crate::error::FlagtreeError;
use crate::ops::{self, ConfigResult};
use crate::reflect::Reflect;
use crate::registry::{FlagSet, bind_into};
use crate::types::{ConfigAction, SearchMode, SearchPath};
use crate::{conf, env, file, table};

/// Entry point for building a flagtree loader.
pub struct Flagtree;

impl Flagtree {
    pub fn builder() -> FlagtreeBuilder {
        FlagtreeBuilder::new()
    }
}

/// Builder for binding a configuration tree and layering sources onto it.
///
/// Sources are applied in a fixed order, each one writing through the
/// bindings over whatever the previous one left:
///
/// 1. the values already in the tree (its compiled defaults),
/// 2. config files found on the [search paths](Self::search_paths),
/// 3. environment variables under the [prefix](Self::env_prefix),
/// 4. command-line [arguments](Self::args).
#[derive(Debug, Clone)]
pub struct FlagtreeBuilder {
    app_name: Option<String>,
    file_name: Option<String>,
    search_paths: Option<Vec<SearchPath>>,
    search_mode: SearchMode,
    env_prefix: Option<String>,
    env_enabled: bool,
    #[cfg(feature = "clap")]
    args: Option<Vec<String>>,
}

impl FlagtreeBuilder {
    fn new() -> Self {
        Self {
            app_name: None,
            file_name: None,
            search_paths: None,
            search_mode: SearchMode::default(),
            env_prefix: None,
            env_enabled: true,
            #[cfg(feature = "clap")]
            args: None,
        }
    }

    /// Name the application. Everything not set explicitly is derived from it:
    /// the file `{app_name}.conf`, the `Platform` search path and the
    /// upper-cased environment prefix.
    pub fn app_name(mut self, name: &str) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Config file name to look for in every search directory.
    ///
    /// A name ending in `.toml` is read as TOML; anything else as
    /// `key = value` lines.
    pub fn file_name(mut self, name: &str) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Directories to search, lowest priority first.
    pub fn search_paths(mut self, paths: Vec<SearchPath>) -> Self {
        self.search_paths = Some(paths);
        self
    }

    /// Add one more (highest priority) search path on top of the current list,
    /// which starts as `[Platform]`.
    pub fn add_search_path(mut self, path: SearchPath) -> Self {
        let mut paths = self.search_paths.take().unwrap_or_else(default_search_paths);
        paths.push(path);
        self.search_paths = Some(paths);
        self
    }

    /// [`Merge`](SearchMode::Merge) (default) applies every file found, so a
    /// later file overwrites an earlier one key by key.
    /// [`FirstMatch`](SearchMode::FirstMatch) applies only the highest-priority
    /// file.
    pub fn search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }

    /// Prefix for environment variable names, in place of the app name.
    pub fn env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Skip the environment layer.
    pub fn no_env(mut self) -> Self {
        self.env_enabled = false;
        self
    }

    /// Command-line arguments to apply last, without the binary name.
    #[cfg(feature = "clap")]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Fill in every derived default. Fails without an app name.
    fn settings(&self) -> Result<Settings<'_>, FlagtreeError> {
        let app_name = self
            .app_name
            .as_deref()
            .ok_or(FlagtreeError::AppNameRequired)?;
        let env_prefix = match (&self.env_prefix, self.env_enabled) {
            (_, false) => None,
            (Some(prefix), true) => Some(prefix.clone()),
            (None, true) => Some(app_name.to_uppercase()),
        };
        Ok(Settings {
            app_name,
            file_name: self
                .file_name
                .clone()
                .unwrap_or_else(|| format!("{app_name}.conf")),
            search_paths: self
                .search_paths
                .clone()
                .unwrap_or_else(default_search_paths),
            env_prefix,
        })
    }

    /// Bind `tree` and apply every source to it.
    ///
    /// The returned [`FlagSet`] keeps writing into `tree`, so later overrides
    /// through it land in the same configuration.
    pub fn load<T: Reflect>(&self, tree: &Shared<T>) -> Result<FlagSet, FlagtreeError> {
        self.load_with_env(tree, env::process_vars())
    }

    fn load_with_env<T: Reflect>(
        &self,
        tree: &Shared<T>,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<FlagSet, FlagtreeError> {
        let settings = self.settings()?;

        let set_name = settings
            .env_prefix
            .clone()
            .unwrap_or_else(|| settings.app_name.to_uppercase());
        let mut flags = FlagSet::new(&set_name);
        bind_into(&mut flags, tree)?;
        tracing::debug!(
            app = settings.app_name,
            bindings = flags.len(),
            "bound configuration"
        );

        let files = file::discover(
            &settings.search_paths,
            &settings.file_name,
            settings.app_name,
            self.search_mode,
            None,
        )?;
        for path in &files {
            apply_file(path, &flags)?;
        }

        if settings.env_prefix.is_some() {
            env::apply_env(&flags, vars)?;
        }

        #[cfg(feature = "clap")]
        if let Some(args) = &self.args {
            crate::cli::apply_args(&flags, args)?;
        }

        Ok(flags)
    }

    /// [`handle`](Self::handle), printing the result.
    pub fn handle_and_print<T: Reflect>(
        &self,
        tree: &Shared<T>,
        action: &ConfigAction,
    ) -> Result<(), FlagtreeError> {
        let result = self.handle(tree, action)?;
        println!("{result}");
        Ok(())
    }

    /// Load `tree`, then run `action` (list / gen / get) against it.
    pub fn handle<T: Reflect>(
        &self,
        tree: &Shared<T>,
        action: &ConfigAction,
    ) -> Result<ConfigResult, FlagtreeError> {
        let flags = self.load(tree)?;
        ops::handle(&flags, action)
    }
}

/// Builder state with every default filled in.
#[derive(Debug, PartialEq)]
struct Settings<'a> {
    app_name: &'a str,
    file_name: String,
    search_paths: Vec<SearchPath>,
    env_prefix: Option<String>,
}

fn default_search_paths() -> Vec<SearchPath> {
    vec![SearchPath::Platform]
}

/// Apply one discovered file, picking the reader by extension.
fn apply_file(path: &Path, flags: &FlagSet) -> Result<(), FlagtreeError> {
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        table::apply_file(path, flags)
    } else {
        conf::parse_file(path, flags)
    }
}
